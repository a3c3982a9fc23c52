use crate::error::Result;

use super::models::{
    Action, ActionTool, Comment, Event, JobFilter, LoadedTemplate, LoadedTemplateItem,
    MaintenanceActionSet, MaintenanceDelay, Part, PartDemand, TemplateActionItem,
    TemplateActionSet, TemplateActionTool, TemplatePartDemand, Tool,
};

/// Read-only view of the part/tool catalog.
pub trait PartCatalog {
    fn get_part(&self, id: &str) -> Result<Option<Part>>;

    fn get_tool(&self, id: &str) -> Result<Option<Tool>>;
}

/// Row-level access to the durable store.
///
/// Every call runs inside the transaction the caller opened; the engine never
/// commits on its own. Sibling listings come back in `(sequence_order, id)`
/// order.
pub trait Store {
    // ─── Templates ──────────────────────────────────────────────────────────

    fn insert_template_set(&self, set: &TemplateActionSet) -> Result<()>;

    fn update_template_set(&self, set: &TemplateActionSet) -> Result<()>;

    fn get_template_set(&self, id: &str) -> Result<Option<TemplateActionSet>>;

    fn list_template_sets(&self, active_only: bool) -> Result<Vec<TemplateActionSet>>;

    fn insert_template_item(&self, item: &TemplateActionItem) -> Result<()>;

    fn list_template_items(&self, set_id: &str) -> Result<Vec<TemplateActionItem>>;

    fn insert_template_part_demand(&self, demand: &TemplatePartDemand) -> Result<()>;

    fn list_template_part_demands(&self, item_id: &str) -> Result<Vec<TemplatePartDemand>>;

    fn insert_template_tool(&self, tool: &TemplateActionTool) -> Result<()>;

    fn list_template_tools(&self, item_id: &str) -> Result<Vec<TemplateActionTool>>;

    /// Fetch a template together with its items, part demands and tools.
    fn load_template(&self, id: &str) -> Result<Option<LoadedTemplate>> {
        let Some(set) = self.get_template_set(id)? else {
            return Ok(None);
        };
        let mut items = Vec::new();
        for item in self.list_template_items(&set.id)? {
            let part_demands = self.list_template_part_demands(&item.id)?;
            let tools = self.list_template_tools(&item.id)?;
            items.push(LoadedTemplateItem {
                item,
                part_demands,
                tools,
            });
        }
        Ok(Some(LoadedTemplate { set, items }))
    }

    // ─── Events ─────────────────────────────────────────────────────────────

    fn insert_event(&self, event: &Event) -> Result<()>;

    fn get_event(&self, id: &str) -> Result<Option<Event>>;

    fn set_event_status(&self, id: &str, status: &str) -> Result<()>;

    fn insert_comment(&self, comment: &Comment) -> Result<()>;

    /// Comments on an event, oldest first.
    fn list_comments(&self, event_id: &str) -> Result<Vec<Comment>>;

    // ─── Jobs ───────────────────────────────────────────────────────────────

    fn insert_job(&self, job: &MaintenanceActionSet) -> Result<()>;

    fn update_job(&self, job: &MaintenanceActionSet) -> Result<()>;

    fn get_job(&self, id: &str) -> Result<Option<MaintenanceActionSet>>;

    fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<MaintenanceActionSet>>;

    fn delete_job(&self, id: &str) -> Result<()>;

    // ─── Actions ────────────────────────────────────────────────────────────

    fn insert_action(&self, action: &Action) -> Result<()>;

    fn update_action(&self, action: &Action) -> Result<()>;

    fn get_action(&self, id: &str) -> Result<Option<Action>>;

    fn list_actions(&self, job_id: &str) -> Result<Vec<Action>>;

    fn delete_action(&self, id: &str) -> Result<()>;

    fn insert_action_tool(&self, tool: &ActionTool) -> Result<()>;

    fn list_action_tools(&self, action_id: &str) -> Result<Vec<ActionTool>>;

    // ─── Part Demands ───────────────────────────────────────────────────────

    fn insert_part_demand(&self, demand: &PartDemand) -> Result<()>;

    fn update_part_demand(&self, demand: &PartDemand) -> Result<()>;

    fn get_part_demand(&self, id: &str) -> Result<Option<PartDemand>>;

    fn list_part_demands(&self, action_id: &str) -> Result<Vec<PartDemand>>;

    fn delete_part_demand(&self, id: &str) -> Result<()>;

    // ─── Delays ─────────────────────────────────────────────────────────────

    fn insert_delay(&self, delay: &MaintenanceDelay) -> Result<()>;

    fn update_delay(&self, delay: &MaintenanceDelay) -> Result<()>;

    fn get_delay(&self, id: &str) -> Result<Option<MaintenanceDelay>>;

    /// Delays for a job, oldest first.
    fn list_delays(&self, job_id: &str) -> Result<Vec<MaintenanceDelay>>;
}
