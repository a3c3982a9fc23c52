//! Turns a template into a concrete job for one asset.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::audit;
use crate::error::{EngineError, Result};
use crate::state::backend::{PartCatalog, Store};
use crate::state::models::{
    new_id, Action, ActionTool, JobStatus, LoadedTemplate, MaintenanceActionSet, PartDemand,
    Priority,
};

/// Caller-supplied values that take precedence over the template's.
#[derive(Debug, Clone, Default)]
pub struct MaterializeOverrides {
    pub scheduled_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub maintenance_plan_id: Option<String>,
    /// Also materialize optional items and optional part demands.
    pub include_optional: Option<bool>,
    pub description: Option<String>,
}

/// Make sure every part and tool the materialized tree will reference exists.
fn check_references(
    catalog: &dyn PartCatalog,
    template: &LoadedTemplate,
    include_optional: bool,
) -> Result<()> {
    let mut parts = HashSet::new();
    let mut tools = HashSet::new();
    for entry in template
        .items
        .iter()
        .filter(|e| e.item.is_required || include_optional)
    {
        for demand in &entry.part_demands {
            if demand.is_optional && !include_optional {
                continue;
            }
            if parts.insert(demand.part_id.as_str()) && catalog.get_part(&demand.part_id)?.is_none()
            {
                return Err(EngineError::not_found("part", &demand.part_id));
            }
        }
        for tool in &entry.tools {
            if tools.insert(tool.tool_id.as_str()) && catalog.get_tool(&tool.tool_id)?.is_none() {
                return Err(EngineError::not_found("tool", &tool.tool_id));
            }
        }
    }
    Ok(())
}

/// Create a job, its event, actions, part demands and tool references from
/// `template`.
///
/// Actions are numbered `1..=N` in `(sequence_order, id)` order of the items
/// that were kept. Any failure leaves nothing behind once the caller's
/// transaction rolls back.
pub fn materialize(
    store: &dyn Store,
    catalog: &dyn PartCatalog,
    template: &LoadedTemplate,
    asset_id: &str,
    actor_id: &str,
    overrides: &MaterializeOverrides,
) -> Result<MaintenanceActionSet> {
    let set = &template.set;
    if asset_id.trim().is_empty() {
        return Err(EngineError::validation("asset id must not be empty"));
    }
    if !set.is_active {
        return Err(EngineError::validation(format!(
            "template '{}' revision {} has been superseded and cannot be materialized",
            set.task_name, set.revision
        )));
    }
    let include_optional = overrides.include_optional.unwrap_or(false);
    check_references(catalog, template, include_optional)?;

    let mut items: Vec<_> = template
        .items
        .iter()
        .filter(|e| e.item.is_required || include_optional)
        .collect();
    items.sort_by(|a, b| {
        (a.item.sequence_order, &a.item.id).cmp(&(b.item.sequence_order, &b.item.id))
    });

    let event = audit::create_event(
        store,
        audit::MAINTENANCE_EVENT_TYPE,
        &set.task_name,
        asset_id,
        actor_id,
        JobStatus::Planned.as_str(),
    )?;

    let mut job = MaintenanceActionSet::new(&set.task_name, asset_id, &event.id, actor_id);
    job.template_action_set_id = Some(set.id.clone());
    job.maintenance_plan_id = overrides.maintenance_plan_id.clone();
    job.description = overrides
        .description
        .clone()
        .or_else(|| set.description.clone());
    job.estimated_duration = set.estimated_duration;
    job.staff_count = set.staff_count;
    job.safety_review_required = set.safety_review_required;
    job.priority = overrides.priority.unwrap_or_default();
    job.scheduled_date = overrides.scheduled_date;
    store.insert_job(&job)?;

    for (position, entry) in items.iter().enumerate() {
        let item = &entry.item;
        let mut action = Action::new(&job.id, &item.action_name, position as i64 + 1, actor_id);
        action.template_action_item_id = Some(item.id.clone());
        action.description = item.description.clone();
        action.estimated_duration = item.estimated_duration;
        action.safety_notes = item.safety_notes.clone();
        action.instructions = item.instructions.clone();
        action.scheduled_start_time = job.scheduled_date;
        store.insert_action(&action)?;

        let demands = entry
            .part_demands
            .iter()
            .filter(|d| !d.is_optional || include_optional);
        for (seq, template_demand) in demands.enumerate() {
            let mut demand = PartDemand::new(
                &action.id,
                &template_demand.part_id,
                template_demand.quantity_required,
                seq as i64 + 1,
                actor_id,
            );
            demand.notes = template_demand.notes.clone();
            store.insert_part_demand(&demand)?;
        }

        for (seq, template_tool) in entry.tools.iter().enumerate() {
            store.insert_action_tool(&ActionTool {
                id: new_id(),
                action_id: action.id.clone(),
                tool_id: template_tool.tool_id.clone(),
                quantity_required: template_tool.quantity_required,
                is_required: template_tool.is_required,
                sequence_order: seq as i64 + 1,
            })?;
        }
        debug!(
            action_id = %action.id,
            sequence_order = action.sequence_order,
            name = %action.action_name,
            "Materialized action"
        );
    }

    let mut comment = format!("Maintenance event created: {}", set.task_name);
    if !items.is_empty() {
        comment.push_str(&format!(
            "\nGenerated {} actions from template: {}",
            items.len(),
            set.task_name
        ));
    }
    audit::append_comment(store, &event.id, actor_id, &comment)?;

    info!(
        job_id = %job.id,
        template_id = %set.id,
        asset_id,
        actions = items.len(),
        actor = actor_id,
        "Materialized maintenance job"
    );
    Ok(job)
}
