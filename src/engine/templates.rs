//! Template catalog: authoring templates and chaining revisions.

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::types::TemplateDefinition;
use crate::error::{EngineError, Result};
use crate::state::backend::Store;
use crate::state::models::{
    new_id, TemplateActionItem, TemplateActionSet, TemplateActionTool, TemplatePartDemand,
};

fn check_definition(definition: &TemplateDefinition) -> Result<()> {
    if definition.task_name.trim().is_empty() {
        return Err(EngineError::validation("template task name must not be empty"));
    }
    if definition.revision.trim().is_empty() {
        return Err(EngineError::validation("template revision must not be empty"));
    }
    for action in &definition.actions {
        if action.name.trim().is_empty() {
            return Err(EngineError::validation(format!(
                "template '{}' has an action with no name",
                definition.task_name
            )));
        }
        if let Some(part) = action
            .parts
            .iter()
            .find(|p| p.quantity <= Decimal::ZERO)
        {
            return Err(EngineError::validation(format!(
                "action '{}' requires {} of part '{}'; quantity must be positive",
                action.name, part.quantity, part.part
            )));
        }
        if let Some(tool) = action.tools.iter().find(|t| t.quantity <= 0) {
            return Err(EngineError::validation(format!(
                "action '{}' requires {} of tool '{}'; quantity must be positive",
                action.name, tool.quantity, tool.tool
            )));
        }
    }
    Ok(())
}

/// Insert a template and its whole tree. If the definition names a template
/// it supersedes, the new set becomes a revision of it.
pub fn create_template(
    store: &dyn Store,
    definition: &TemplateDefinition,
    actor_id: &str,
) -> Result<TemplateActionSet> {
    match &definition.supersedes {
        Some(prior) => {
            let prior = find_superseded(store, &definition.task_name, prior)?;
            create_revision(store, &prior.id, definition, actor_id)
        }
        None => insert_tree(store, definition, None, actor_id),
    }
}

/// Resolve a `supersedes` reference: a template id, or a revision label of
/// the same task.
fn find_superseded(
    store: &dyn Store,
    task_name: &str,
    reference: &str,
) -> Result<TemplateActionSet> {
    if let Some(set) = store.get_template_set(reference)? {
        return Ok(set);
    }
    store
        .list_template_sets(false)?
        .into_iter()
        .find(|s| s.task_name == task_name && s.revision == reference)
        .ok_or_else(|| EngineError::not_found("template", reference))
}

/// Insert `definition` as the next revision of `prior_id` and deactivate the
/// prior revision.
pub fn create_revision(
    store: &dyn Store,
    prior_id: &str,
    definition: &TemplateDefinition,
    actor_id: &str,
) -> Result<TemplateActionSet> {
    let mut prior = store
        .get_template_set(prior_id)?
        .ok_or_else(|| EngineError::not_found("template", prior_id))?;
    if prior.revision == definition.revision {
        return Err(EngineError::validation(format!(
            "revision '{}' of '{}' already exists",
            definition.revision, prior.task_name
        )));
    }
    if !prior.is_active {
        warn!(
            template_id = %prior.id,
            revision = %prior.revision,
            "Creating a revision of an already superseded template"
        );
    }

    let set = insert_tree(store, definition, Some(prior.id.clone()), actor_id)?;
    prior.is_active = false;
    store.update_template_set(&prior)?;
    info!(
        template_id = %set.id,
        prior_id = %prior.id,
        revision = %set.revision,
        "Created template revision"
    );
    Ok(set)
}

fn insert_tree(
    store: &dyn Store,
    definition: &TemplateDefinition,
    prior_revision_id: Option<String>,
    actor_id: &str,
) -> Result<TemplateActionSet> {
    check_definition(definition)?;

    let set = TemplateActionSet {
        id: new_id(),
        task_name: definition.task_name.clone(),
        description: definition.description.clone(),
        revision: definition.revision.clone(),
        prior_revision_id,
        is_active: true,
        estimated_duration: definition.estimated_duration,
        staff_count: definition.staff_count,
        safety_review_required: definition.safety_review_required,
        created_by: actor_id.to_string(),
        created_at: Utc::now(),
    };
    store.insert_template_set(&set)?;

    for action in &definition.actions {
        let item = TemplateActionItem {
            id: new_id(),
            template_action_set_id: set.id.clone(),
            action_name: action.name.clone(),
            description: action.description.clone(),
            sequence_order: action.sequence,
            is_required: action.required,
            estimated_duration: action.estimated_duration,
            minimum_staff_count: action.minimum_staff_count,
            instructions: action.instructions.clone(),
            required_skills: action.required_skills.clone(),
            safety_notes: action.safety_notes.clone(),
        };
        store.insert_template_item(&item)?;

        for (seq, part) in action.parts.iter().enumerate() {
            store.insert_template_part_demand(&TemplatePartDemand {
                id: new_id(),
                template_action_item_id: item.id.clone(),
                part_id: part.part.clone(),
                quantity_required: part.quantity,
                is_optional: part.optional,
                sequence_order: seq as i64 + 1,
                notes: part.notes.clone(),
            })?;
        }
        for (seq, tool) in action.tools.iter().enumerate() {
            store.insert_template_tool(&TemplateActionTool {
                id: new_id(),
                template_action_item_id: item.id.clone(),
                tool_id: tool.tool.clone(),
                quantity_required: tool.quantity,
                is_required: tool.required,
                sequence_order: seq as i64 + 1,
            })?;
        }
    }

    info!(
        template_id = %set.id,
        task_name = %set.task_name,
        revision = %set.revision,
        actions = definition.actions.len(),
        actor = actor_id,
        "Created template"
    );
    Ok(set)
}

/// Walk prior-revision links from `id` back to the first revision.
/// The newest revision comes first.
pub fn revision_chain(store: &dyn Store, id: &str) -> Result<Vec<TemplateActionSet>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(id.to_string());
    while let Some(current) = next {
        if !seen.insert(current.clone()) {
            warn!(template_id = %current, "Revision chain loops back on itself");
            break;
        }
        let set = store
            .get_template_set(&current)?
            .ok_or_else(|| EngineError::not_found("template", &current))?;
        next = set.prior_revision_id.clone();
        chain.push(set);
    }
    Ok(chain)
}

/// Activate or retire a template revision.
pub fn set_active(
    store: &dyn Store,
    id: &str,
    active: bool,
) -> Result<TemplateActionSet> {
    let mut set = store
        .get_template_set(id)?
        .ok_or_else(|| EngineError::not_found("template", id))?;
    set.is_active = active;
    store.update_template_set(&set)?;
    info!(template_id = id, active, "Changed template activation");
    Ok(set)
}
