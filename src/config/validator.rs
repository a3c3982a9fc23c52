use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use rust_decimal::Decimal;

use super::types::{DefinitionFile, TemplateDefinition};

/// Validate a definition file before anything is written.
pub fn validate(definitions: &DefinitionFile) -> Result<()> {
    validate_catalog(definitions)?;
    validate_unique_revisions(definitions)?;
    for template in &definitions.templates {
        validate_template(template)?;
    }
    Ok(())
}

fn validate_catalog(definitions: &DefinitionFile) -> Result<()> {
    let mut part_ids = HashSet::new();
    for part in &definitions.parts {
        if part.id.trim().is_empty() {
            bail!("Part '{}' has an empty id", part.name);
        }
        if !part_ids.insert(part.id.as_str()) {
            bail!("Duplicate part id '{}'", part.id);
        }
        if part.unit_cost < Decimal::ZERO || part.stock_level < Decimal::ZERO {
            bail!("Part '{}' has a negative cost or stock level", part.id);
        }
    }

    let mut tool_ids = HashSet::new();
    for tool in &definitions.tools {
        if !tool_ids.insert(tool.id.as_str()) {
            bail!("Duplicate tool id '{}'", tool.id);
        }
    }
    Ok(())
}

fn validate_unique_revisions(definitions: &DefinitionFile) -> Result<()> {
    let mut seen = HashSet::new();
    for template in &definitions.templates {
        if !seen.insert((template.task_name.as_str(), template.revision.as_str())) {
            bail!(
                "Template '{}' revision '{}' is defined more than once",
                template.task_name,
                template.revision
            );
        }
    }
    Ok(())
}

/// Check one template. Duplicate sequence numbers are allowed (items fall
/// back to insertion order) but reported.
pub fn validate_template(template: &TemplateDefinition) -> Result<()> {
    if template.task_name.trim().is_empty() {
        bail!("Template has an empty task_name");
    }

    let mut sequences: HashMap<i64, &str> = HashMap::new();
    for action in &template.actions {
        if action.name.trim().is_empty() {
            bail!("Template '{}' has an action with no name", template.task_name);
        }
        if let Some(other) = sequences.insert(action.sequence, action.name.as_str()) {
            tracing::warn!(
                template = %template.task_name,
                sequence = action.sequence,
                first = other,
                second = %action.name,
                "Duplicate sequence number in template"
            );
        }
        for part in &action.parts {
            if part.quantity <= Decimal::ZERO {
                bail!(
                    "Action '{}' in template '{}' requires {} of part '{}'; quantity must be positive",
                    action.name,
                    template.task_name,
                    part.quantity,
                    part.part
                );
            }
        }
        for tool in &action.tools {
            if tool.quantity <= 0 {
                bail!(
                    "Action '{}' in template '{}' requires a non-positive quantity of tool '{}'",
                    action.name,
                    template.task_name,
                    tool.tool
                );
            }
        }
    }
    Ok(())
}
