//! Structure edits on a job: adding, reordering and deleting actions, and
//! deleting whole jobs.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use super::audit;
use super::lifecycle::{ensure_job_open, load_action, load_job};
use crate::error::{EngineError, Result};
use crate::state::backend::Store;
use crate::state::models::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveDirection::Up => f.write_str("up"),
            MoveDirection::Down => f.write_str("down"),
        }
    }
}

impl FromStr for MoveDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            other => Err(format!("unknown direction '{}', expected up or down", other)),
        }
    }
}

/// One past the highest sequence_order among a job's actions.
pub fn next_sequence_order(store: &dyn Store, job_id: &str) -> Result<i64> {
    Ok(store
        .list_actions(job_id)?
        .iter()
        .map(|a| a.sequence_order)
        .max()
        .unwrap_or(0)
        + 1)
}

pub fn add_action(
    store: &dyn Store,
    job_id: &str,
    action_name: &str,
    description: Option<&str>,
    actor_id: &str,
) -> Result<Action> {
    if action_name.trim().is_empty() {
        return Err(EngineError::validation("action name must not be empty"));
    }
    let job = load_job(store, job_id)?;
    ensure_job_open(&job, "add actions to")?;

    let mut action = Action::new(
        job_id,
        action_name,
        next_sequence_order(store, job_id)?,
        actor_id,
    );
    action.description = description.map(str::to_string);
    store.insert_action(&action)?;
    audit::append_comment(
        store,
        &job.event_id,
        actor_id,
        &format!(
            "Action '{}' added at position {}",
            action.action_name, action.sequence_order
        ),
    )?;
    info!(job_id, action_id = %action.id, actor = actor_id, "Added action");
    Ok(action)
}

/// Swap an action with its neighbour. Exactly two rows change.
pub fn move_action(
    store: &dyn Store,
    action_id: &str,
    direction: MoveDirection,
    actor_id: &str,
) -> Result<Vec<Action>> {
    let action = load_action(store, action_id)?;
    let job = load_job(store, &action.maintenance_action_set_id)?;
    ensure_job_open(&job, "reorder actions of")?;

    let siblings = store.list_actions(&job.id)?;
    let index = siblings
        .iter()
        .position(|a| a.id == action.id)
        .ok_or_else(|| EngineError::not_found("action", action_id))?;
    let neighbour = match direction {
        MoveDirection::Up => index.checked_sub(1),
        MoveDirection::Down => Some(index + 1).filter(|i| *i < siblings.len()),
    };
    let Some(neighbour) = neighbour else {
        return Err(EngineError::validation(format!(
            "action '{}' is already at the {} and cannot move {}",
            action.action_name,
            if direction == MoveDirection::Up { "top" } else { "bottom" },
            direction
        )));
    };

    let mut moved = siblings[index].clone();
    let mut other = siblings[neighbour].clone();
    std::mem::swap(&mut moved.sequence_order, &mut other.sequence_order);
    moved.touch(actor_id);
    other.touch(actor_id);
    store.update_action(&moved)?;
    store.update_action(&other)?;

    audit::append_comment(
        store,
        &job.event_id,
        actor_id,
        &format!(
            "Action '{}' moved {} to position {} (swapped with '{}')",
            moved.action_name, direction, moved.sequence_order, other.action_name
        ),
    )?;
    info!(action_id, direction = %direction, actor = actor_id, "Moved action");

    let mut changed = store.list_actions(&job.id)?;
    changed.retain(|a| a.id == moved.id || a.id == other.id);
    Ok(changed)
}

/// Delete an action that has no part demands or tools left.
pub fn delete_action(store: &dyn Store, action_id: &str, actor_id: &str) -> Result<()> {
    let action = load_action(store, action_id)?;
    let job = load_job(store, &action.maintenance_action_set_id)?;
    ensure_job_open(&job, "delete actions of")?;

    let demands = store.list_part_demands(action_id)?.len();
    if demands > 0 {
        return Err(EngineError::HasDependents {
            entity: "action",
            id: action.id,
            count: demands,
            children: "part demands",
        });
    }
    let tools = store.list_action_tools(action_id)?.len();
    if tools > 0 {
        return Err(EngineError::HasDependents {
            entity: "action",
            id: action.id,
            count: tools,
            children: "tools",
        });
    }

    store.delete_action(action_id)?;
    audit::append_comment(
        store,
        &job.event_id,
        actor_id,
        &format!("Action '{}' deleted", action.action_name),
    )?;
    info!(action_id, actor = actor_id, "Deleted action");
    Ok(())
}

/// Delete a job with no actions or delays. The event and its comments stay
/// behind as the record that the job existed.
pub fn delete_job(store: &dyn Store, job_id: &str, actor_id: &str) -> Result<()> {
    let job = load_job(store, job_id)?;

    let actions = store.list_actions(job_id)?.len();
    if actions > 0 {
        return Err(EngineError::HasDependents {
            entity: "job",
            id: job.id,
            count: actions,
            children: "actions",
        });
    }
    let delays = store.list_delays(job_id)?.len();
    if delays > 0 {
        return Err(EngineError::HasDependents {
            entity: "job",
            id: job.id,
            count: delays,
            children: "delays",
        });
    }

    store.delete_job(job_id)?;
    audit::append_comment(
        store,
        &job.event_id,
        actor_id,
        &format!("Maintenance job '{}' deleted", job.task_name),
    )?;
    info!(job_id, actor = actor_id, "Deleted maintenance job");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parsing() {
        assert_eq!("UP".parse::<MoveDirection>(), Ok(MoveDirection::Up));
        assert_eq!("down".parse::<MoveDirection>(), Ok(MoveDirection::Down));
        assert!("left".parse::<MoveDirection>().is_err());
    }
}
