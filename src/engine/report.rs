use serde::Serialize;

use super::lifecycle::load_job;
use crate::error::Result;
use crate::state::backend::Store;
use crate::state::models::{
    Action, ActionStatus, ActionTool, MaintenanceActionSet, MaintenanceDelay, PartDemand,
};

/// A job with its actions, their demands and tools, and its delays.
#[derive(Debug, Clone, Serialize)]
pub struct JobTree {
    pub job: MaintenanceActionSet,
    pub actions: Vec<ActionTree>,
    pub delays: Vec<MaintenanceDelay>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionTree {
    pub action: Action,
    pub part_demands: Vec<PartDemand>,
    pub tools: Vec<ActionTool>,
}

pub fn load_job_tree(store: &dyn Store, job_id: &str) -> Result<JobTree> {
    let job = load_job(store, job_id)?;
    let mut actions = Vec::new();
    for action in store.list_actions(job_id)? {
        let part_demands = store.list_part_demands(&action.id)?;
        let tools = store.list_action_tools(&action.id)?;
        actions.push(ActionTree {
            action,
            part_demands,
            tools,
        });
    }
    let delays = store.list_delays(job_id)?;
    Ok(JobTree {
        job,
        actions,
        delays,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobProgress {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub in_progress: usize,
    pub completion_percentage: f64,
    pub billable_hours: f64,
    pub delay_hours: f64,
}

/// `completed / total * 100`, or 0 for a job with no actions.
pub fn completion_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

pub fn job_progress(store: &dyn Store, job_id: &str) -> Result<JobProgress> {
    load_job(store, job_id)?;
    let mut progress = JobProgress::default();
    for action in store.list_actions(job_id)? {
        progress.total += 1;
        match action.status {
            ActionStatus::Completed => progress.completed += 1,
            ActionStatus::Skipped => progress.skipped += 1,
            ActionStatus::Cancelled => progress.cancelled += 1,
            ActionStatus::InProgress => progress.in_progress += 1,
            ActionStatus::NotStarted => {}
        }
        progress.billable_hours += action.billable_hours.unwrap_or(0.0);
    }
    progress.delay_hours = store
        .list_delays(job_id)?
        .iter()
        .filter_map(|d| d.delay_billable_hours)
        .sum();
    progress.completion_percentage = completion_percentage(progress.completed, progress.total);
    Ok(progress)
}
