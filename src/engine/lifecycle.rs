//! Status machines for jobs and their actions.
//!
//! Job:    Planned → In Progress → {Delayed, Complete, Cancelled}
//!         Planned → {Delayed, Cancelled}, Delayed → {In Progress, Cancelled}
//! Action: Not Started → {In Progress, Skipped, Completed, Cancelled}
//!         In Progress → {Completed, Cancelled}
//!
//! Illegal calls fail with `InvalidTransition` before anything is written.
//! The one exception is `start_job` on a job that is already running, which
//! returns the job unchanged.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::audit;
use crate::error::{EngineError, Result};
use crate::state::backend::Store;
use crate::state::models::{Action, ActionStatus, JobStatus, MaintenanceActionSet};

impl JobStatus {
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Planned, InProgress)
                | (Planned, Delayed)
                | (Planned, Cancelled)
                | (InProgress, Delayed)
                | (InProgress, Complete)
                | (InProgress, Cancelled)
                | (Delayed, InProgress)
                | (Delayed, Cancelled)
        )
    }
}

impl ActionStatus {
    pub fn can_transition_to(self, next: ActionStatus) -> bool {
        use ActionStatus::*;
        matches!(
            (self, next),
            (NotStarted, InProgress)
                | (NotStarted, Skipped)
                | (NotStarted, Completed)
                | (NotStarted, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }
}

// ─── Loading helpers ────────────────────────────────────────────────────────

pub(crate) fn load_job(store: &dyn Store, job_id: &str) -> Result<MaintenanceActionSet> {
    store
        .get_job(job_id)?
        .ok_or_else(|| EngineError::not_found("job", job_id))
}

pub(crate) fn load_action(store: &dyn Store, action_id: &str) -> Result<Action> {
    store
        .get_action(action_id)?
        .ok_or_else(|| EngineError::not_found("action", action_id))
}

pub(crate) fn job_error(job: &MaintenanceActionSet, operation: &'static str) -> EngineError {
    EngineError::InvalidTransition {
        entity: "job",
        id: job.id.clone(),
        status: job.status.to_string(),
        operation,
    }
}

fn action_error(action: &Action, operation: &'static str) -> EngineError {
    EngineError::InvalidTransition {
        entity: "action",
        id: action.id.clone(),
        status: action.status.to_string(),
        operation,
    }
}

/// Actions of a finished or cancelled job are frozen.
pub(crate) fn ensure_job_open(job: &MaintenanceActionSet, operation: &'static str) -> Result<()> {
    if job.status.is_terminal() {
        return Err(job_error(job, operation));
    }
    Ok(())
}

/// Work on actions (starting or completing them) needs a job that is
/// Planned or In Progress. A Delayed job must be resumed first.
fn ensure_job_workable(job: &MaintenanceActionSet, operation: &'static str) -> Result<()> {
    if !matches!(job.status, JobStatus::Planned | JobStatus::InProgress) {
        return Err(job_error(job, operation));
    }
    Ok(())
}

fn require_text(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// Persist a job status change, mirror it onto the event and log it.
/// `detail` is appended to the same comment.
pub(crate) fn transition_job(
    store: &dyn Store,
    job: &mut MaintenanceActionSet,
    to: JobStatus,
    actor_id: &str,
    operation: &'static str,
    detail: Option<&str>,
) -> Result<()> {
    let from = job.status;
    if !from.can_transition_to(to) {
        return Err(job_error(job, operation));
    }
    job.status = to;
    job.touch(actor_id);
    store.update_job(job)?;
    store.set_event_status(&job.event_id, to.as_str())?;

    let mut content = audit::status_change(from.as_str(), to.as_str());
    if let Some(detail) = detail {
        content.push('\n');
        content.push_str(detail);
    }
    audit::append_comment(store, &job.event_id, actor_id, &content)?;
    debug!(job_id = %job.id, from = %from, to = %to, "Job status changed");
    Ok(())
}

/// Move a Planned job to In Progress on behalf of one of its actions.
fn cascade_start(
    store: &dyn Store,
    job: &mut MaintenanceActionSet,
    action: &Action,
    actor_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    if job.status != JobStatus::Planned {
        return Ok(());
    }
    job.start_date = Some(now);
    let detail = format!("Started by action '{}'", action.action_name);
    transition_job(store, job, JobStatus::InProgress, actor_id, "start", Some(&detail))
}

fn save_action(
    store: &dyn Store,
    job: &MaintenanceActionSet,
    action: &mut Action,
    actor_id: &str,
    comment: &str,
) -> Result<()> {
    action.touch(actor_id);
    store.update_action(action)?;
    audit::append_comment(store, &job.event_id, actor_id, comment)?;
    Ok(())
}

/// Hours between two instants, never negative, rounded to hundredths.
pub fn elapsed_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let seconds = (end - start).num_seconds().max(0) as f64;
    (seconds / 3600.0 * 100.0).round() / 100.0
}

// ─── Job operations ─────────────────────────────────────────────────────────

pub fn start_job(store: &dyn Store, job_id: &str, actor_id: &str) -> Result<MaintenanceActionSet> {
    let mut job = load_job(store, job_id)?;
    match job.status {
        JobStatus::InProgress => {
            debug!(job_id, "Job already in progress, nothing to do");
            return Ok(job);
        }
        JobStatus::Planned => {}
        _ => return Err(job_error(&job, "start")),
    }

    job.start_date = Some(Utc::now());
    transition_job(store, &mut job, JobStatus::InProgress, actor_id, "start", None)?;
    info!(job_id, actor = actor_id, "Started maintenance job");
    Ok(job)
}

/// Delayed → In Progress. Refused while a delay is still open.
pub fn resume_job(store: &dyn Store, job_id: &str, actor_id: &str) -> Result<MaintenanceActionSet> {
    let mut job = load_job(store, job_id)?;
    if job.status != JobStatus::Delayed {
        return Err(job_error(&job, "resume"));
    }
    if store.list_delays(job_id)?.iter().any(|d| d.is_active()) {
        return Err(EngineError::InvalidTransition {
            entity: "job",
            id: job.id.clone(),
            status: format!("{} with an active delay", job.status),
            operation: "resume",
        });
    }

    transition_job(store, &mut job, JobStatus::InProgress, actor_id, "resume", None)?;
    info!(job_id, actor = actor_id, "Resumed maintenance job");
    Ok(job)
}

/// Complete a job once every action is finished. A Planned job whose actions
/// were all skipped is started and completed in one go.
pub fn complete_job(
    store: &dyn Store,
    job_id: &str,
    actor_id: &str,
    notes: Option<&str>,
) -> Result<MaintenanceActionSet> {
    let mut job = load_job(store, job_id)?;
    ensure_job_open(&job, "complete")?;

    let remaining = store
        .list_actions(job_id)?
        .iter()
        .filter(|a| !a.status.is_terminal())
        .count();
    if remaining > 0 {
        return Err(EngineError::ActionsIncomplete {
            job_id: job.id.clone(),
            remaining,
        });
    }

    if job.status == JobStatus::Delayed {
        return Err(job_error(&job, "complete"));
    }

    let now = Utc::now();
    if job.status == JobStatus::Planned {
        job.start_date = Some(now);
        transition_job(store, &mut job, JobStatus::InProgress, actor_id, "complete", None)?;
    }

    job.end_date = Some(now);
    job.completed_by_id = Some(actor_id.to_string());
    job.completion_notes = notes.map(str::to_string);
    let detail = notes.map(|n| format!("Notes: {}", n));
    transition_job(
        store,
        &mut job,
        JobStatus::Complete,
        actor_id,
        "complete",
        detail.as_deref(),
    )?;
    info!(job_id, actor = actor_id, "Completed maintenance job");
    Ok(job)
}

/// Cancel a job from any non-terminal state. Open delays are closed at the
/// cancellation time.
pub fn cancel_job(
    store: &dyn Store,
    job_id: &str,
    actor_id: &str,
    reason: &str,
) -> Result<MaintenanceActionSet> {
    require_text(reason, "cancellation reason")?;
    let mut job = load_job(store, job_id)?;
    ensure_job_open(&job, "cancel")?;

    let now = Utc::now();
    let mut closed = 0;
    for mut delay in store.list_delays(job_id)? {
        if delay.is_active() {
            delay.delay_end_date = Some(now);
            store.update_delay(&delay)?;
            closed += 1;
        }
    }

    job.end_date = Some(now);
    job.completion_notes = Some(format!("Cancelled: {}", reason));
    let mut detail = format!("Reason: {}", reason);
    if closed > 0 {
        detail.push_str(&format!("\nClosed {} active delay(s)", closed));
    }
    transition_job(
        store,
        &mut job,
        JobStatus::Cancelled,
        actor_id,
        "cancel",
        Some(&detail),
    )?;
    info!(job_id, actor = actor_id, reason, "Cancelled maintenance job");
    Ok(job)
}

// ─── Action operations ──────────────────────────────────────────────────────

/// Start an action, starting its job first when the job is still Planned.
pub fn start_action(store: &dyn Store, action_id: &str, actor_id: &str) -> Result<Action> {
    let mut action = load_action(store, action_id)?;
    if !action.status.can_transition_to(ActionStatus::InProgress) {
        return Err(action_error(&action, "start"));
    }
    let mut job = load_job(store, &action.maintenance_action_set_id)?;
    ensure_job_workable(&job, "start actions of")?;

    let now = Utc::now();
    cascade_start(store, &mut job, &action, actor_id, now)?;

    action.status = ActionStatus::InProgress;
    action.start_time = Some(now);
    let comment = format!("Action '{}' started", action.action_name);
    save_action(store, &job, &mut action, actor_id, &comment)?;
    info!(action_id, job_id = %job.id, actor = actor_id, "Started action");
    Ok(action)
}

/// Complete an action. Billable hours default to the time since the action
/// was started, or zero if it never was.
pub fn complete_action(
    store: &dyn Store,
    action_id: &str,
    actor_id: &str,
    notes: Option<&str>,
    billable_hours: Option<f64>,
) -> Result<Action> {
    if let Some(hours) = billable_hours {
        if !hours.is_finite() || hours < 0.0 {
            return Err(EngineError::validation(format!(
                "billable hours must be a non-negative number, got {}",
                hours
            )));
        }
    }
    let mut action = load_action(store, action_id)?;
    if !action.status.can_transition_to(ActionStatus::Completed) {
        return Err(action_error(&action, "complete"));
    }
    let mut job = load_job(store, &action.maintenance_action_set_id)?;
    ensure_job_workable(&job, "complete actions of")?;

    let now = Utc::now();
    cascade_start(store, &mut job, &action, actor_id, now)?;

    let end = *action.end_time.get_or_insert(now);
    let hours = billable_hours.unwrap_or_else(|| {
        action
            .start_time
            .map(|start| elapsed_hours(start, end))
            .unwrap_or(0.0)
    });
    action.billable_hours = Some(hours);
    action.status = ActionStatus::Completed;
    if let Some(notes) = notes {
        action.completion_notes = Some(notes.to_string());
    }

    let mut comment = format!(
        "Action '{}' completed ({:.2} billable hours)",
        action.action_name, hours
    );
    if let Some(notes) = notes {
        comment.push_str(&format!("\nNotes: {}", notes));
    }
    save_action(store, &job, &mut action, actor_id, &comment)?;
    info!(action_id, job_id = %job.id, actor = actor_id, hours, "Completed action");
    Ok(action)
}

pub fn skip_action(
    store: &dyn Store,
    action_id: &str,
    actor_id: &str,
    reason: &str,
) -> Result<Action> {
    require_text(reason, "skip reason")?;
    let mut action = load_action(store, action_id)?;
    if !action.status.can_transition_to(ActionStatus::Skipped) {
        return Err(action_error(&action, "skip"));
    }
    let job = load_job(store, &action.maintenance_action_set_id)?;
    ensure_job_open(&job, "skip actions of")?;

    action.status = ActionStatus::Skipped;
    action.completion_notes = Some(format!("Skipped: {}", reason));
    let comment = format!("Action '{}' skipped: {}", action.action_name, reason);
    save_action(store, &job, &mut action, actor_id, &comment)?;
    info!(action_id, job_id = %job.id, actor = actor_id, "Skipped action");
    Ok(action)
}

pub fn cancel_action(
    store: &dyn Store,
    action_id: &str,
    actor_id: &str,
    reason: &str,
) -> Result<Action> {
    require_text(reason, "cancellation reason")?;
    let mut action = load_action(store, action_id)?;
    if !action.status.can_transition_to(ActionStatus::Cancelled) {
        return Err(action_error(&action, "cancel"));
    }
    let job = load_job(store, &action.maintenance_action_set_id)?;
    ensure_job_open(&job, "cancel actions of")?;

    action.status = ActionStatus::Cancelled;
    action.completion_notes = Some(format!("Cancelled: {}", reason));
    let comment = format!("Action '{}' cancelled: {}", action.action_name, reason);
    save_action(store, &job, &mut action, actor_id, &comment)?;
    info!(action_id, job_id = %job.id, actor = actor_id, "Cancelled action");
    Ok(action)
}
