use chrono::{DateTime, Utc};
use tracing::info;

use super::audit;
use super::lifecycle::{job_error, load_job, transition_job};
use crate::error::{EngineError, Result};
use crate::state::backend::Store;
use crate::state::models::{new_id, JobStatus, MaintenanceDelay, Priority};

/// Parameters for recording a delay.
#[derive(Debug, Clone)]
pub struct NewDelay {
    pub delay_type: String,
    pub reason: String,
    /// Defaults to now.
    pub start: Option<DateTime<Utc>>,
    pub billable_hours: Option<f64>,
    pub notes: Option<String>,
    pub priority: Priority,
}

impl NewDelay {
    pub fn new(delay_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            delay_type: delay_type.into(),
            reason: reason.into(),
            start: None,
            billable_hours: None,
            notes: None,
            priority: Priority::default(),
        }
    }
}

fn check_hours(hours: Option<f64>) -> Result<()> {
    match hours {
        Some(h) if !h.is_finite() || h < 0.0 => Err(EngineError::validation(format!(
            "billable hours must be a non-negative number, got {}",
            h
        ))),
        _ => Ok(()),
    }
}

/// The job's currently open delay, if any.
pub fn active_delay(store: &dyn Store, job_id: &str) -> Result<Option<MaintenanceDelay>> {
    Ok(store
        .list_delays(job_id)?
        .into_iter()
        .find(MaintenanceDelay::is_active))
}

/// Record a delay and move the job to Delayed.
///
/// A job that is already Delayed with no open delay (it was resolved without
/// resuming) just gets the new row; the status stays as it is.
pub fn add_delay(
    store: &dyn Store,
    job_id: &str,
    actor_id: &str,
    params: &NewDelay,
) -> Result<MaintenanceDelay> {
    if params.delay_type.trim().is_empty() || params.reason.trim().is_empty() {
        return Err(EngineError::validation("delay type and reason are required"));
    }
    check_hours(params.billable_hours)?;

    let mut job = load_job(store, job_id)?;
    if job.status.is_terminal() {
        return Err(job_error(&job, "delay"));
    }
    if active_delay(store, job_id)?.is_some() {
        return Err(EngineError::InvalidTransition {
            entity: "job",
            id: job.id.clone(),
            status: format!("{} with an active delay", job.status),
            operation: "delay",
        });
    }

    let now = Utc::now();
    let delay = MaintenanceDelay {
        id: new_id(),
        maintenance_action_set_id: job.id.clone(),
        delay_type: params.delay_type.clone(),
        delay_reason: params.reason.clone(),
        delay_start_date: params.start.unwrap_or(now),
        delay_end_date: None,
        delay_billable_hours: params.billable_hours,
        delay_notes: params.notes.clone(),
        priority: params.priority,
        created_by: actor_id.to_string(),
        created_at: now,
    };
    store.insert_delay(&delay)?;

    let detail = audit::delay_detail("Delay added", &delay);
    if params.notes.is_some() {
        job.delay_notes = params.notes.clone();
    }
    if job.status == JobStatus::Delayed {
        job.touch(actor_id);
        store.update_job(&job)?;
        audit::append_comment(store, &job.event_id, actor_id, &detail)?;
    } else {
        transition_job(
            store,
            &mut job,
            JobStatus::Delayed,
            actor_id,
            "delay",
            Some(&detail),
        )?;
    }

    info!(
        job_id,
        delay_id = %delay.id,
        delay_type = %delay.delay_type,
        actor = actor_id,
        "Added delay"
    );
    Ok(delay)
}

/// Close a delay. With `resume` set, a Delayed job whose last open delay this
/// was goes back to In Progress in the same unit of work.
pub fn resolve_delay(
    store: &dyn Store,
    delay_id: &str,
    actor_id: &str,
    end: Option<DateTime<Utc>>,
    billable_hours: Option<f64>,
    resume: bool,
) -> Result<MaintenanceDelay> {
    check_hours(billable_hours)?;
    let mut delay = store
        .get_delay(delay_id)?
        .ok_or_else(|| EngineError::not_found("delay", delay_id))?;
    if !delay.is_active() {
        return Err(EngineError::InvalidTransition {
            entity: "delay",
            id: delay.id.clone(),
            status: "Resolved".to_string(),
            operation: "resolve",
        });
    }

    let end = end.unwrap_or_else(Utc::now);
    if end < delay.delay_start_date {
        return Err(EngineError::validation(format!(
            "delay end {} is before its start {}",
            audit::format_time(&end),
            audit::format_time(&delay.delay_start_date)
        )));
    }

    let mut job = load_job(store, &delay.maintenance_action_set_id)?;
    delay.delay_end_date = Some(end);
    if billable_hours.is_some() {
        delay.delay_billable_hours = billable_hours;
    }
    store.update_delay(&delay)?;

    let detail = audit::delay_detail("Delay resolved", &delay);
    let still_delayed = active_delay(store, &job.id)?.is_some();
    if resume && job.status == JobStatus::Delayed && !still_delayed {
        transition_job(
            store,
            &mut job,
            JobStatus::InProgress,
            actor_id,
            "resume",
            Some(&detail),
        )?;
    } else {
        audit::append_comment(store, &job.event_id, actor_id, &detail)?;
    }

    info!(
        delay_id,
        job_id = %job.id,
        job_status = %job.status,
        actor = actor_id,
        "Resolved delay"
    );
    Ok(delay)
}
