use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::state::backend::Store;
use crate::state::models::{new_id, Comment, Event, MaintenanceDelay};

pub const MAINTENANCE_EVENT_TYPE: &str = "Maintenance";

/// Create the Event row a job's comments hang off.
pub fn create_event(
    store: &dyn Store,
    event_type: &str,
    description: &str,
    asset_id: &str,
    actor_id: &str,
    status: &str,
) -> Result<Event> {
    let event = Event {
        id: new_id(),
        event_type: event_type.to_string(),
        description: description.to_string(),
        asset_id: asset_id.to_string(),
        status: status.to_string(),
        created_by: actor_id.to_string(),
        created_at: Utc::now(),
    };
    store.insert_event(&event)?;
    Ok(event)
}

/// Append a user-visible comment to an event. Comments are never edited.
pub fn append_comment(
    store: &dyn Store,
    event_id: &str,
    actor_id: &str,
    content: &str,
) -> Result<Comment> {
    let comment = Comment {
        id: new_id(),
        event_id: event_id.to_string(),
        content: content.to_string(),
        created_by: actor_id.to_string(),
        created_at: Utc::now(),
    };
    store.insert_comment(&comment)?;
    tracing::debug!(event_id, actor = actor_id, "Appended audit comment");
    Ok(comment)
}

pub fn status_change(from: &str, to: &str) -> String {
    format!("Status changed from '{}' to '{}'", from, to)
}

/// Multi-line description of a delay, used when it is added and resolved.
pub fn delay_detail(heading: &str, delay: &MaintenanceDelay) -> String {
    let mut lines = vec![
        format!("{}: {}", heading, delay.delay_type),
        format!("Reason: {}", delay.delay_reason),
        format!(
            "Window: {} to {}",
            format_time(&delay.delay_start_date),
            delay
                .delay_end_date
                .as_ref()
                .map(format_time)
                .unwrap_or_else(|| "ongoing".to_string())
        ),
        format!(
            "Billable hours: {}",
            delay
                .delay_billable_hours
                .map(|h| format!("{:.2}", h))
                .unwrap_or_else(|| "none".to_string())
        ),
        format!("Priority: {}", delay.priority),
    ];
    if let Some(ref notes) = delay.delay_notes {
        lines.push(format!("Notes: {}", notes));
    }
    lines.join("\n")
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::models::Priority;
    use chrono::TimeZone;

    #[test]
    fn test_delay_detail_for_active_delay() {
        let delay = MaintenanceDelay {
            id: "d-1".into(),
            maintenance_action_set_id: "j-1".into(),
            delay_type: "Parts".into(),
            delay_reason: "Waiting on filter".into(),
            delay_start_date: Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap(),
            delay_end_date: None,
            delay_billable_hours: Some(1.5),
            delay_notes: None,
            priority: Priority::High,
            created_by: "u-1".into(),
            created_at: Utc::now(),
        };
        let text = delay_detail("Delay added", &delay);
        assert_eq!(
            text,
            "Delay added: Parts\n\
             Reason: Waiting on filter\n\
             Window: 2026-03-01 08:30 UTC to ongoing\n\
             Billable hours: 1.50\n\
             Priority: High"
        );
    }
}
