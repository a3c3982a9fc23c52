use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Generate a fresh row id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Status-like enums are stored as their display text. Parsing is lenient
/// about case and separators so "in_progress" and "In Progress" both work.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize(s);
                $(
                    if normalize($text) == wanted {
                        return Ok($name::$variant);
                    }
                )+
                Err(format!("unknown {} '{}'", stringify!($name), s))
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(d)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

// ─── Status Enums ───────────────────────────────────────────────────────────

/// Status of a maintenance job (`MaintenanceActionSet`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Planned,
    InProgress,
    Delayed,
    Complete,
    Cancelled,
}

text_enum!(JobStatus {
    Planned => "Planned",
    InProgress => "In Progress",
    Delayed => "Delayed",
    Complete => "Complete",
    Cancelled => "Cancelled",
});

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Cancelled)
    }
}

/// Status of a single action within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionStatus {
    NotStarted,
    InProgress,
    Completed,
    Skipped,
    Cancelled,
}

text_enum!(ActionStatus {
    NotStarted => "Not Started",
    InProgress => "In Progress",
    Completed => "Completed",
    Skipped => "Skipped",
    Cancelled => "Cancelled",
});

impl ActionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ActionStatus::Completed | ActionStatus::Skipped | ActionStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartDemandStatus {
    Planned,
    Received,
    Used,
    Cancelled,
}

text_enum!(PartDemandStatus {
    Planned => "Planned",
    Received => "Received",
    Used => "Used",
    Cancelled => "Cancelled",
});

impl PartDemandStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PartDemandStatus::Used | PartDemandStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

text_enum!(Priority {
    Low => "Low",
    Medium => "Medium",
    High => "High",
    Critical => "Critical",
});

// ─── Part / Tool Catalog ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub part_number: String,
    pub name: String,
    pub unit_cost: Decimal,
    pub stock_level: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub status: String,
}

// ─── Template Catalog ───────────────────────────────────────────────────────

/// A reusable maintenance procedure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateActionSet {
    pub id: String,
    pub task_name: String,
    pub description: Option<String>,
    pub revision: String,
    pub prior_revision_id: Option<String>,
    pub is_active: bool,
    pub estimated_duration: Option<f64>,
    pub staff_count: Option<i64>,
    pub safety_review_required: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateActionItem {
    pub id: String,
    pub template_action_set_id: String,
    pub action_name: String,
    pub description: Option<String>,
    pub sequence_order: i64,
    pub is_required: bool,
    pub estimated_duration: Option<f64>,
    pub minimum_staff_count: Option<i64>,
    pub instructions: Option<String>,
    pub required_skills: Option<String>,
    pub safety_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplatePartDemand {
    pub id: String,
    pub template_action_item_id: String,
    pub part_id: String,
    pub quantity_required: Decimal,
    pub is_optional: bool,
    pub sequence_order: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateActionTool {
    pub id: String,
    pub template_action_item_id: String,
    pub tool_id: String,
    pub quantity_required: i64,
    pub is_required: bool,
    pub sequence_order: i64,
}

/// A template with its whole tree fetched, children in `(sequence_order, id)` order.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedTemplate {
    pub set: TemplateActionSet,
    pub items: Vec<LoadedTemplateItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadedTemplateItem {
    pub item: TemplateActionItem,
    pub part_demands: Vec<TemplatePartDemand>,
    pub tools: Vec<TemplateActionTool>,
}

// ─── Jobs ───────────────────────────────────────────────────────────────────

/// A concrete, asset-bound maintenance job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceActionSet {
    pub id: String,
    pub template_action_set_id: Option<String>,
    pub maintenance_plan_id: Option<String>,
    pub asset_id: String,
    pub event_id: String,
    pub task_name: String,
    pub description: Option<String>,
    pub estimated_duration: Option<f64>,
    pub staff_count: Option<i64>,
    pub safety_review_required: bool,
    pub status: JobStatus,
    pub priority: Priority,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub completed_by_id: Option<String>,
    pub completion_notes: Option<String>,
    pub delay_notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl MaintenanceActionSet {
    /// Build a planned job bound to `asset_id`. Nothing is persisted here.
    pub fn new(task_name: &str, asset_id: &str, event_id: &str, actor_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            template_action_set_id: None,
            maintenance_plan_id: None,
            asset_id: asset_id.to_string(),
            event_id: event_id.to_string(),
            task_name: task_name.to_string(),
            description: None,
            estimated_duration: None,
            staff_count: None,
            safety_review_required: false,
            status: JobStatus::Planned,
            priority: Priority::default(),
            scheduled_date: None,
            start_date: None,
            end_date: None,
            completed_by_id: None,
            completion_notes: None,
            delay_notes: None,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_by: actor_id.to_string(),
            updated_at: now,
        }
    }

    /// Stamp the updated_* audit fields.
    pub fn touch(&mut self, actor_id: &str) {
        self.updated_by = actor_id.to_string();
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub id: String,
    pub maintenance_action_set_id: String,
    pub template_action_item_id: Option<String>,
    pub action_name: String,
    pub description: Option<String>,
    pub sequence_order: i64,
    pub status: ActionStatus,
    pub estimated_duration: Option<f64>,
    pub safety_notes: Option<String>,
    pub instructions: Option<String>,
    pub scheduled_start_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub billable_hours: Option<f64>,
    pub completion_notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl Action {
    pub fn new(job_id: &str, action_name: &str, sequence_order: i64, actor_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            maintenance_action_set_id: job_id.to_string(),
            template_action_item_id: None,
            action_name: action_name.to_string(),
            description: None,
            sequence_order,
            status: ActionStatus::NotStarted,
            estimated_duration: None,
            safety_notes: None,
            instructions: None,
            scheduled_start_time: None,
            start_time: None,
            end_time: None,
            billable_hours: None,
            completion_notes: None,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_by: actor_id.to_string(),
            updated_at: now,
        }
    }

    pub fn touch(&mut self, actor_id: &str) {
        self.updated_by = actor_id.to_string();
        self.updated_at = Utc::now();
    }
}

/// A quantity of one part needed by one action. Quantities are exact decimals,
/// so a split always adds back up to what the demand held.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartDemand {
    pub id: String,
    pub action_id: String,
    pub part_id: String,
    pub quantity_required: Decimal,
    pub sequence_order: i64,
    pub notes: Option<String>,
    pub status: PartDemandStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl PartDemand {
    pub fn new(
        action_id: &str,
        part_id: &str,
        quantity_required: Decimal,
        sequence_order: i64,
        actor_id: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            action_id: action_id.to_string(),
            part_id: part_id.to_string(),
            quantity_required,
            sequence_order,
            notes: None,
            status: PartDemandStatus::Planned,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_by: actor_id.to_string(),
            updated_at: now,
        }
    }

    pub fn touch(&mut self, actor_id: &str) {
        self.updated_by = actor_id.to_string();
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionTool {
    pub id: String,
    pub action_id: String,
    pub tool_id: String,
    pub quantity_required: i64,
    pub is_required: bool,
    pub sequence_order: i64,
}

/// A recorded pause in a job. `delay_end_date == None` means still active.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceDelay {
    pub id: String,
    pub maintenance_action_set_id: String,
    pub delay_type: String,
    pub delay_reason: String,
    pub delay_start_date: DateTime<Utc>,
    pub delay_end_date: Option<DateTime<Utc>>,
    pub delay_billable_hours: Option<f64>,
    pub delay_notes: Option<String>,
    pub priority: Priority,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl MaintenanceDelay {
    pub fn is_active(&self) -> bool {
        self.delay_end_date.is_none()
    }
}

// ─── Audit ──────────────────────────────────────────────────────────────────

/// The communication channel attached one-to-one to a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: String,
    pub event_type: String,
    pub description: String,
    pub asset_id: String,
    pub status: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: String,
    pub event_id: String,
    pub content: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

// ─── Query Filters ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub asset_id: Option<String>,
    pub status: Option<JobStatus>,
    pub template_action_set_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_round_trips_leniently() {
        assert_eq!(JobStatus::InProgress.to_string(), "In Progress");
        assert_eq!("in_progress".parse::<JobStatus>(), Ok(JobStatus::InProgress));
        assert_eq!("NOT-STARTED".parse::<ActionStatus>(), Ok(ActionStatus::NotStarted));
        assert!("Done".parse::<PartDemandStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Complete.is_terminal());
        assert!(!JobStatus::Delayed.is_terminal());
        assert!(ActionStatus::Skipped.is_terminal());
        assert!(!ActionStatus::InProgress.is_terminal());
        assert!(PartDemandStatus::Used.is_terminal());
    }

    #[test]
    fn test_priority_deserializes_from_yaml() {
        let p: Priority = serde_yaml::from_str("high").unwrap();
        assert_eq!(p, Priority::High);
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
