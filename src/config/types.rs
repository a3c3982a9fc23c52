use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::state::models::Priority;

// ─── Engine Settings ────────────────────────────────────────────────────────

/// Root of `maintrack.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub settings: Settings,
}

/// Settings controlling engine behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database")]
    pub database: String,
    /// Materialize optional template items and optional part demands.
    #[serde(default)]
    pub include_optional_items: bool,
    /// Move a Delayed job back to In Progress once its last delay is resolved.
    #[serde(default = "default_true")]
    pub resume_on_delay_resolved: bool,
    #[serde(default)]
    pub default_priority: Priority,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: default_database(),
            include_optional_items: false,
            resume_on_delay_resolved: true,
            default_priority: Priority::default(),
        }
    }
}

fn default_database() -> String {
    ".maintrack/maintrack.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_one() -> i64 {
    1
}

fn default_revision() -> String {
    "1".to_string()
}

fn default_tool_status() -> String {
    "Available".to_string()
}

// ─── Definition Files ───────────────────────────────────────────────────────

/// A YAML file carrying catalog entries and/or template definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionFile {
    #[serde(default)]
    pub parts: Vec<PartDefinition>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub templates: Vec<TemplateDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartDefinition {
    pub id: String,
    #[serde(default)]
    pub part_number: Option<String>,
    pub name: String,
    #[serde(default)]
    pub unit_cost: Decimal,
    #[serde(default)]
    pub stock_level: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub id: String,
    pub name: String,
    #[serde(default = "default_tool_status")]
    pub status: String,
}

/// A maintenance procedure as authored in YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub task_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_revision")]
    pub revision: String,
    /// Revision label (or id) of the template this one replaces.
    #[serde(default)]
    pub supersedes: Option<String>,
    #[serde(default)]
    pub estimated_duration: Option<f64>,
    #[serde(default)]
    pub staff_count: Option<i64>,
    #[serde(default)]
    pub safety_review_required: bool,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub sequence: i64,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub estimated_duration: Option<f64>,
    #[serde(default)]
    pub minimum_staff_count: Option<i64>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub required_skills: Option<String>,
    #[serde(default)]
    pub safety_notes: Option<String>,
    #[serde(default)]
    pub parts: Vec<PartRequirement>,
    #[serde(default)]
    pub tools: Vec<ToolRequirement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartRequirement {
    pub part: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequirement {
    pub tool: String,
    #[serde(default = "default_one")]
    pub quantity: i64,
    #[serde(default = "default_true")]
    pub required: bool,
}
