use std::fs;

use maintrack::config::loader::{load_definitions, load_settings, parse_definitions};
use maintrack::config::validator::validate;
use maintrack::state::models::Priority;
use tempfile::TempDir;

#[test]
fn test_parse_full_definition_file() {
    let yaml = r#"
parts:
  - id: oil-filter
    part_number: OF-220
    name: Oil Filter
    unit_cost: 12.5
    stock_level: 4
tools:
  - id: wrench
    name: Filter Wrench
templates:
  - task_name: Oil Change
    description: Replace oil and filter
    revision: "2"
    estimated_duration: 1.5
    staff_count: 2
    safety_review_required: true
    actions:
      - name: Replace filter
        sequence: 10
        instructions: Use the strap wrench
        required_skills: Mechanic
        minimum_staff_count: 1
        parts:
          - part: oil-filter
            quantity: 1
            notes: OEM only
        tools:
          - tool: wrench
            quantity: 1
      - name: Inspect
        sequence: 20
        required: false
"#;

    let defs = parse_definitions(yaml).expect("Should parse definitions");
    assert_eq!(defs.parts.len(), 1);
    assert_eq!(defs.parts[0].part_number.as_deref(), Some("OF-220"));
    assert_eq!(defs.tools[0].status, "Available");

    let template = &defs.templates[0];
    assert_eq!(template.revision, "2");
    assert!(template.safety_review_required);
    assert_eq!(template.actions.len(), 2);
    assert!(template.actions[0].required);
    assert!(!template.actions[1].required);
    assert_eq!(template.actions[0].parts[0].notes.as_deref(), Some("OEM only"));
    assert!(template.actions[0].tools[0].required);

    validate(&defs).expect("Should validate");
}

#[test]
fn test_template_defaults() {
    let defs = parse_definitions(
        "templates:\n  - task_name: Quick Look\n    actions:\n      - {name: Look, sequence: 1}\n",
    )
    .unwrap();
    let template = &defs.templates[0];
    assert_eq!(template.revision, "1");
    assert!(template.supersedes.is_none());
    assert!(template.actions[0].parts.is_empty());
}

#[test]
fn test_action_without_sequence_is_rejected() {
    let result = parse_definitions("templates:\n  - task_name: X\n    actions:\n      - {name: Y}\n");
    assert!(result.is_err());
}

#[test]
fn test_duplicate_revision_rejected() {
    let defs = parse_definitions(
        r#"
templates:
  - {task_name: Lube, revision: A}
  - {task_name: Lube, revision: A}
"#,
    )
    .unwrap();
    let err = validate(&defs).unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn test_negative_stock_rejected() {
    let defs = parse_definitions("parts:\n  - {id: p, name: P, stock_level: -1}\n").unwrap();
    assert!(validate(&defs).is_err());
}

#[test]
fn test_load_settings_from_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("maintrack.yaml"),
        "settings:\n  database: /tmp/jobs.db\n  resume_on_delay_resolved: false\n  default_priority: Critical\n",
    )
    .unwrap();

    let settings = load_settings(dir.path()).unwrap();
    assert_eq!(settings.database, "/tmp/jobs.db");
    assert!(!settings.resume_on_delay_resolved);
    assert_eq!(settings.default_priority, Priority::Critical);
}

#[test]
fn test_load_settings_from_file_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.yaml");
    fs::write(&path, "settings:\n  include_optional_items: true\n").unwrap();

    let settings = load_settings(&path).unwrap();
    assert!(settings.include_optional_items);
}

#[test]
fn test_invalid_settings_report_path() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("maintrack.yaml"), "settings: [not, a, map]\n").unwrap();

    let err = load_settings(dir.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("maintrack.yaml"));
}

#[test]
fn test_load_missing_definition_file() {
    let dir = TempDir::new().unwrap();
    let err = load_definitions(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.to_string().contains("absent.yaml"));
}
