use chrono::{Duration, Utc};
use maintrack::config::loader::parse_definitions;
use maintrack::config::types::Settings;
use maintrack::engine::delay::NewDelay;
use maintrack::engine::materializer::MaterializeOverrides;
use maintrack::engine::sequence::MoveDirection;
use maintrack::state::models::{ActionStatus, JobStatus, MaintenanceActionSet, Priority};
use maintrack::{EngineError, ErrorKind, MaintenanceEngine};

const ACTOR: &str = "u-tech";

const PUMP_SERVICE: &str = r#"
templates:
  - task_name: Pump Service
    actions:
      - {name: Isolate, sequence: 1}
      - {name: Replace seal, sequence: 2}
      - {name: Test run, sequence: 3}
"#;

fn engine_with(settings: Settings) -> MaintenanceEngine {
    let engine = MaintenanceEngine::open_memory(settings).unwrap();
    engine
        .load_definitions(&parse_definitions(PUMP_SERVICE).unwrap(), ACTOR)
        .unwrap();
    engine
}

fn new_job(engine: &MaintenanceEngine) -> MaintenanceActionSet {
    let template = engine.list_templates(true).unwrap().remove(0);
    engine
        .materialize(&template.id, "P-100", ACTOR, &MaterializeOverrides::default())
        .unwrap()
}

fn action_ids(engine: &MaintenanceEngine, job_id: &str) -> Vec<String> {
    engine
        .list_actions(job_id)
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect()
}

fn comment_count(engine: &MaintenanceEngine, job_id: &str) -> usize {
    engine.comments(job_id).unwrap().len()
}

#[test]
fn test_start_job_sets_status_and_mirrors_event() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);

    let started = engine.start_job(&job.id, ACTOR).unwrap();
    assert_eq!(started.status, JobStatus::InProgress);
    assert!(started.start_date.is_some());
    assert_eq!(started.updated_by, ACTOR);

    let comments = engine.comments(&job.id).unwrap();
    assert_eq!(
        comments.last().unwrap().content,
        "Status changed from 'Planned' to 'In Progress'"
    );
}

#[test]
fn test_start_job_twice_is_a_no_op() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    let first = engine.start_job(&job.id, ACTOR).unwrap();
    let before = comment_count(&engine, &job.id);

    let second = engine.start_job(&job.id, "someone-else").unwrap();
    assert_eq!(second.status, JobStatus::InProgress);
    assert_eq!(second.start_date, first.start_date);
    assert_eq!(comment_count(&engine, &job.id), before);
}

#[test]
fn test_completion_gate_and_skip() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    let ids = action_ids(&engine, &job.id);

    engine.start_action(&ids[0], ACTOR).unwrap();
    engine.complete_action(&ids[0], ACTOR, None, None).unwrap();
    engine
        .complete_action(&ids[1], ACTOR, Some("New seal fitted"), Some(1.25))
        .unwrap();

    let err = engine.complete_job(&job.id, ACTOR, None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::ActionsIncomplete { remaining: 1, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(engine.get_job(&job.id).unwrap().status, JobStatus::InProgress);

    let skipped = engine.skip_action(&ids[2], ACTOR, "Pump not accessible").unwrap();
    assert_eq!(skipped.status, ActionStatus::Skipped);
    assert_eq!(
        skipped.completion_notes.as_deref(),
        Some("Skipped: Pump not accessible")
    );

    let done = engine.complete_job(&job.id, ACTOR, Some("All good")).unwrap();
    assert_eq!(done.status, JobStatus::Complete);
    assert_eq!(done.completed_by_id.as_deref(), Some(ACTOR));
    assert!(done.end_date.is_some());

    let progress = engine.job_progress(&job.id).unwrap();
    assert_eq!(progress.total, 3);
    assert_eq!(progress.completed, 2);
    assert_eq!(progress.skipped, 1);
    assert!((progress.completion_percentage - 200.0 / 3.0).abs() < 1e-9);
    assert!((progress.billable_hours - 1.25).abs() < 1e-9);
}

#[test]
fn test_start_action_cascades_job_start() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    let ids = action_ids(&engine, &job.id);

    let action = engine.start_action(&ids[1], ACTOR).unwrap();
    assert_eq!(action.status, ActionStatus::InProgress);
    assert!(action.start_time.is_some());

    let job = engine.get_job(&job.id).unwrap();
    assert_eq!(job.status, JobStatus::InProgress);
    let comments: Vec<String> = engine
        .comments(&job.id)
        .unwrap()
        .into_iter()
        .map(|c| c.content)
        .collect();
    assert!(comments
        .iter()
        .any(|c| c.starts_with("Status changed from 'Planned' to 'In Progress'")));
    assert_eq!(comments.last().unwrap(), "Action 'Replace seal' started");
}

#[test]
fn test_complete_action_without_start_bills_zero_hours() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    let ids = action_ids(&engine, &job.id);

    let action = engine.complete_action(&ids[0], ACTOR, None, None).unwrap();
    assert_eq!(action.status, ActionStatus::Completed);
    assert_eq!(action.billable_hours, Some(0.0));
    assert!(action.end_time.is_some());
}

#[test]
fn test_illegal_action_transitions_leave_state_unchanged() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    let ids = action_ids(&engine, &job.id);

    engine.start_action(&ids[0], ACTOR).unwrap();
    let before = comment_count(&engine, &job.id);

    // In Progress cannot be skipped, and cannot be started again.
    let err = engine.skip_action(&ids[0], ACTOR, "changed my mind").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    let err = engine.start_action(&ids[0], ACTOR).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    engine.complete_action(&ids[0], ACTOR, None, None).unwrap();
    let after_complete = comment_count(&engine, &job.id);
    assert_eq!(after_complete, before + 1);

    let err = engine.cancel_action(&ids[0], ACTOR, "too late").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(
        engine.get_action(&ids[0]).unwrap().status,
        ActionStatus::Completed
    );
    assert_eq!(comment_count(&engine, &job.id), after_complete);
}

#[test]
fn test_terminal_job_rejects_everything() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    let ids = action_ids(&engine, &job.id);

    let cancelled = engine.cancel_job(&job.id, ACTOR, "Asset retired").unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    let before = comment_count(&engine, &job.id);

    for result in [
        engine.start_job(&job.id, ACTOR).map(|_| ()),
        engine.resume_job(&job.id, ACTOR).map(|_| ()),
        engine.complete_job(&job.id, ACTOR, None).map(|_| ()),
        engine.cancel_job(&job.id, ACTOR, "again").map(|_| ()),
        engine.start_action(&ids[0], ACTOR).map(|_| ()),
        engine.skip_action(&ids[0], ACTOR, "n/a").map(|_| ()),
        engine
            .add_delay(&job.id, ACTOR, &NewDelay::new("Parts", "late"))
            .map(|_| ()),
    ] {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidTransition);
    }
    assert_eq!(engine.get_job(&job.id).unwrap().status, JobStatus::Cancelled);
    assert_eq!(comment_count(&engine, &job.id), before);
}

#[test]
fn test_cancel_requires_reason() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    let err = engine.cancel_job(&job.id, ACTOR, "  ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_delay_then_resolve_resumes_by_default() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    engine.start_job(&job.id, ACTOR).unwrap();

    let params = NewDelay {
        billable_hours: Some(2.0),
        notes: Some("Supplier called".into()),
        priority: Priority::High,
        ..NewDelay::new("Parts", "Seal back-ordered")
    };
    let delay = engine.add_delay(&job.id, ACTOR, &params).unwrap();
    assert!(delay.delay_end_date.is_none());

    let delayed = engine.get_job(&job.id).unwrap();
    assert_eq!(delayed.status, JobStatus::Delayed);
    assert_eq!(delayed.delay_notes.as_deref(), Some("Supplier called"));
    let last = engine.comments(&job.id).unwrap().pop().unwrap().content;
    assert!(last.starts_with("Status changed from 'In Progress' to 'Delayed'\nDelay added: Parts"));
    assert!(last.contains("Reason: Seal back-ordered"));
    assert!(last.contains("Priority: High"));

    // A second delay while one is open is refused.
    let err = engine
        .add_delay(&job.id, ACTOR, &NewDelay::new("Weather", "Storm"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    // Cannot resume while the delay is open.
    let err = engine.resume_job(&job.id, ACTOR).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let resolved = engine.resolve_delay(&delay.id, ACTOR, None, Some(3.5)).unwrap();
    assert!(resolved.delay_end_date.is_some());
    assert_eq!(resolved.delay_billable_hours, Some(3.5));
    assert_eq!(engine.get_job(&job.id).unwrap().status, JobStatus::InProgress);

    let err = engine.resolve_delay(&delay.id, ACTOR, None, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let progress = engine.job_progress(&job.id).unwrap();
    assert!((progress.delay_hours - 3.5).abs() < 1e-9);
}

#[test]
fn test_resolve_without_auto_resume_keeps_job_delayed() {
    let settings = Settings {
        resume_on_delay_resolved: false,
        ..Settings::default()
    };
    let engine = engine_with(settings);
    let job = new_job(&engine);
    engine.start_job(&job.id, ACTOR).unwrap();

    let delay = engine
        .add_delay(&job.id, ACTOR, &NewDelay::new("Access", "Area locked"))
        .unwrap();
    let end = Utc::now() + Duration::minutes(1);
    let resolved = engine.resolve_delay(&delay.id, ACTOR, Some(end), None).unwrap();
    assert_eq!(resolved.delay_end_date, Some(end));
    assert_eq!(engine.get_job(&job.id).unwrap().status, JobStatus::Delayed);

    let last = engine.comments(&job.id).unwrap().pop().unwrap().content;
    assert!(last.starts_with("Delay resolved: Access"));

    // Actions cannot start or complete while the job is Delayed.
    let ids = action_ids(&engine, &job.id);
    let err = engine.start_action(&ids[0], ACTOR).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    let err = engine.complete_action(&ids[0], ACTOR, None, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(
        engine.get_action(&ids[0]).unwrap().status,
        ActionStatus::NotStarted
    );

    // Delayed cannot jump straight to Complete.
    for id in &ids {
        engine.skip_action(id, ACTOR, "deferred").unwrap();
    }
    let err = engine.complete_job(&job.id, ACTOR, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let resumed = engine.resume_job(&job.id, ACTOR).unwrap();
    assert_eq!(resumed.status, JobStatus::InProgress);
    assert_eq!(
        engine.complete_job(&job.id, ACTOR, None).unwrap().status,
        JobStatus::Complete
    );
}

#[test]
fn test_delay_on_planned_job() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);

    let delay = engine
        .add_delay(&job.id, ACTOR, &NewDelay::new("Staffing", "No fitter available"))
        .unwrap();
    assert_eq!(engine.get_job(&job.id).unwrap().status, JobStatus::Delayed);

    engine.resolve_delay(&delay.id, ACTOR, None, None).unwrap();
    assert_eq!(engine.get_job(&job.id).unwrap().status, JobStatus::InProgress);
}

#[test]
fn test_cancel_closes_active_delay() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    engine.start_job(&job.id, ACTOR).unwrap();
    engine
        .add_delay(&job.id, ACTOR, &NewDelay::new("Parts", "Seal back-ordered"))
        .unwrap();

    let cancelled = engine.cancel_job(&job.id, ACTOR, "Pump replaced").unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    let delays = engine.list_delays(&job.id).unwrap();
    assert_eq!(delays.len(), 1);
    assert_eq!(delays[0].delay_end_date, cancelled.end_date);

    let last = engine.comments(&job.id).unwrap().pop().unwrap().content;
    assert!(last.contains("Reason: Pump replaced"));
    assert!(last.contains("Closed 1 active delay(s)"));
}

#[test]
fn test_complete_planned_job_with_all_actions_skipped() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    for id in action_ids(&engine, &job.id) {
        engine.skip_action(&id, ACTOR, "Not needed").unwrap();
    }

    let done = engine.complete_job(&job.id, ACTOR, None).unwrap();
    assert_eq!(done.status, JobStatus::Complete);
    assert!(done.start_date.is_some());
    let contents: Vec<String> = engine
        .comments(&job.id)
        .unwrap()
        .into_iter()
        .map(|c| c.content)
        .collect();
    assert!(contents.contains(&"Status changed from 'Planned' to 'In Progress'".to_string()));
    assert!(contents.contains(&"Status changed from 'In Progress' to 'Complete'".to_string()));
}

#[test]
fn test_every_mutation_is_audited() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    let ids = action_ids(&engine, &job.id);
    let mut count = comment_count(&engine, &job.id);

    let mut check = |label: &str| {
        let now = comment_count(&engine, &job.id);
        assert!(now > count, "{} did not add a comment", label);
        count = now;
    };

    engine.start_action(&ids[0], ACTOR).unwrap();
    check("start_action");
    engine.complete_action(&ids[0], ACTOR, None, None).unwrap();
    check("complete_action");
    let added = engine.add_action(&job.id, "Paint", None, ACTOR).unwrap();
    check("add_action");
    engine.move_action(&added.id, MoveDirection::Up, ACTOR).unwrap();
    check("move_action");
    engine.delete_action(&added.id, ACTOR).unwrap();
    check("delete_action");
    engine.cancel_action(&ids[1], ACTOR, "Seal fine").unwrap();
    check("cancel_action");
    let delay = engine
        .add_delay(&job.id, ACTOR, &NewDelay::new("Parts", "late"))
        .unwrap();
    check("add_delay");
    engine.resolve_delay(&delay.id, ACTOR, None, None).unwrap();
    check("resolve_delay");
    engine.skip_action(&ids[2], ACTOR, "Skip test").unwrap();
    check("skip_action");
    engine.complete_job(&job.id, ACTOR, None).unwrap();
    check("complete_job");
}

#[test]
fn test_move_action_swaps_exactly_two() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);
    let ids = action_ids(&engine, &job.id);

    let changed = engine.move_action(&ids[2], MoveDirection::Up, ACTOR).unwrap();
    assert_eq!(changed.len(), 2);

    let actions = engine.list_actions(&job.id).unwrap();
    let names: Vec<&str> = actions.iter().map(|a| a.action_name.as_str()).collect();
    assert_eq!(names, vec!["Isolate", "Test run", "Replace seal"]);
    let orders: Vec<i64> = actions.iter().map(|a| a.sequence_order).collect();
    assert_eq!(orders, vec![1, 2, 3]);

    let err = engine.move_action(&ids[0], MoveDirection::Up, ACTOR).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = engine.move_action(&ids[1], MoveDirection::Down, ACTOR).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_add_action_appends_after_max() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);

    let action = engine
        .add_action(&job.id, "Paint guard", Some("Touch up"), ACTOR)
        .unwrap();
    assert_eq!(action.sequence_order, 4);
    assert_eq!(action.status, ActionStatus::NotStarted);
}

#[test]
fn test_delete_job_requires_no_children() {
    let engine = engine_with(Settings::default());
    let job = new_job(&engine);

    let err = engine.delete_job(&job.id, ACTOR).unwrap_err();
    assert!(matches!(err, EngineError::HasDependents { count: 3, .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);

    for id in action_ids(&engine, &job.id) {
        engine.delete_action(&id, ACTOR).unwrap();
    }
    engine.delete_job(&job.id, ACTOR).unwrap();
    let err = engine.get_job(&job.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferenceNotFound);
}
