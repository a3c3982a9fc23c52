use maintrack::config::loader::parse_definitions;
use maintrack::config::types::Settings;
use maintrack::engine::materializer::MaterializeOverrides;
use maintrack::state::models::{PartDemand, PartDemandStatus};
use maintrack::{ErrorKind, MaintenanceEngine};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const ACTOR: &str = "u-stores";

const GEARBOX: &str = r#"
parts:
  - {id: bearing, name: Bearing, unit_cost: 40.0, stock_level: 3}
  - {id: gear-oil, name: Gear Oil, unit_cost: 8.0, stock_level: 10}
  - {id: shim, name: Shim Kit, unit_cost: 15.0, stock_level: 0}
templates:
  - task_name: Gearbox Overhaul
    actions:
      - name: Replace bearings
        sequence: 1
        parts:
          - {part: bearing, quantity: 10}
      - name: Refill
        sequence: 2
        parts:
          - {part: gear-oil, quantity: 4.5}
"#;

struct Fixture {
    engine: MaintenanceEngine,
    job_id: String,
    bearing_action: String,
    bearing_demand: PartDemand,
}

fn fixture() -> Fixture {
    let engine = MaintenanceEngine::open_memory(Settings::default()).unwrap();
    engine
        .load_definitions(&parse_definitions(GEARBOX).unwrap(), ACTOR)
        .unwrap();
    let template = engine.list_templates(true).unwrap().remove(0);
    let job = engine
        .materialize(&template.id, "GB-7", ACTOR, &MaterializeOverrides::default())
        .unwrap();
    let actions = engine.list_actions(&job.id).unwrap();
    let bearing_action = actions[0].id.clone();
    let bearing_demand = engine.list_part_demands(&bearing_action).unwrap().remove(0);
    Fixture {
        engine,
        job_id: job.id,
        bearing_action,
        bearing_demand,
    }
}

#[test]
fn test_split_conserves_quantity_and_cross_references() {
    let f = fixture();
    assert_eq!(f.bearing_demand.quantity_required, dec!(10));

    let (original, split) = f
        .engine
        .split_part_demand(&f.bearing_demand.id, dec!(4), PartDemandStatus::Received, ACTOR)
        .unwrap();
    assert_eq!(original.id, f.bearing_demand.id);
    assert_eq!(original.quantity_required, dec!(6));
    assert_eq!(original.status, PartDemandStatus::Planned);
    assert_eq!(split.quantity_required, dec!(4));
    assert_eq!(split.status, PartDemandStatus::Received);
    assert_eq!(split.part_id, "bearing");
    assert_eq!(split.action_id, f.bearing_action);
    assert_eq!(split.sequence_order, 2);
    assert_eq!(
        split.notes.as_deref(),
        Some(format!("Split from PartDemand {}", original.id).as_str())
    );

    let stored = f.engine.list_part_demands(&f.bearing_action).unwrap();
    let total: Decimal = stored.iter().map(|d| d.quantity_required).sum();
    assert_eq!(total, dec!(10));

    let comments = f.engine.comments(&f.job_id).unwrap();
    let tail: Vec<&str> = comments[comments.len() - 2..]
        .iter()
        .map(|c| c.content.as_str())
        .collect();
    assert!(tail[0].contains(&original.id) && tail[0].contains(&split.id));
    assert!(tail[1].contains(&split.id) && tail[1].contains(&original.id));
}

#[test]
fn test_split_with_full_quantity_is_rejected_untouched() {
    let f = fixture();
    let comments_before = f.engine.comments(&f.job_id).unwrap().len();

    let err = f
        .engine
        .split_part_demand(&f.bearing_demand.id, dec!(10), PartDemandStatus::Received, ACTOR)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let stored = f.engine.list_part_demands(&f.bearing_action).unwrap();
    assert_eq!(stored, vec![f.bearing_demand.clone()]);
    assert_eq!(f.engine.comments(&f.job_id).unwrap().len(), comments_before);
}

#[test]
fn test_split_rejects_same_status_and_bad_quantity() {
    let f = fixture();
    let err = f
        .engine
        .split_part_demand(&f.bearing_demand.id, dec!(2), PartDemandStatus::Planned, ACTOR)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = f
        .engine
        .split_part_demand(&f.bearing_demand.id, dec!(-1), PartDemandStatus::Received, ACTOR)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_split_to_any_other_status_is_allowed() {
    let f = fixture();
    // Planned → Used is not a single status step, but a split may take it.
    let (original, used) = f
        .engine
        .split_part_demand(&f.bearing_demand.id, dec!(0.5), PartDemandStatus::Used, ACTOR)
        .unwrap();
    assert_eq!(used.status, PartDemandStatus::Used);
    assert_eq!(original.status, PartDemandStatus::Planned);
    assert_eq!(original.quantity_required, dec!(9.5));
}

#[test]
fn test_decimal_split_conserves_quantity_exactly() {
    let f = fixture();
    let demand = f
        .engine
        .add_part_demand(&f.bearing_action, "gear-oil", dec!(0.9), None, ACTOR)
        .unwrap();

    let (original, split) = f
        .engine
        .split_part_demand(&demand.id, dec!(0.2), PartDemandStatus::Received, ACTOR)
        .unwrap();
    assert_eq!(original.quantity_required, dec!(0.7));
    assert_eq!(split.quantity_required, dec!(0.2));
    assert_eq!(
        original.quantity_required + split.quantity_required,
        demand.quantity_required
    );

    // The stored rows agree, not just the returned values.
    let stored = f.engine.get_part_demand(&original.id).unwrap().unwrap();
    assert_eq!(stored.quantity_required, dec!(0.7));

    let (rest, cancelled) = f
        .engine
        .split_part_demand(&original.id, dec!(0.1), PartDemandStatus::Cancelled, ACTOR)
        .unwrap();
    assert_eq!(
        rest.quantity_required + cancelled.quantity_required + split.quantity_required,
        dec!(0.9)
    );
}

#[test]
fn test_reduce_quantity_and_delete_at_zero() {
    let f = fixture();
    let reduced = f
        .engine
        .reduce_part_demand(&f.bearing_demand.id, dec!(3), ACTOR)
        .unwrap()
        .unwrap();
    assert_eq!(reduced.quantity_required, dec!(7));

    let removed = f
        .engine
        .reduce_part_demand(&f.bearing_demand.id, dec!(7), ACTOR)
        .unwrap();
    assert!(removed.is_none());
    assert!(f
        .engine
        .get_part_demand(&f.bearing_demand.id)
        .unwrap()
        .is_none());
    let last = f.engine.comments(&f.job_id).unwrap().pop().unwrap().content;
    assert!(last.contains("removed"));
}

#[test]
fn test_status_machine() {
    let f = fixture();
    let id = &f.bearing_demand.id;

    let err = f
        .engine
        .set_part_demand_status(id, PartDemandStatus::Used, ACTOR)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    f.engine
        .set_part_demand_status(id, PartDemandStatus::Received, ACTOR)
        .unwrap();
    let used = f
        .engine
        .set_part_demand_status(id, PartDemandStatus::Used, ACTOR)
        .unwrap();
    assert_eq!(used.status, PartDemandStatus::Used);

    let err = f
        .engine
        .set_part_demand_status(id, PartDemandStatus::Cancelled, ACTOR)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    let err = f.engine.reduce_part_demand(id, dec!(1), ACTOR).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[test]
fn test_add_part_demand_checks_catalog() {
    let f = fixture();
    let added = f
        .engine
        .add_part_demand(&f.bearing_action, "shim", dec!(2), Some("Measure first"), ACTOR)
        .unwrap();
    assert_eq!(added.sequence_order, 2);
    assert_eq!(added.status, PartDemandStatus::Planned);

    let err = f
        .engine
        .add_part_demand(&f.bearing_action, "unobtainium", dec!(1), None, ACTOR)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferenceNotFound);
}

#[test]
fn test_availability_and_summary() {
    let f = fixture();

    let availability = f.engine.check_availability(&f.bearing_demand.id).unwrap();
    assert!(availability.needs_purchase);
    assert!(!availability.can_fulfill_from_any);
    assert_eq!(availability.stock_level, dec!(3));
    assert_eq!(availability.shortfall, dec!(7));
    assert_eq!(availability.estimated_cost, dec!(400));

    let summary = f.engine.parts_summary(&f.job_id).unwrap();
    assert_eq!(summary.total_parts_needed, 2);
    assert_eq!(summary.parts_available, 1);
    assert_eq!(summary.parts_need_purchase, 1);
    assert_eq!(summary.estimated_cost, dec!(436));

    // Received stock counts as available; cancelled demands drop out.
    f.engine
        .split_part_demand(&f.bearing_demand.id, dec!(2), PartDemandStatus::Cancelled, ACTOR)
        .unwrap();
    f.engine
        .set_part_demand_status(&f.bearing_demand.id, PartDemandStatus::Received, ACTOR)
        .unwrap();
    let summary = f.engine.parts_summary(&f.job_id).unwrap();
    assert_eq!(summary.total_parts_needed, 2);
    assert_eq!(summary.parts_available, 2);
    assert_eq!(summary.parts_need_purchase, 0);
    assert_eq!(summary.estimated_cost, dec!(356));
}

#[test]
fn test_action_with_demands_cannot_be_deleted() {
    let f = fixture();
    let err = f
        .engine
        .delete_action(&f.bearing_action, ACTOR)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    f.engine
        .delete_part_demand(&f.bearing_demand.id, ACTOR)
        .unwrap();
    f.engine.delete_action(&f.bearing_action, ACTOR).unwrap();
}

#[test]
fn test_demands_of_closed_job_are_frozen() {
    let f = fixture();
    f.engine
        .cancel_job(&f.job_id, ACTOR, "Gearbox replaced instead")
        .unwrap();
    let comments_before = f.engine.comments(&f.job_id).unwrap().len();
    let id = &f.bearing_demand.id;

    let err = f
        .engine
        .split_part_demand(id, dec!(2), PartDemandStatus::Received, ACTOR)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    let err = f.engine.reduce_part_demand(id, dec!(1), ACTOR).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    let err = f
        .engine
        .set_part_demand_status(id, PartDemandStatus::Received, ACTOR)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    let err = f
        .engine
        .add_part_demand(&f.bearing_action, "shim", dec!(1), None, ACTOR)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    assert_eq!(
        f.engine.list_part_demands(&f.bearing_action).unwrap(),
        vec![f.bearing_demand.clone()]
    );
    assert_eq!(f.engine.comments(&f.job_id).unwrap().len(), comments_before);
}
