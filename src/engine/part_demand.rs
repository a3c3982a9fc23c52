//! Part demand adjustments: splitting, reducing and status changes.
//!
//! Demand status machine: Planned → {Received, Cancelled},
//! Received → {Used, Cancelled}. Used and Cancelled are final. A split is
//! not bound by the machine: the split-off quantity may take any status
//! other than the original's.
//!
//! Quantities are [`Decimal`], so splitting and reducing are exact.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use super::audit;
use super::lifecycle::{ensure_job_open, load_action, load_job};
use crate::error::{EngineError, Result};
use crate::state::backend::{PartCatalog, Store};
use crate::state::models::{MaintenanceActionSet, PartDemand, PartDemandStatus};

impl PartDemandStatus {
    pub fn can_transition_to(self, next: PartDemandStatus) -> bool {
        use PartDemandStatus::*;
        matches!(
            (self, next),
            (Planned, Received) | (Planned, Cancelled) | (Received, Used) | (Received, Cancelled)
        )
    }
}

fn load_demand(store: &dyn Store, demand_id: &str) -> Result<PartDemand> {
    store
        .get_part_demand(demand_id)?
        .ok_or_else(|| EngineError::not_found("part demand", demand_id))
}

/// The job a demand belongs to, via its action.
fn owning_job(store: &dyn Store, demand: &PartDemand) -> Result<MaintenanceActionSet> {
    let action = load_action(store, &demand.action_id)?;
    load_job(store, &action.maintenance_action_set_id)
}

fn status_error(demand: &PartDemand, operation: &'static str) -> EngineError {
    EngineError::InvalidTransition {
        entity: "part demand",
        id: demand.id.clone(),
        status: demand.status.to_string(),
        operation,
    }
}

fn check_quantity(quantity: Decimal) -> Result<()> {
    if quantity <= Decimal::ZERO {
        return Err(EngineError::validation(format!(
            "quantity must be a positive number, got {}",
            quantity
        )));
    }
    Ok(())
}

fn next_demand_sequence(store: &dyn Store, action_id: &str) -> Result<i64> {
    Ok(store
        .list_part_demands(action_id)?
        .iter()
        .map(|d| d.sequence_order)
        .max()
        .unwrap_or(0)
        + 1)
}

/// Split `new_quantity` off a demand into a new demand with `new_status`.
///
/// Returns `(original, new)`. The original keeps the remainder, so the two
/// quantities always add back up to what the original held.
pub fn split(
    store: &dyn Store,
    demand_id: &str,
    new_quantity: Decimal,
    new_status: PartDemandStatus,
    actor_id: &str,
) -> Result<(PartDemand, PartDemand)> {
    let mut original = load_demand(store, demand_id)?;
    let job = owning_job(store, &original)?;
    ensure_job_open(&job, "split part demands of")?;
    check_quantity(new_quantity)?;
    if new_quantity >= original.quantity_required {
        return Err(EngineError::validation(format!(
            "split quantity {} must be less than the demand's quantity {}",
            new_quantity, original.quantity_required
        )));
    }
    if new_status == original.status {
        return Err(EngineError::validation(format!(
            "split status must differ from the current status '{}'",
            original.status
        )));
    }

    let mut split_off = PartDemand::new(
        &original.action_id,
        &original.part_id,
        new_quantity,
        next_demand_sequence(store, &original.action_id)?,
        actor_id,
    );
    split_off.status = new_status;
    split_off.notes = Some(format!("Split from PartDemand {}", original.id));
    store.insert_part_demand(&split_off)?;

    original.quantity_required -= new_quantity;
    original.touch(actor_id);
    store.update_part_demand(&original)?;

    audit::append_comment(
        store,
        &job.event_id,
        actor_id,
        &format!(
            "PartDemand {} split: {} of part {} moved to new PartDemand {} as '{}', {} remaining",
            original.id,
            new_quantity,
            original.part_id,
            split_off.id,
            new_status,
            original.quantity_required
        ),
    )?;
    audit::append_comment(
        store,
        &job.event_id,
        actor_id,
        &format!(
            "PartDemand {} created with {} of part {} (split from PartDemand {})",
            split_off.id, split_off.quantity_required, split_off.part_id, original.id
        ),
    )?;

    info!(
        demand_id,
        new_demand_id = %split_off.id,
        quantity = %new_quantity,
        actor = actor_id,
        "Split part demand"
    );
    Ok((original, split_off))
}

/// Reduce a demand by `delta`. A demand reduced to zero or below is deleted,
/// in which case `None` is returned.
pub fn reduce_quantity(
    store: &dyn Store,
    demand_id: &str,
    delta: Decimal,
    actor_id: &str,
) -> Result<Option<PartDemand>> {
    check_quantity(delta)?;
    let mut demand = load_demand(store, demand_id)?;
    let job = owning_job(store, &demand)?;
    ensure_job_open(&job, "reduce part demands of")?;
    if demand.status.is_terminal() {
        return Err(status_error(&demand, "reduce"));
    }

    let remaining = demand.quantity_required - delta;
    if remaining <= Decimal::ZERO {
        store.delete_part_demand(&demand.id)?;
        audit::append_comment(
            store,
            &job.event_id,
            actor_id,
            &format!(
                "PartDemand {} for part {} removed (quantity reduced by {})",
                demand.id, demand.part_id, delta
            ),
        )?;
        info!(demand_id, actor = actor_id, "Removed part demand");
        return Ok(None);
    }

    let before = demand.quantity_required;
    demand.quantity_required = remaining;
    demand.touch(actor_id);
    store.update_part_demand(&demand)?;
    audit::append_comment(
        store,
        &job.event_id,
        actor_id,
        &format!(
            "PartDemand {} for part {} reduced from {} to {}",
            demand.id, demand.part_id, before, remaining
        ),
    )?;
    info!(demand_id, remaining = %remaining, actor = actor_id, "Reduced part demand");
    Ok(Some(demand))
}

pub fn change_status(
    store: &dyn Store,
    demand_id: &str,
    status: PartDemandStatus,
    actor_id: &str,
) -> Result<PartDemand> {
    let mut demand = load_demand(store, demand_id)?;
    let job = owning_job(store, &demand)?;
    ensure_job_open(&job, "change part demands of")?;
    if !demand.status.can_transition_to(status) {
        return Err(status_error(&demand, "change status of"));
    }

    let from = demand.status;
    demand.status = status;
    demand.touch(actor_id);
    store.update_part_demand(&demand)?;
    audit::append_comment(
        store,
        &job.event_id,
        actor_id,
        &format!(
            "PartDemand {} for part {}: {}",
            demand.id,
            demand.part_id,
            audit::status_change(from.as_str(), status.as_str())
        ),
    )?;
    info!(demand_id, from = %from, to = %status, actor = actor_id, "Changed part demand status");
    Ok(demand)
}

/// Append a demand to an action. The part must exist in the catalog.
pub fn add_part_demand(
    store: &dyn Store,
    catalog: &dyn PartCatalog,
    action_id: &str,
    part_id: &str,
    quantity: Decimal,
    notes: Option<&str>,
    actor_id: &str,
) -> Result<PartDemand> {
    check_quantity(quantity)?;
    let action = load_action(store, action_id)?;
    let job = load_job(store, &action.maintenance_action_set_id)?;
    ensure_job_open(&job, "add part demands to")?;
    if catalog.get_part(part_id)?.is_none() {
        return Err(EngineError::not_found("part", part_id));
    }

    let mut demand = PartDemand::new(
        action_id,
        part_id,
        quantity,
        next_demand_sequence(store, action_id)?,
        actor_id,
    );
    demand.notes = notes.map(str::to_string);
    store.insert_part_demand(&demand)?;
    audit::append_comment(
        store,
        &job.event_id,
        actor_id,
        &format!(
            "PartDemand {} added to action '{}': {} of part {}",
            demand.id, action.action_name, quantity, part_id
        ),
    )?;
    info!(action_id, demand_id = %demand.id, part_id, actor = actor_id, "Added part demand");
    Ok(demand)
}

/// Demands are leaves, so removal only checks that the job is still open.
pub fn delete_part_demand(store: &dyn Store, demand_id: &str, actor_id: &str) -> Result<()> {
    let demand = load_demand(store, demand_id)?;
    let job = owning_job(store, &demand)?;
    ensure_job_open(&job, "delete part demands of")?;

    store.delete_part_demand(&demand.id)?;
    audit::append_comment(
        store,
        &job.event_id,
        actor_id,
        &format!(
            "PartDemand {} for part {} deleted",
            demand.id, demand.part_id
        ),
    )?;
    info!(demand_id, actor = actor_id, "Deleted part demand");
    Ok(())
}

// ─── Availability ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartAvailability {
    pub part_id: String,
    pub can_fulfill_from_any: bool,
    pub needs_purchase: bool,
    pub stock_level: Decimal,
    pub shortfall: Decimal,
    pub estimated_cost: Decimal,
}

pub fn check_availability(
    catalog: &dyn PartCatalog,
    demand: &PartDemand,
) -> Result<PartAvailability> {
    let part = catalog
        .get_part(&demand.part_id)?
        .ok_or_else(|| EngineError::not_found("part", &demand.part_id))?;
    let shortfall = (demand.quantity_required - part.stock_level).max(Decimal::ZERO);
    Ok(PartAvailability {
        part_id: part.id,
        can_fulfill_from_any: shortfall.is_zero(),
        needs_purchase: !shortfall.is_zero(),
        stock_level: part.stock_level,
        shortfall,
        estimated_cost: demand.quantity_required * part.unit_cost,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartsSummary {
    pub total_parts_needed: usize,
    pub parts_available: usize,
    pub parts_need_purchase: usize,
    pub estimated_cost: Decimal,
}

/// Roll up every non-cancelled demand of a job.
pub fn parts_summary(
    store: &dyn Store,
    catalog: &dyn PartCatalog,
    job_id: &str,
) -> Result<PartsSummary> {
    load_job(store, job_id)?;
    let mut summary = PartsSummary::default();
    for action in store.list_actions(job_id)? {
        for demand in store.list_part_demands(&action.id)? {
            if demand.status == PartDemandStatus::Cancelled {
                continue;
            }
            summary.total_parts_needed += 1;
            let availability = check_availability(catalog, &demand)?;
            summary.estimated_cost += availability.estimated_cost;
            let in_hand = matches!(
                demand.status,
                PartDemandStatus::Received | PartDemandStatus::Used
            );
            if in_hand || availability.can_fulfill_from_any {
                summary.parts_available += 1;
            } else {
                summary.parts_need_purchase += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_demand_transition_table() {
        use PartDemandStatus::*;
        assert!(Planned.can_transition_to(Received));
        assert!(Planned.can_transition_to(Cancelled));
        assert!(Received.can_transition_to(Used));
        assert!(!Planned.can_transition_to(Used));
        assert!(!Used.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Planned));
    }

    #[test]
    fn test_quantity_check() {
        assert!(check_quantity(dec!(0.5)).is_ok());
        assert!(check_quantity(Decimal::ZERO).is_err());
        assert!(check_quantity(dec!(-2)).is_err());
    }
}
