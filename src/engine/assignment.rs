use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::ledger;
use crate::error::AppError;
use crate::models::assignment::DriverAssignment;
use crate::models::event::{OrderEvent, OrderEventKind};
use crate::models::ledger::OpenOrder;
use crate::models::order::{Order, OrderStatus};
use crate::notify;
use crate::state::AppState;

/// Direct path: dispatch assigns a driver to an order. The ledger entry
/// (if any) is retired along the way; its absence is tolerated.
pub fn assign_driver_to_order(
    state: &AppState,
    driver_id: Uuid,
    order_id: Uuid,
) -> Result<DriverAssignment, AppError> {
    let start = Instant::now();
    let result = do_assign(state, driver_id, order_id);
    observe(state, start, &result);
    result
}

fn do_assign(
    state: &AppState,
    driver_id: Uuid,
    order_id: Uuid,
) -> Result<DriverAssignment, AppError> {
    check_driver_capacity(state, driver_id)?;

    let order = bind_order(state, order_id, driver_id)?;

    let assignment = match record_assignment(state, &order, driver_id) {
        Ok(assignment) => assignment,
        Err(err) => {
            warn!(%order_id, %driver_id, error = %err, "assignment not recorded, compensating");
            if !unbind_order(state, order_id) {
                error!(%order_id, "compensating order reset failed, order left inconsistent");
                return Err(AppError::PartialFailure(format!(
                    "order {order_id} bound to driver {driver_id} but assignment not recorded"
                )));
            }
            return Err(err);
        }
    };

    ledger::remove_entry(state, order_id);

    finish_assignment(state, &order, &assignment);
    Ok(assignment)
}

/// Self-serve path: a driver claims an open offer. The atomic removal of
/// the ledger entry is the claim itself, so two concurrent claimers
/// cannot both win; the loser sees `OrderNotAvailable`.
pub fn accept_order_by_driver(
    state: &AppState,
    order_id: Uuid,
    driver_id: Uuid,
) -> Result<DriverAssignment, AppError> {
    let start = Instant::now();
    let result = do_accept(state, order_id, driver_id);
    observe(state, start, &result);
    result
}

fn do_accept(
    state: &AppState,
    order_id: Uuid,
    driver_id: Uuid,
) -> Result<DriverAssignment, AppError> {
    let entry = ledger::remove_entry(state, order_id).ok_or_else(|| {
        state.metrics.claim_conflicts_total.inc();
        AppError::OrderNotAvailable(order_id)
    })?;

    if entry.expires_at <= Utc::now() {
        // stale offer; keep it retired and sync the flag
        if let Some(mut order) = state.orders.get_mut(&order_id) {
            order.available_for_drivers = false;
        }
        state.metrics.claim_conflicts_total.inc();
        return Err(AppError::Conflict(format!(
            "offer for order {} expired at {}",
            entry.order_number, entry.expires_at
        )));
    }

    if let Err(err) = check_driver_capacity(state, driver_id) {
        reoffer_entry(state, entry);
        return Err(err);
    }

    let order = match bind_order(state, order_id, driver_id) {
        Ok(order) => order,
        Err(err) => {
            reoffer_entry(state, entry);
            return Err(err);
        }
    };

    let assignment = match record_assignment(state, &order, driver_id) {
        Ok(assignment) => assignment,
        Err(err) => {
            warn!(%order_id, %driver_id, error = %err, "claim not recorded, compensating");
            let rolled_back = unbind_order(state, order_id);
            reoffer_entry(state, entry);
            if !rolled_back {
                error!(%order_id, "compensating order reset failed, order left inconsistent");
                return Err(AppError::PartialFailure(format!(
                    "order {order_id} claimed by driver {driver_id} but assignment not recorded"
                )));
            }
            return Err(err);
        }
    };

    finish_assignment(state, &order, &assignment);
    Ok(assignment)
}

/// Open assignments held by a driver, counted against capacity.
pub fn open_assignment_count(state: &AppState, driver_id: Uuid) -> usize {
    state
        .assignments
        .iter()
        .filter(|assignment| assignment.driver_id == driver_id)
        .filter(|assignment| {
            state
                .orders
                .get(&assignment.order_id)
                .map(|order| order.status.counts_against_driver())
                .unwrap_or(false)
        })
        .count()
}

fn check_driver_capacity(state: &AppState, driver_id: Uuid) -> Result<(), AppError> {
    let is_active = state
        .drivers
        .get(&driver_id)
        .map(|driver| driver.is_active)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    if !is_active {
        return Err(AppError::Validation(format!("driver {driver_id} is inactive")));
    }

    let open = open_assignment_count(state, driver_id);
    if open >= state.config.driver_max_active_orders {
        return Err(AppError::Conflict(format!(
            "driver {driver_id} already holds {open} open orders"
        )));
    }

    Ok(())
}

fn bind_order(state: &AppState, order_id: Uuid, driver_id: Uuid) -> Result<Order, AppError> {
    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    if let Some(current) = order.driver_id {
        return Err(AppError::Conflict(format!(
            "order {} is already assigned to driver {current}",
            order.order_number
        )));
    }
    if order.status != OrderStatus::Ready {
        return Err(AppError::Conflict(format!(
            "order {} is not ready for delivery (status {:?})",
            order.order_number, order.status
        )));
    }

    order.driver_id = Some(driver_id);
    order.status = OrderStatus::OutForDelivery;
    order.available_for_drivers = false;
    order.assigned_at = Some(Utc::now());

    Ok(order.clone())
}

/// Restores a claimed offer after a failed follow-up, but only while the
/// order is still claimable. An order bound by a concurrent direct
/// assignment in the meantime must not be re-offered.
fn reoffer_entry(state: &AppState, entry: OpenOrder) {
    match state.orders.get_mut(&entry.order_id) {
        Some(mut order) if order.status == OrderStatus::Ready && order.driver_id.is_none() => {
            order.available_for_drivers = true;
            drop(order);
            ledger::reinstate_entry(state, entry);
        }
        _ => {
            warn!(order_id = %entry.order_id, "claimed offer dropped, order no longer claimable");
        }
    }
}

/// Compensating reset after a failed bind follow-up. Returns false when
/// the order row itself is gone, which leaves the system inconsistent.
fn unbind_order(state: &AppState, order_id: Uuid) -> bool {
    match state.orders.get_mut(&order_id) {
        Some(mut order) => {
            order.driver_id = None;
            order.status = OrderStatus::Ready;
            order.assigned_at = None;
            true
        }
        None => false,
    }
}

fn record_assignment(
    state: &AppState,
    order: &Order,
    driver_id: Uuid,
) -> Result<DriverAssignment, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    let assignment = DriverAssignment {
        id: Uuid::new_v4(),
        order_id: order.id,
        driver_id,
        driver_name: driver.name.clone(),
        driver_phone: driver.phone.clone(),
        assigned_at: order.assigned_at.unwrap_or_else(Utc::now),
    };
    state.assignments.insert(order.id, assignment.clone());

    let open = open_assignment_count(state, driver_id);
    driver.is_available = driver.is_active && open < state.config.driver_max_active_orders;
    driver.updated_at = Utc::now();

    Ok(assignment)
}

fn finish_assignment(state: &AppState, order: &Order, assignment: &DriverAssignment) {
    info!(
        order_number = %order.order_number,
        driver_id = %assignment.driver_id,
        "order out for delivery"
    );

    notify::notify_order_event(order, OrderEventKind::Assigned);
    state.publish(OrderEvent {
        kind: OrderEventKind::Assigned,
        order_id: order.id,
        order_number: order.order_number.clone(),
        status: OrderStatus::OutForDelivery,
        driver_id: Some(assignment.driver_id),
        at: Utc::now(),
    });
}

fn observe(state: &AppState, start: Instant, result: &Result<DriverAssignment, AppError>) {
    let outcome = if result.is_ok() { "success" } else { "error" };
    state
        .metrics
        .assignment_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .assignments_total
        .with_label_values(&[outcome])
        .inc();
}
