use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::assignment::open_assignment_count;
use crate::engine::policy;
use crate::error::AppError;
use crate::models::event::{OrderEvent, OrderEventKind};
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

/// Frees a driver and re-offers the order. The assignment row is the
/// anchor: if it is missing (or held by another driver) nothing else is
/// touched.
pub fn release_driver_from_order(
    state: &AppState,
    driver_id: Uuid,
    order_id: Uuid,
) -> Result<Order, AppError> {
    state
        .assignments
        .remove_if(&order_id, |_, assignment| assignment.driver_id == driver_id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "no active assignment of driver {driver_id} on order {order_id}"
            ))
        })?;

    let order = {
        let mut order = state.orders.get_mut(&order_id).ok_or_else(|| {
            error!(%order_id, "order missing after assignment removal");
            AppError::PartialFailure(format!(
                "assignment removed but order {order_id} not found"
            ))
        })?;

        order.driver_id = None;
        order.status = OrderStatus::Ready;
        order.assigned_at = None;
        order.clone()
    };

    // put the order back in front of the driver pool
    match policy::offer_order(state, &order) {
        Ok(_) => {}
        Err(AppError::DuplicateEntry(_)) => {
            warn!(%order_id, "ledger entry already present on release");
        }
        Err(err) => {
            error!(%order_id, error = %err, "re-offer after release failed");
            refresh_driver_availability(state, driver_id);
            return Err(AppError::PartialFailure(format!(
                "driver {driver_id} released but order {order_id} not re-offered: {err}"
            )));
        }
    }

    refresh_driver_availability(state, driver_id);
    state.metrics.releases_total.inc();

    let order = state
        .orders
        .get(&order_id)
        .map(|entry| entry.value().clone())
        .unwrap_or(order);

    info!(
        order_number = %order.order_number,
        driver_id = %driver_id,
        "driver released from order"
    );

    state.publish(OrderEvent {
        kind: OrderEventKind::Released,
        order_id: order.id,
        order_number: order.order_number.clone(),
        status: order.status,
        driver_id: None,
        at: Utc::now(),
    });

    Ok(order)
}

/// Recomputes `is_available` from the driver's remaining open
/// assignments against the capacity threshold.
pub fn refresh_driver_availability(state: &AppState, driver_id: Uuid) {
    let open = open_assignment_count(state, driver_id);
    if let Some(mut driver) = state.drivers.get_mut(&driver_id) {
        driver.is_available = driver.is_active && open < state.config.driver_max_active_orders;
        driver.updated_at = Utc::now();
    }
}
