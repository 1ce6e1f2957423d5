use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::engine::{ledger, release};
use crate::error::AppError;
use crate::models::event::{OrderEvent, OrderEventKind};
use crate::models::ledger::OpenOrder;
use crate::models::order::{DeliveryType, Order, OrderStatus};
use crate::notify;
use crate::state::AppState;

/// Applies a status transition and runs the side effects this core owns:
/// offering the order to drivers on `Ready`, retiring the offer once the
/// order leaves the offerable window, and freeing the driver when the
/// order completes or is cancelled. All other transitions only move the
/// status column.
pub fn handle_order_status_change(
    state: &AppState,
    order_id: Uuid,
    new_status: OrderStatus,
) -> Result<Order, AppError> {
    let (order, previous) = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        if !order.status.can_transition_to(new_status) {
            return Err(AppError::Validation(format!(
                "invalid status transition {:?} -> {:?} for order {}",
                order.status, new_status, order.order_number
            )));
        }

        // delivery departure belongs to the assignment workflow
        if new_status == OrderStatus::OutForDelivery && order.driver_id.is_none() {
            return Err(AppError::Validation(format!(
                "order {} cannot go out for delivery without a driver",
                order.order_number
            )));
        }

        let previous = order.status;
        order.status = new_status;
        if new_status == OrderStatus::Delivered {
            order.actual_delivery_time = Some(Utc::now());
        }
        (order.clone(), previous)
    };

    let mut kind = OrderEventKind::StatusChanged;
    match new_status {
        OrderStatus::Ready => {
            if let Err(err) = offer_order(state, &order) {
                // undo the half-applied transition
                if let Some(mut order) = state.orders.get_mut(&order_id) {
                    order.status = previous;
                }
                return Err(err);
            }
            kind = OrderEventKind::Offered;
        }
        OrderStatus::OutForDelivery | OrderStatus::AvailableForPickup => {
            // the order left the offerable window; removal is
            // idempotent, the entry is usually already gone on the
            // assignment path
            ledger::remove_entry(state, order_id);
            if let Some(mut order) = state.orders.get_mut(&order_id) {
                order.available_for_drivers = false;
            }
        }
        OrderStatus::Delivered => {
            // a completed delivery no longer counts against capacity
            if let Some((_, assignment)) = state.assignments.remove(&order_id) {
                release::refresh_driver_availability(state, assignment.driver_id);
            }
        }
        OrderStatus::Cancelled => {
            ledger::remove_entry(state, order_id);
            if let Some(mut order) = state.orders.get_mut(&order_id) {
                order.available_for_drivers = false;
            }
            // a cancelled delivery frees its driver
            if let Some((_, assignment)) = state.assignments.remove(&order_id) {
                release::refresh_driver_availability(state, assignment.driver_id);
            }
        }
        _ => {}
    }

    let order = state
        .orders
        .get(&order_id)
        .map(|entry| entry.value().clone())
        .unwrap_or(order);

    info!(
        order_number = %order.order_number,
        status = ?order.status,
        "order status changed"
    );

    notify::notify_order_event(&order, kind);
    state.publish(OrderEvent {
        kind,
        order_id: order.id,
        order_number: order.order_number.clone(),
        status: order.status,
        driver_id: order.driver_id,
        at: Utc::now(),
    });

    Ok(order)
}

/// Classifies a ready order into a ledger offer. ASAP orders get an
/// urgent, short-fused entry; scheduled orders stay claimable until
/// their delivery window closes.
pub fn offer_order(state: &AppState, order: &Order) -> Result<OpenOrder, AppError> {
    let now = Utc::now();

    let (is_urgent, expires_at, eta) = match order.delivery_type {
        DeliveryType::Asap => (
            true,
            now + Duration::minutes(state.config.asap_offer_expiry_minutes),
            now + Duration::minutes(state.config.asap_eta_minutes),
        ),
        DeliveryType::Scheduled => {
            let start = order.scheduled_window_start.ok_or_else(|| {
                AppError::Validation(format!(
                    "scheduled order {} has no delivery window start",
                    order.order_number
                ))
            })?;
            let end = order.scheduled_window_end.ok_or_else(|| {
                AppError::Validation(format!(
                    "scheduled order {} has no delivery window end",
                    order.order_number
                ))
            })?;
            (false, end, start)
        }
    };

    let entry = ledger::add_entry(state, order, is_urgent, expires_at, eta)?;

    if let Some(mut order) = state.orders.get_mut(&order.id) {
        order.available_for_drivers = true;
        order.estimated_delivery_time = Some(eta);
    }

    let urgency = if is_urgent { "urgent" } else { "scheduled" };
    state
        .metrics
        .orders_offered_total
        .with_label_values(&[urgency])
        .inc();

    info!(
        order_number = %order.order_number,
        urgency,
        expires_at = %expires_at,
        "order offered to driver pool"
    );

    Ok(entry)
}
