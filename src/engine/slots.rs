use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::DeliveryType;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct SlotAvailability {
    pub available: bool,
    pub remaining: u32,
    pub competing: u32,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
}

/// Counts competing scheduled orders of a business inside the slot
/// containing `time` and compares against the business's per-slot cap.
pub fn check_delivery_slot_availability(
    state: &AppState,
    business_id: Uuid,
    time: DateTime<Utc>,
) -> Result<SlotAvailability, AppError> {
    let max_per_slot = state
        .businesses
        .get(&business_id)
        .map(|business| business.max_orders_per_slot)
        .ok_or_else(|| AppError::NotFound(format!("business {business_id} not found")))?;

    let slot_minutes = state.config.slot_window_minutes;
    let slot_start = align_to_slot(time, slot_minutes);
    let slot_end = slot_start + Duration::minutes(slot_minutes);

    let competing = state
        .orders
        .iter()
        .filter(|order| order.business_id == business_id)
        .filter(|order| order.delivery_type == DeliveryType::Scheduled)
        .filter(|order| !order.status.is_terminal())
        .filter(|order| {
            order
                .scheduled_window_start
                .map(|start| start >= slot_start && start < slot_end)
                .unwrap_or(false)
        })
        .count() as u32;

    Ok(SlotAvailability {
        available: competing < max_per_slot,
        remaining: max_per_slot.saturating_sub(competing),
        competing,
        slot_start,
        slot_end,
    })
}

fn align_to_slot(time: DateTime<Utc>, slot_minutes: i64) -> DateTime<Utc> {
    let midnight = time
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(time);
    let elapsed = i64::from(time.num_seconds_from_midnight());
    let slot_seconds = slot_minutes * 60;
    midnight + Duration::seconds(elapsed - elapsed % slot_seconds)
}
