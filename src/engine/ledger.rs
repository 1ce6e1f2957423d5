use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ledger::OpenOrder;
use crate::models::order::Order;
use crate::state::AppState;

/// Non-expired ledger entries, urgent offers first, then oldest first.
/// Entries whose `expires_at` has passed (or is exactly now) are never
/// returned; stale entries encountered along the way are swept out.
pub fn list_open_orders(state: &AppState, limit: usize) -> Vec<OpenOrder> {
    let now = Utc::now();

    let expired: Vec<Uuid> = state
        .open_orders
        .iter()
        .filter(|entry| entry.expires_at <= now)
        .map(|entry| *entry.key())
        .collect();

    for order_id in expired {
        if state.open_orders.remove(&order_id).is_some() {
            debug!(%order_id, "swept expired ledger entry");
            if let Some(mut order) = state.orders.get_mut(&order_id) {
                order.available_for_drivers = false;
            }
        }
    }

    let mut entries: Vec<OpenOrder> = state
        .open_orders
        .iter()
        .filter(|entry| entry.expires_at > now)
        .map(|entry| entry.value().clone())
        .collect();

    entries.sort_by(|a, b| {
        b.is_urgent
            .cmp(&a.is_urgent)
            .then(a.created_at.cmp(&b.created_at))
    });
    entries.truncate(limit);

    sync_gauge(state);
    entries
}

/// Inserts an offer keyed by order id. At most one entry may exist per
/// order, mirroring the uniqueness constraint of the backing table.
pub fn add_entry(
    state: &AppState,
    order: &Order,
    is_urgent: bool,
    expires_at: DateTime<Utc>,
    estimated_delivery_time: DateTime<Utc>,
) -> Result<OpenOrder, AppError> {
    let business = state
        .businesses
        .get(&order.business_id)
        .ok_or_else(|| AppError::NotFound(format!("business {} not found", order.business_id)))?;

    let entry = OpenOrder {
        order_id: order.id,
        order_number: order.order_number.clone(),
        business_id: business.id,
        business_name: business.name.clone(),
        business_address: business.address.clone(),
        delivery_fee: order.delivery_fee,
        grand_total: order.grand_total,
        is_urgent,
        expires_at,
        estimated_delivery_time,
        created_at: Utc::now(),
    };
    drop(business);

    match state.open_orders.entry(order.id) {
        Entry::Occupied(_) => Err(AppError::DuplicateEntry(order.id)),
        Entry::Vacant(vacant) => {
            vacant.insert(entry.clone());
            sync_gauge(state);
            Ok(entry)
        }
    }
}

/// Removes the entry for `order_id` if present. Absence is not an
/// error. A `Some` return doubles as the atomic claim token in the
/// driver-accept path: only one caller can win the removal.
pub fn remove_entry(state: &AppState, order_id: Uuid) -> Option<OpenOrder> {
    let removed = state.open_orders.remove(&order_id).map(|(_, entry)| entry);
    if removed.is_some() {
        sync_gauge(state);
    }
    removed
}

/// Puts a claimed entry back, compensating a claim whose follow-up
/// writes failed.
pub fn reinstate_entry(state: &AppState, entry: OpenOrder) {
    state.open_orders.insert(entry.order_id, entry);
    sync_gauge(state);
}

fn sync_gauge(state: &AppState) {
    state
        .metrics
        .ledger_open_entries
        .set(state.open_orders.len() as i64);
}
