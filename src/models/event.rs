use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::order::OrderStatus;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    StatusChanged,
    Offered,
    Assigned,
    Released,
}

/// Broadcast to websocket subscribers on every lifecycle mutation.
#[derive(Debug, Clone, Serialize)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub order_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub driver_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}
