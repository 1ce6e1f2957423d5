use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Active driver/order binding. An order carries at most one of these
/// at a time; the row is deleted when the driver is released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverAssignment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub driver_phone: String,
    pub assigned_at: DateTime<Utc>,
}
