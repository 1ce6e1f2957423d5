use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A transient offer of an order to the driver pool. At most one entry
/// exists per order at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: Uuid,
    pub order_number: String,
    pub business_id: Uuid,
    pub business_name: String,
    pub business_address: String,
    pub delivery_fee: f64,
    pub grand_total: f64,
    pub is_urgent: bool,
    pub expires_at: DateTime<Utc>,
    pub estimated_delivery_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
