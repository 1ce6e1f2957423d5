use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    Asap,
    Scheduled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    AvailableForPickup,
    PickedUp,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Forward progression only; a ready order forks into courier
    /// delivery or customer pickup, and `Cancelled` is reachable from
    /// any non-terminal state.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        if next == Cancelled {
            return !self.is_terminal();
        }

        matches!(
            (*self, next),
            (Pending, Confirmed)
                | (Confirmed, Preparing)
                | (Preparing, Ready)
                | (Ready, OutForDelivery)
                | (Ready, AvailableForPickup)
                | (OutForDelivery, PickedUp)
                | (AvailableForPickup, PickedUp)
                | (PickedUp, Delivered)
        )
    }

    /// States that count against a driver's concurrent-order capacity.
    pub fn counts_against_driver(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::OutForDelivery | OrderStatus::PickedUp
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub business_id: Uuid,
    pub delivery_type: DeliveryType,
    pub status: OrderStatus,
    pub preferred_delivery_time: Option<DateTime<Utc>>,
    pub scheduled_window_start: Option<DateTime<Utc>>,
    pub scheduled_window_end: Option<DateTime<Utc>>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub driver_id: Option<Uuid>,
    pub available_for_drivers: bool,
    pub assigned_at: Option<DateTime<Utc>>,
    pub total: f64,
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub grand_total: f64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn order_number_for(id: Uuid) -> String {
        let simple = id.simple().to_string();
        format!("CMD-{}", simple[..8].to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;

    #[test]
    fn forward_progression_is_allowed() {
        let chain = [Pending, Confirmed, Preparing, Ready, OutForDelivery, PickedUp, Delivered];
        for pair in chain.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn pickup_branch_forks_from_ready() {
        assert!(Ready.can_transition_to(AvailableForPickup));
        assert!(AvailableForPickup.can_transition_to(PickedUp));
        assert!(AvailableForPickup.can_transition_to(Cancelled));
        assert!(!AvailableForPickup.can_transition_to(OutForDelivery));
        assert!(!OutForDelivery.can_transition_to(AvailableForPickup));
    }

    #[test]
    fn skipping_states_is_rejected() {
        assert!(!Pending.can_transition_to(Ready));
        assert!(!Confirmed.can_transition_to(OutForDelivery));
        assert!(!Ready.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(AvailableForPickup));
    }

    #[test]
    fn backward_transitions_are_rejected() {
        assert!(!Ready.can_transition_to(Preparing));
        assert!(!OutForDelivery.can_transition_to(Ready));
    }

    #[test]
    fn cancel_reachable_from_non_terminal_only() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(OutForDelivery.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for next in [
            Pending,
            Confirmed,
            Preparing,
            Ready,
            OutForDelivery,
            AvailableForPickup,
            PickedUp,
            Delivered,
        ] {
            assert!(!Delivered.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }
}
