use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::models::assignment::DriverAssignment;
use crate::models::business::Business;
use crate::models::driver::Driver;
use crate::models::event::OrderEvent;
use crate::models::ledger::OpenOrder;
use crate::models::order::Order;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub config: Config,
    pub businesses: DashMap<Uuid, Business>,
    pub drivers: DashMap<Uuid, Driver>,
    pub orders: DashMap<Uuid, Order>,
    /// Availability ledger, keyed by order id.
    pub open_orders: DashMap<Uuid, OpenOrder>,
    /// Active driver/order bindings, keyed by order id.
    pub assignments: DashMap<Uuid, DriverAssignment>,
    pub order_events_tx: broadcast::Sender<OrderEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let (order_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        Self {
            config,
            businesses: DashMap::new(),
            drivers: DashMap::new(),
            orders: DashMap::new(),
            open_orders: DashMap::new(),
            assignments: DashMap::new(),
            order_events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn publish(&self, event: OrderEvent) {
        let _ = self.order_events_tx.send(event);
    }
}
