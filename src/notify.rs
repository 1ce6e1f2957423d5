use tracing::{debug, warn};

use crate::models::event::OrderEventKind;
use crate::models::order::{Order, OrderStatus};

/// Fire-and-forget customer notification. Delivery runs detached from
/// the triggering workflow; a failed send is logged and swallowed.
pub fn notify_order_event(order: &Order, kind: OrderEventKind) {
    let Some(subject) = subject_for(kind, order.status) else {
        return;
    };

    let order_number = order.order_number.clone();
    tokio::spawn(async move {
        match send_email(&order_number, subject).await {
            Ok(()) => debug!(order_number = %order_number, subject, "notification email dispatched"),
            Err(err) => warn!(order_number = %order_number, error = %err, "notification email failed"),
        }
    });
}

fn subject_for(kind: OrderEventKind, status: OrderStatus) -> Option<&'static str> {
    match kind {
        OrderEventKind::Assigned => Some("Votre commande est en route"),
        OrderEventKind::Offered => Some("Votre commande est prête, un livreur va la prendre en charge"),
        OrderEventKind::Released => None,
        OrderEventKind::StatusChanged => match status {
            OrderStatus::Confirmed => Some("Votre commande est confirmée"),
            OrderStatus::Delivered => Some("Votre commande a été livrée"),
            OrderStatus::Cancelled => Some("Votre commande a été annulée"),
            _ => None,
        },
    }
}

// Stand-in for the outbound mail endpoint; the transport itself lives
// outside this service.
async fn send_email(_order_number: &str, _subject: &str) -> Result<(), String> {
    Ok(())
}
