use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::policy;
use crate::error::AppError;
use crate::models::order::{DeliveryType, Order, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", patch(update_order_status))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub business_id: Uuid,
    pub delivery_type: DeliveryType,
    pub total: f64,
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub preferred_delivery_time: Option<DateTime<Utc>>,
    pub scheduled_window_start: Option<DateTime<Utc>>,
    pub scheduled_window_end: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if !state.businesses.contains_key(&payload.business_id) {
        return Err(AppError::NotFound(format!(
            "business {} not found",
            payload.business_id
        )));
    }

    if payload.total < 0.0 || payload.delivery_fee < 0.0 || payload.service_fee < 0.0 {
        return Err(AppError::Validation("amounts cannot be negative".to_string()));
    }

    if payload.delivery_type == DeliveryType::Scheduled {
        let (start, end) = match (payload.scheduled_window_start, payload.scheduled_window_end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(AppError::Validation(
                    "scheduled orders require a delivery window".to_string(),
                ))
            }
        };
        if start >= end {
            return Err(AppError::Validation(
                "delivery window start must precede its end".to_string(),
            ));
        }
    }

    let id = Uuid::new_v4();
    let order = Order {
        id,
        order_number: Order::order_number_for(id),
        business_id: payload.business_id,
        delivery_type: payload.delivery_type,
        status: OrderStatus::Pending,
        preferred_delivery_time: payload.preferred_delivery_time,
        scheduled_window_start: payload.scheduled_window_start,
        scheduled_window_end: payload.scheduled_window_end,
        estimated_delivery_time: None,
        actual_delivery_time: None,
        driver_id: None,
        available_for_drivers: false,
        assigned_at: None,
        total: payload.total,
        delivery_fee: payload.delivery_fee,
        service_fee: payload.service_fee,
        grand_total: payload.total + payload.delivery_fee + payload.service_fee,
        created_at: Utc::now(),
    };

    state.orders.insert(order.id, order.clone());
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order.value().clone()))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Json<Vec<Order>> {
    let orders = state
        .orders
        .iter()
        .filter(|entry| query.status.map_or(true, |status| entry.status == status))
        .map(|entry| entry.value().clone())
        .collect();

    Json(orders)
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = policy::handle_order_status_change(&state, id, payload.status)?;
    Ok(Json(order))
}
