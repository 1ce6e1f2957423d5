use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::{assignment, ledger, release};
use crate::error::AppError;
use crate::models::assignment::DriverAssignment;
use crate::models::driver::{Driver, VehicleType};
use crate::models::ledger::OpenOrder;
use crate::models::order::Order;
use crate::state::AppState;

const DEFAULT_OPEN_ORDERS_LIMIT: usize = 20;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/:id/active", patch(set_driver_active))
        .route("/drivers/:id/available-orders", get(available_orders))
        .route("/drivers/:id/accept", post(accept_order))
        .route("/drivers/:id/assign", post(assign_order))
        .route("/drivers/:id/release", post(release_order))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub business_id: Uuid,
    pub name: String,
    pub phone: String,
    pub vehicle_type: VehicleType,
    pub vehicle_plate: String,
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct AvailableOrdersQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct OrderRef {
    pub order_id: Uuid,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if payload.phone.trim().is_empty() {
        return Err(AppError::Validation("phone cannot be empty".to_string()));
    }
    if !state.businesses.contains_key(&payload.business_id) {
        return Err(AppError::NotFound(format!(
            "business {} not found",
            payload.business_id
        )));
    }

    let now = Utc::now();
    let driver = Driver {
        id: Uuid::new_v4(),
        business_id: payload.business_id,
        name: payload.name,
        phone: payload.phone,
        vehicle_type: payload.vehicle_type,
        vehicle_plate: payload.vehicle_plate,
        is_active: true,
        is_available: true,
        created_at: now,
        updated_at: now,
    };

    state.drivers.insert(driver.id, driver.clone());
    Ok(Json(driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    let drivers = state
        .drivers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(drivers)
}

/// Soft delete and reinstatement. A deactivated driver keeps its row but
/// stops receiving offers and assignments.
async fn set_driver_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<Driver>, AppError> {
    {
        let mut driver = state
            .drivers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

        driver.is_active = payload.is_active;
        driver.updated_at = Utc::now();
    }

    release::refresh_driver_availability(&state, id);

    let driver = state
        .drivers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;
    Ok(Json(driver.value().clone()))
}

async fn available_orders(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailableOrdersQuery>,
) -> Result<Json<Vec<OpenOrder>>, AppError> {
    let driver = state
        .drivers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;
    if !driver.is_active {
        return Err(AppError::Validation(format!("driver {id} is inactive")));
    }
    drop(driver);

    let limit = query.limit.unwrap_or(DEFAULT_OPEN_ORDERS_LIMIT);
    Ok(Json(ledger::list_open_orders(&state, limit)))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderRef>,
) -> Result<Json<DriverAssignment>, AppError> {
    let assignment = assignment::accept_order_by_driver(&state, payload.order_id, id)?;
    Ok(Json(assignment))
}

async fn assign_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderRef>,
) -> Result<Json<DriverAssignment>, AppError> {
    let assignment = assignment::assign_driver_to_order(&state, id, payload.order_id)?;
    Ok(Json(assignment))
}

async fn release_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderRef>,
) -> Result<Json<Order>, AppError> {
    let order = release::release_driver_from_order(&state, id, payload.order_id)?;
    Ok(Json(order))
}
