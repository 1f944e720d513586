use crate::handlers::common::{map_service_error, success_response};
use crate::handlers::people::LocationRequest;
use crate::{auth::AuthUser, entities::user::UserRole, errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Creates the router for delivery partner endpoints
pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/location", put(update_location))
        .route("/availability", put(set_availability))
        .route("/orders/:id/respond", post(respond_to_assignment))
        .route("/orders/:id/pickup", post(mark_picked_up))
        .route("/orders/:id/deliver", post(mark_delivered))
        .route("/orders/:id/tracking", get(delivery_history))
}

async fn update_location(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<LocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::DeliveryPartner)
        .map_err(map_service_error)?;
    let point = payload.point()?;
    let partner = state
        .services
        .people
        .update_partner_location(user.user_id, point)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(partner))
}

#[derive(Debug, Deserialize)]
struct AvailabilityRequest {
    is_available: bool,
}

async fn set_availability(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AvailabilityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::DeliveryPartner)
        .map_err(map_service_error)?;
    let partner = state
        .services
        .people
        .set_partner_availability(user.user_id, payload.is_available)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(partner))
}

#[derive(Debug, Deserialize)]
struct AssignmentResponse {
    accept: bool,
    note: Option<String>,
}

async fn respond_to_assignment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<AssignmentResponse>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::DeliveryPartner)
        .map_err(map_service_error)?;
    let order = state
        .services
        .delivery
        .partner_respond(order_id, user.user_id, payload.accept, payload.note)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

async fn mark_picked_up(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::DeliveryPartner)
        .map_err(map_service_error)?;
    let order = state
        .services
        .delivery
        .mark_picked_up(order_id, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

async fn mark_delivered(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::DeliveryPartner)
        .map_err(map_service_error)?;
    let order = state
        .services
        .delivery
        .mark_delivered(order_id, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Assignment trail of an order; visible to anyone who can view the order
async fn delivery_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .orders
        .get_order(&user.actor(), order_id)
        .await
        .map_err(map_service_error)?;
    let history = state
        .services
        .delivery
        .delivery_history(order_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(history))
}
