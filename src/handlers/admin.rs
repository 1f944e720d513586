use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::{order::PaymentStatus, user::UserRole},
    errors::ApiError,
    services::people::RegisterInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// Creates the router for back-office operations; every route needs the admin role
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admins", post(register_admin))
        .route("/stores/:id/approve", post(approve_store))
        .route("/stores/:id/commission", put(set_commission))
        .route("/orders/:id/assign", post(assign_partner))
        .route("/orders/:id/payment", put(update_payment_status))
        .route("/orders/:id/earnings", post(recompute_earnings))
        .route("/customers/:id/wallet", post(credit_wallet))
}

async fn register_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Admin).map_err(map_service_error)?;
    validate_input(&payload)?;
    let person = state
        .services
        .people
        .register_admin(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(person))
}

/// Approve a store; the free trial is granted as part of approval
async fn approve_store(
    State(state): State<AppState>,
    user: AuthUser,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Admin).map_err(map_service_error)?;
    let store = state
        .services
        .stores
        .approve_store(store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(store))
}

#[derive(Debug, Deserialize)]
struct CommissionRequest {
    commission_percent: Option<Decimal>,
}

async fn set_commission(
    State(state): State<AppState>,
    user: AuthUser,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CommissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Admin).map_err(map_service_error)?;
    let store = state
        .services
        .stores
        .set_commission_override(store_id, payload.commission_percent)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(store))
}

#[derive(Debug, Deserialize)]
struct AssignRequest {
    store_id: Uuid,
}

async fn assign_partner(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require(UserRole::Admin).map_err(map_service_error)?;
    let order = state
        .services
        .delivery
        .assign_delivery_partner(order_id, payload.store_id, actor)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
struct PaymentRequest {
    status: PaymentStatus,
}

async fn update_payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<PaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Admin).map_err(map_service_error)?;
    let order = state
        .services
        .orders
        .update_payment_status(user.user_id, order_id, payload.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

async fn recompute_earnings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Admin).map_err(map_service_error)?;
    let earnings = state
        .services
        .delivery
        .update_delivery_partner_earnings(order_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(earnings))
}

#[derive(Debug, Deserialize)]
struct WalletCreditRequest {
    amount: Decimal,
}

async fn credit_wallet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<WalletCreditRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Admin).map_err(map_service_error)?;
    let balance = state
        .services
        .people
        .credit_wallet(customer_id, payload.amount)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "customer_id": customer_id,
        "wallet_balance": balance,
    })))
}
