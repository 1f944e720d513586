use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{
    auth::AuthUser,
    entities::user::UserRole,
    errors::ApiError,
    services::{
        orders::{AddressChoice, CreateOrderInput},
        people::AddressInput,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_my_orders))
        .route("/:id", get(get_order))
        .route("/:id/history", get(get_order_history))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/tip", put(update_tip))
}

/// Checkout body. `address_id` picks a saved address, `address` an inline one.
#[derive(Debug, Default, Deserialize)]
struct CreateOrderRequest {
    address_id: Option<Uuid>,
    address: Option<AddressInput>,
    clear_cart: Option<bool>,
    #[serde(default)]
    save_address: bool,
}

impl CreateOrderRequest {
    fn into_input(self) -> Result<CreateOrderInput, ApiError> {
        let address = match (self.address_id, self.address) {
            (Some(_), Some(_)) => {
                return Err(ApiError::ValidationError(
                    "Provide either address_id or address, not both".to_string(),
                ))
            }
            (Some(address_id), None) => AddressChoice::Saved { address_id },
            (None, Some(inline)) => AddressChoice::Inline(inline),
            (None, None) => AddressChoice::None,
        };
        Ok(CreateOrderInput {
            address,
            clear_cart: self.clear_cart.unwrap_or(true),
            save_address: self.save_address,
        })
    }
}

/// Place an order from the caller's cart
async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Customer).map_err(map_service_error)?;
    let input = payload.into_input()?;
    let placed = state
        .services
        .orders
        .create_order_from_cart(user.user_id, input)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(placed))
}

async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Customer).map_err(map_service_error)?;
    let orders = state
        .services
        .orders
        .list_orders_for_customer(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(&user.actor(), order_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    store_id: Option<Uuid>,
}

async fn get_order_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state
        .services
        .orders
        .get_order_history(&user.actor(), order_id, query.store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(history))
}

#[derive(Debug, Default, Deserialize)]
struct CancelRequest {
    reason: Option<String>,
}

async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    payload: Option<Json<CancelRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Customer).map_err(map_service_error)?;
    let reason = payload.and_then(|Json(body)| body.reason);
    let order = state
        .services
        .orders
        .cancel_order(order_id, user.user_id, reason)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
struct TipRequest {
    tip: Decimal,
}

async fn update_tip(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<TipRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Customer).map_err(map_service_error)?;
    let earnings = state
        .services
        .delivery
        .update_order_tip(order_id, user.user_id, payload.tip)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(earnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_and_inline_address_are_exclusive() {
        let both = CreateOrderRequest {
            address_id: Some(Uuid::new_v4()),
            address: Some(AddressInput {
                line1: "1 Main St".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(both.into_input().is_err());

        let none = CreateOrderRequest::default().into_input().unwrap();
        assert!(none.clear_cart);
        assert!(matches!(none.address, AddressChoice::None));
    }
}
