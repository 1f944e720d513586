use crate::handlers::common::{lenient_quantity, map_service_error, success_response};
use crate::{auth::AuthUser, entities::user::UserRole, errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Creates the router for the caller's cart
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_to_cart))
        .route(
            "/items/:product_id",
            put(update_cart_item).delete(remove_cart_item),
        )
}

#[derive(Debug, Deserialize)]
struct AddItemRequest {
    product_id: Uuid,
    #[serde(default, deserialize_with = "lenient_quantity")]
    quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UpdateQuantityRequest {
    #[serde(default, deserialize_with = "lenient_quantity")]
    quantity: Option<i64>,
}

async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Customer).map_err(map_service_error)?;
    let cart = state
        .services
        .cart
        .get_cart(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Add item to cart
async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Customer).map_err(map_service_error)?;
    let cart = state
        .services
        .cart
        .add_to_cart(user.user_id, payload.product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Update cart item quantity; zero removes the line
async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Customer).map_err(map_service_error)?;
    let quantity = payload.quantity.ok_or_else(|| {
        ApiError::ValidationError("quantity must be a number".to_string())
    })?;
    let cart = state
        .services
        .cart
        .update_item_quantity(user.user_id, product_id, quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Customer).map_err(map_service_error)?;
    let cart = state
        .services
        .cart
        .remove_item(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Customer).map_err(map_service_error)?;
    let cart = state
        .services
        .cart
        .clear_cart(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}
