use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::handlers::people::LocationRequest;
use crate::{
    auth::AuthUser,
    entities::user::UserRole,
    errors::ApiError,
    services::{products::CreateProductInput, stores::CreateStoreInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Creates the router for vendor store management
pub fn stores_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_store))
        .route("/mine", get(list_my_stores))
        .route("/:id", get(get_store))
        .route("/:id/open", put(set_store_open))
        .route("/:id/location", put(set_store_location))
        .route("/:id/products", get(list_store_products).post(create_product))
        .route("/:id/orders", get(list_store_orders))
        .route("/:id/orders/:order_id/respond", post(respond_to_order))
}

/// Creates the router for product management
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_product).delete(delete_product))
        .route("/:id/stock", put(update_stock))
        .route("/:id/active", put(set_product_active))
}

async fn create_store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateStoreInput>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Vendor).map_err(map_service_error)?;
    validate_input(&payload)?;
    let store = state
        .services
        .stores
        .create_store(user.user_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(store))
}

async fn list_my_stores(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Vendor).map_err(map_service_error)?;
    let stores = state
        .services
        .stores
        .list_vendor_stores(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(stores))
}

async fn get_store(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state
        .services
        .stores
        .get_store(store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(store))
}

#[derive(Debug, Deserialize)]
struct OpenRequest {
    is_open: bool,
}

async fn set_store_open(
    State(state): State<AppState>,
    user: AuthUser,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<OpenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Vendor).map_err(map_service_error)?;
    let store = state
        .services
        .stores
        .set_store_open(user.user_id, store_id, payload.is_open)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(store))
}

async fn set_store_location(
    State(state): State<AppState>,
    user: AuthUser,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<LocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Vendor).map_err(map_service_error)?;
    let point = payload.point()?;
    let store = state
        .services
        .stores
        .set_location(user.user_id, store_id, point)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(store))
}

/// Catalog of a store; any authenticated caller may browse it
async fn list_store_products(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .products
        .list_store_products(store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}

async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Vendor).map_err(map_service_error)?;
    validate_input(&payload)?;
    let product = state
        .services
        .products
        .create_product(user.user_id, store_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

async fn list_store_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Vendor).map_err(map_service_error)?;
    let orders = state
        .services
        .orders
        .list_orders_for_store(user.user_id, store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

#[derive(Debug, Deserialize)]
struct RespondRequest {
    accept: bool,
    note: Option<String>,
}

#[derive(Debug, Serialize)]
struct RespondResponse<O, S> {
    order: O,
    side_effects: S,
}

/// Accept or reject a pending order on behalf of one store
async fn respond_to_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path((store_id, order_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<RespondRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Vendor).map_err(map_service_error)?;
    let (order, side_effects) = state
        .services
        .orders
        .vendor_respond_to_order(order_id, user.user_id, store_id, payload.accept, payload.note)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(RespondResponse {
        order,
        side_effects,
    }))
}

async fn get_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .get_product(product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

#[derive(Debug, Deserialize)]
struct StockRequest {
    quantity: i32,
}

async fn update_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<StockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Vendor).map_err(map_service_error)?;
    let product = state
        .services
        .products
        .update_stock(user.user_id, product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

#[derive(Debug, Deserialize)]
struct ActiveRequest {
    is_active: bool,
}

async fn set_product_active(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<ActiveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Vendor).map_err(map_service_error)?;
    let product = state
        .services
        .products
        .set_active(user.user_id, product_id, payload.is_active)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Vendor).map_err(map_service_error)?;
    state
        .services
        .products
        .soft_delete_product(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "deleted": product_id })))
}
