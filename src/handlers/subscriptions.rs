use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{
    auth::AuthUser,
    entities::user::UserRole,
    errors::{ApiError, ServiceError},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Creates the router for vendor subscription endpoints
pub fn subscriptions_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route(
            "/stores/:store_id",
            get(list_store_subscriptions).post(subscribe),
        )
        .route("/:id/renew", post(renew))
        .route("/:id/pause", post(pause))
        .route("/:id/resume", post(resume))
        .route("/:id/cancel", post(cancel))
}

async fn list_plans(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.subscriptions.list_plans()))
}

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    plan: String,
    #[serde(default)]
    auto_renew: bool,
}

async fn subscribe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Vendor).map_err(map_service_error)?;
    let subscription = state
        .services
        .subscriptions
        .subscribe(user.user_id, store_id, &payload.plan, payload.auto_renew)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(subscription))
}

async fn list_store_subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_or_admin(UserRole::Vendor)
        .map_err(map_service_error)?;
    let store = state
        .services
        .stores
        .get_store(store_id)
        .await
        .map_err(map_service_error)?;
    if !user.is_admin() && store.vendor_id != user.user_id {
        return Err(map_service_error(ServiceError::Forbidden(
            "Store does not belong to this vendor".to_string(),
        )));
    }
    let subscriptions = state
        .services
        .subscriptions
        .list_for_store(store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(subscriptions))
}

async fn renew(
    State(state): State<AppState>,
    user: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user
        .require_or_admin(UserRole::Vendor)
        .map_err(map_service_error)?;
    let subscription = state
        .services
        .subscriptions
        .renew(&actor, subscription_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(subscription))
}

async fn pause(
    State(state): State<AppState>,
    user: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user
        .require_or_admin(UserRole::Vendor)
        .map_err(map_service_error)?;
    let subscription = state
        .services
        .subscriptions
        .pause(&actor, subscription_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(subscription))
}

async fn resume(
    State(state): State<AppState>,
    user: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user
        .require_or_admin(UserRole::Vendor)
        .map_err(map_service_error)?;
    let subscription = state
        .services
        .subscriptions
        .resume(&actor, subscription_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(subscription))
}

async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user
        .require_or_admin(UserRole::Vendor)
        .map_err(map_service_error)?;
    let subscription = state
        .services
        .subscriptions
        .cancel(&actor, subscription_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(subscription))
}
