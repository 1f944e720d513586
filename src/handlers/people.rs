use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::user::UserRole,
    errors::ApiError,
    models::GeoPoint,
    services::people::{AddressInput, RegisterInput, RegisterPartnerInput},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

/// Registration is open; tokens are issued by the identity provider.
pub fn registration_routes() -> Router<AppState> {
    Router::new()
        .route("/customers", post(register_customer))
        .route("/vendors", post(register_vendor))
        .route("/delivery-partners", post(register_delivery_partner))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_me))
        .route("/plan", put(set_plan))
        .route("/addresses", post(add_address))
}

#[derive(Debug, Deserialize)]
struct RegisterCustomerRequest {
    #[serde(flatten)]
    person: RegisterInput,
    plan: Option<String>,
}

async fn register_customer(
    State(state): State<AppState>,
    Json(payload): Json<RegisterCustomerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload.person)?;
    let person = state
        .services
        .people
        .register_customer(payload.person, payload.plan)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(person))
}

async fn register_vendor(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let person = state
        .services
        .people
        .register_vendor(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(person))
}

async fn register_delivery_partner(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPartnerInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let person = state
        .services
        .people
        .register_delivery_partner(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(person))
}

/// The caller's identity with its role payload
async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let person = state
        .services
        .people
        .get_person(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(person))
}

#[derive(Debug, Deserialize)]
struct SetPlanRequest {
    plan: Option<String>,
}

async fn set_plan(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SetPlanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Customer).map_err(map_service_error)?;
    let profile = state
        .services
        .people
        .set_customer_plan(user.user_id, payload.plan.as_deref())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(profile))
}

async fn add_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddressInput>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(UserRole::Customer).map_err(map_service_error)?;
    validate_input(&payload)?;
    let address = state
        .services
        .people
        .add_address(user.user_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(address))
}

/// Body of location updates for stores and partners
#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationRequest {
    pub fn point(&self) -> Result<GeoPoint, ApiError> {
        GeoPoint::from_parts(Some(self.latitude), Some(self.longitude)).ok_or_else(|| {
            ApiError::ValidationError("latitude and longitude must be valid coordinates".to_string())
        })
    }
}
