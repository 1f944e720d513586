#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use marketplace_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{order, product, store, user::UserRole},
    events,
    handlers::AppServices,
    models::{geo::km_per_degree_latitude, GeoPoint},
    services::{
        geocoding::{Geocoder, NoopGeocoder},
        notifications::LogNotifier,
        orders::{AddressChoice, CreateOrderInput},
        people::{AddressInput, RegisterInput, RegisterPartnerInput},
        products::CreateProductInput,
        stores::CreateStoreInput,
    },
    AppState,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Pickup point used by the seeded stores.
pub fn store_location() -> GeoPoint {
    GeoPoint::new(12.9716, 77.5946)
}

/// Reads a decimal serialized as a JSON string.
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .map(|s| s.parse().expect("decimal string"))
        .or_else(|| value.as_f64().and_then(|f| Decimal::try_from(f).ok()))
        .expect("decimal value")
}

/// A point `km` due north of `origin`.
pub fn north_of(origin: GeoPoint, km: f64) -> GeoPoint {
    GeoPoint::new(origin.latitude + km / km_per_degree_latitude(), origin.longitude)
}

/// Application state backed by a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_geocoder(Arc::new(NoopGeocoder)).await
    }

    pub async fn with_geocoder(geocoder: Arc<dyn Geocoder>) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(256);
        let event_sender = Arc::new(event_sender);
        let event_task = tokio::spawn(events::process_events(event_rx, Arc::new(LogNotifier)));

        let services = AppServices::new(db_arc.clone(), event_sender.clone(), &cfg, geocoder);
        let auth = Arc::new(AuthService::new(AuthConfig::new(cfg.jwt_secret.clone())));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            auth,
        };
        let router = marketplace_api::build_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub fn token_for(&self, user_id: Uuid, roles: &[UserRole]) -> String {
        self.state
            .auth
            .issue_token(user_id, None, roles)
            .expect("issue test token")
    }

    /// Sends a request through the full middleware stack.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error during test request")
    }

    /// Sends a request and returns the status with the parsed JSON body
    /// (`Value::Null` for an empty body).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.send(method, uri, body, token).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn customer(&self, plan: Option<&str>) -> Uuid {
        self.state
            .services
            .people
            .register_customer(
                RegisterInput {
                    name: "Test Customer".to_string(),
                    ..Default::default()
                },
                plan.map(str::to_string),
            )
            .await
            .expect("register customer")
            .id()
    }

    pub async fn vendor(&self) -> Uuid {
        self.state
            .services
            .people
            .register_vendor(RegisterInput {
                name: "Test Vendor".to_string(),
                ..Default::default()
            })
            .await
            .expect("register vendor")
            .id()
    }

    pub async fn partner_at(&self, location: GeoPoint) -> Uuid {
        self.state
            .services
            .people
            .register_delivery_partner(RegisterPartnerInput {
                person: RegisterInput {
                    name: "Test Partner".to_string(),
                    ..Default::default()
                },
                vehicle: Some("bike".to_string()),
                latitude: Some(location.latitude),
                longitude: Some(location.longitude),
            })
            .await
            .expect("register delivery partner")
            .id()
    }

    /// Creates, approves and opens a store at `location`.
    pub async fn open_store(&self, vendor_id: Uuid, location: GeoPoint) -> store::Model {
        let stores = &self.state.services.stores;
        let created = stores
            .create_store(
                vendor_id,
                CreateStoreInput {
                    name: "Corner Grocery".to_string(),
                    latitude: Some(location.latitude),
                    longitude: Some(location.longitude),
                    delivery_radius_km: None,
                },
            )
            .await
            .expect("create store");
        stores.approve_store(created.id).await.expect("approve store");
        stores
            .set_store_open(vendor_id, created.id, true)
            .await
            .expect("open store")
    }

    pub async fn product(
        &self,
        vendor_id: Uuid,
        store_id: Uuid,
        price: Decimal,
        quantity: i32,
    ) -> product::Model {
        self.state
            .services
            .products
            .create_product(
                vendor_id,
                store_id,
                CreateProductInput {
                    name: format!("Item {}", &Uuid::new_v4().to_string()[..8]),
                    image_url: None,
                    price,
                    quantity,
                },
            )
            .await
            .expect("create product")
    }

    /// Puts `quantity` units in the customer's cart and checks out to `destination`.
    pub async fn place_order(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i64,
        destination: GeoPoint,
    ) -> order::Model {
        self.state
            .services
            .cart
            .add_to_cart(customer_id, product_id, Some(quantity))
            .await
            .expect("add to cart");
        let input = CreateOrderInput {
            address: AddressChoice::Inline(AddressInput {
                line1: "5 Church Street".to_string(),
                latitude: Some(destination.latitude),
                longitude: Some(destination.longitude),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.state
            .services
            .orders
            .create_order_from_cart(customer_id, input)
            .await
            .expect("place order")
            .details
            .order
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
