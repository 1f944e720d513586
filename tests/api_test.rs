mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, north_of, store_location, TestApp};
use marketplace_api::entities::user::UserRole;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

fn id_of(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("uuid string")
}

#[tokio::test]
async fn health_reports_the_database() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::new().await;

    let response = app.send(Method::GET, "/api/v1/status", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["cache-control"], "no-store");
}

#[tokio::test]
async fn protected_routes_need_a_token_with_the_right_role() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .request(Method::GET, "/api/v1/cart", None, Some("not-a-jwt"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let vendor_token = app.token_for(Uuid::new_v4(), &[UserRole::Vendor]);
    let (status, body) = app
        .request(Method::GET, "/api/v1/cart", None, Some(&vendor_token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["forbidden"], true);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/admin/stores/{}/approve", Uuid::new_v4()),
            None,
            Some(&vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn registration_is_public_and_validated() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/register/customers",
            Some(json!({"name": "Asha", "email": "asha@example.com", "plan": "Super Saver"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "customer");
    assert_eq!(body["data"]["profile"]["plan"], "Super Saver");

    let customer = id_of(&body["data"]["user"]["id"]);
    let token = app.token_for(customer, &[UserRole::Customer]);
    let (status, me) = app.request(Method::GET, "/api/v1/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["user"]["email"], "asha@example.com");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/register/vendors",
            Some(json!({"name": ""})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/register/customers",
            Some(json!({"name": "Ravi", "plan": "Gold"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn marketplace_flow_over_http() {
    let app = TestApp::new().await;
    let admin = app.token_for(Uuid::new_v4(), &[UserRole::Admin]);

    let (_, vendor) = app
        .request(
            Method::POST,
            "/api/v1/register/vendors",
            Some(json!({"name": "Fresh Mart"})),
            None,
        )
        .await;
    let vendor_id = id_of(&vendor["data"]["user"]["id"]);
    let vendor_token = app.token_for(vendor_id, &[UserRole::Vendor]);

    let origin = store_location();
    let (status, store) = app
        .request(
            Method::POST,
            "/api/v1/stores",
            Some(json!({
                "name": "Fresh Mart Indiranagar",
                "latitude": origin.latitude,
                "longitude": origin.longitude
            })),
            Some(&vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(store["data"]["is_approved"], false);
    let store_id = id_of(&store["data"]["id"]);

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/stores/{}/open", store_id),
            Some(json!({"is_open": true})),
            Some(&vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, approved) = app
        .request(
            Method::POST,
            &format!("/api/v1/admin/stores/{}/approve", store_id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["data"]["subscription_plan"], "Free Trial");

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/stores/{}/open", store_id),
            Some(json!({"is_open": true})),
            Some(&vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, product) = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{}/products", store_id),
            Some(json!({"name": "Basmati rice 1kg", "price": "100", "quantity": 10})),
            Some(&vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = id_of(&product["data"]["id"]);

    let (_, customer) = app
        .request(
            Method::POST,
            "/api/v1/register/customers",
            Some(json!({"name": "Meera"})),
            None,
        )
        .await;
    let customer_id = id_of(&customer["data"]["user"]["id"]);
    let customer_token = app.token_for(customer_id, &[UserRole::Customer]);

    let (status, cart) = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({"product_id": product_id, "quantity": "2"})),
            Some(&customer_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["data"]["items"][0]["quantity"], 2);
    assert_eq!(decimal(&cart["data"]["grand_total"]), dec!(200));

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({"address_id": Uuid::new_v4(), "address": {"line1": "x"}})),
            Some(&customer_token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let destination = north_of(origin, 4.0);
    let (status, placed) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "address": {
                    "line1": "12th Main, HAL 2nd Stage",
                    "latitude": destination.latitude,
                    "longitude": destination.longitude
                }
            })),
            Some(&customer_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(placed["success"], true);
    assert_eq!(placed["data"]["status"], "PENDING");
    assert_eq!(decimal(&placed["data"]["total_amount"]), dec!(200));
    assert_eq!(decimal(&placed["data"]["delivery_fee_total"]), dec!(25));
    assert!(placed["data"]["side_effects"].is_array());
    assert_eq!(placed["data"]["items"].as_array().map(Vec::len), Some(1));
    let order_id = id_of(&placed["data"]["id"]);

    let (status, listed) = app
        .request(
            Method::GET,
            &format!("/api/v1/stores/{}/orders", store_id),
            None,
            Some(&vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));

    let (status, responded) = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{}/orders/{}/respond", store_id, order_id),
            Some(json!({"accept": true})),
            Some(&vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(responded["data"]["order"]["status"], "PROCESSING");
    assert_eq!(responded["data"]["side_effects"][0]["name"], "assign_partner");
    assert_eq!(responded["data"]["side_effects"][0]["outcome"], "failed");

    let (status, again) = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{}/orders/{}/respond", store_id, order_id),
            Some(json!({"accept": true})),
            Some(&vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(again["success"], false);

    let (status, history) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}/history", order_id),
            None,
            Some(&customer_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let statuses: Vec<&str> = history["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|h| h["status"].as_str())
        .collect();
    assert!(statuses.contains(&"CREATED"));
    assert!(statuses.contains(&"VENDOR_ACCEPTED"));
    assert!(statuses.contains(&"PROCESSING"));

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/cancel", order_id),
            None,
            Some(&customer_token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stranger = app.token_for(Uuid::new_v4(), &[UserRole::Customer]);
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(&stranger),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["forbidden"], true);
}

#[tokio::test]
async fn unknown_resources_are_not_found() {
    let app = TestApp::new().await;
    let customer = app.customer(None).await;
    let token = app.token_for(customer, &[UserRole::Customer]);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({"product_id": Uuid::new_v4(), "quantity": 1})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["not_found"], true);
    assert_eq!(body["error"], "Product not found");

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/cart/items/{}", Uuid::new_v4()),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
