mod common;

use assert_matches::assert_matches;
use common::{north_of, store_location, TestApp};
use marketplace_api::{
    entities::{
        order::{self, OrderStatus},
        order_history::HistoryStatus,
    },
    errors::ServiceError,
    services::{
        history::Actor,
        orders::{AddressChoice, CreateOrderInput},
        people::AddressInput,
        side_effects::Outcome,
    },
};
use rust_decimal_macros::dec;
use uuid::Uuid;

struct TwoStoreOrder {
    order: order::Model,
    first: (Uuid, Uuid),
    second: (Uuid, Uuid),
    first_product: Uuid,
}

/// One order with lines from two vendors' stores.
async fn two_store_order(app: &TestApp) -> TwoStoreOrder {
    let vendor_a = app.vendor().await;
    let store_a = app.open_store(vendor_a, store_location()).await;
    let milk = app.product(vendor_a, store_a.id, dec!(60), 10).await;

    let vendor_b = app.vendor().await;
    let store_b = app
        .open_store(vendor_b, north_of(store_location(), 1.0))
        .await;
    let bread = app.product(vendor_b, store_b.id, dec!(40), 10).await;

    let customer = app.customer(None).await;
    let cart = &app.state.services.cart;
    cart.add_to_cart(customer, milk.id, Some(2)).await.unwrap();
    cart.add_to_cart(customer, bread.id, Some(1)).await.unwrap();

    let destination = north_of(store_location(), 3.0);
    let input = CreateOrderInput {
        address: AddressChoice::Inline(AddressInput {
            line1: "7 Lavelle Road".to_string(),
            latitude: Some(destination.latitude),
            longitude: Some(destination.longitude),
            ..Default::default()
        }),
        ..Default::default()
    };
    let order = app
        .state
        .services
        .orders
        .create_order_from_cart(customer, input)
        .await
        .unwrap()
        .details
        .order;

    TwoStoreOrder {
        order,
        first: (vendor_a, store_a.id),
        second: (vendor_b, store_b.id),
        first_product: milk.id,
    }
}

#[tokio::test]
async fn order_waits_until_every_store_accepts_then_gets_a_partner() {
    let app = TestApp::new().await;
    let placed = two_store_order(&app).await;
    let partner = app.partner_at(north_of(store_location(), 0.5)).await;
    let orders = &app.state.services.orders;
    let order_id = placed.order.id;

    assert_eq!(placed.order.store_breakdown.0.len(), 2);

    let (vendor_a, store_a) = placed.first;
    let (after_first, effects) = orders
        .vendor_respond_to_order(order_id, vendor_a, store_a, true, None)
        .await
        .unwrap();
    assert_eq!(after_first.status, OrderStatus::Pending);
    assert!(effects.entries().is_empty());

    let (vendor_b, store_b) = placed.second;
    let (after_second, effects) = orders
        .vendor_respond_to_order(order_id, vendor_b, store_b, true, Some("packed".to_string()))
        .await
        .unwrap();
    assert_eq!(effects.outcome_of("assign_partner"), Some(Outcome::Succeeded));
    assert_eq!(after_second.status, OrderStatus::AssignedToPartner);
    assert_eq!(after_second.delivery_partner_id, Some(partner));

    let history = orders
        .get_order_history(&Actor::system(), order_id, None)
        .await
        .unwrap();
    let statuses: Vec<HistoryStatus> = history.iter().map(|h| h.status).collect();
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == HistoryStatus::VendorAccepted)
            .count(),
        2
    );
    assert!(statuses.contains(&HistoryStatus::Created));
    assert!(statuses.contains(&HistoryStatus::Processing));
    assert!(statuses.contains(&HistoryStatus::AssignedToPartner));
}

#[tokio::test]
async fn acceptance_without_a_partner_nearby_still_moves_to_processing() {
    let app = TestApp::new().await;
    let placed = two_store_order(&app).await;
    let orders = &app.state.services.orders;
    let order_id = placed.order.id;

    let (vendor_a, store_a) = placed.first;
    orders
        .vendor_respond_to_order(order_id, vendor_a, store_a, true, None)
        .await
        .unwrap();
    let (vendor_b, store_b) = placed.second;
    let (order, effects) = orders
        .vendor_respond_to_order(order_id, vendor_b, store_b, true, None)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Processing);
    assert!(order.delivery_partner_id.is_none());
    assert_eq!(effects.outcome_of("assign_partner"), Some(Outcome::Failed));
}

#[tokio::test]
async fn one_rejection_cancels_the_whole_order_and_restocks() {
    let app = TestApp::new().await;
    let placed = two_store_order(&app).await;
    let orders = &app.state.services.orders;
    let order_id = placed.order.id;

    let (vendor_a, store_a) = placed.first;
    orders
        .vendor_respond_to_order(order_id, vendor_a, store_a, true, None)
        .await
        .unwrap();
    let (vendor_b, store_b) = placed.second;
    let (order, _) = orders
        .vendor_respond_to_order(order_id, vendor_b, store_b, false, Some("out of bread".to_string()))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Cancelled);
    let milk = app
        .state
        .services
        .products
        .get_product(placed.first_product)
        .await
        .unwrap();
    assert_eq!(milk.quantity, 10);

    let history = orders
        .get_order_history(&Actor::vendor(vendor_b), order_id, Some(store_b))
        .await
        .unwrap();
    let rejected = history
        .iter()
        .find(|h| h.status == HistoryStatus::VendorRejected)
        .unwrap();
    assert_eq!(rejected.store_id, Some(store_b));
    assert_eq!(rejected.note.as_deref(), Some("out of bread"));
    assert!(history.iter().any(|h| h.status == HistoryStatus::Cancelled));
    // the other store's acceptance is scoped away
    assert!(history.iter().all(|h| h.status != HistoryStatus::VendorAccepted));

    let err = orders
        .vendor_respond_to_order(order_id, vendor_a, store_a, true, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn a_store_answers_only_once() {
    let app = TestApp::new().await;
    let placed = two_store_order(&app).await;
    let orders = &app.state.services.orders;
    let (vendor_a, store_a) = placed.first;

    orders
        .vendor_respond_to_order(placed.order.id, vendor_a, store_a, true, None)
        .await
        .unwrap();
    let err = orders
        .vendor_respond_to_order(placed.order.id, vendor_a, store_a, false, None)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn only_the_owning_vendor_can_respond() {
    let app = TestApp::new().await;
    let placed = two_store_order(&app).await;
    let orders = &app.state.services.orders;
    let (vendor_a, store_a) = placed.first;
    let (vendor_b, _) = placed.second;

    let err = orders
        .vendor_respond_to_order(placed.order.id, vendor_b, store_a, true, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let stranger = app.vendor().await;
    let elsewhere = app.open_store(stranger, store_location()).await;
    let err = orders
        .vendor_respond_to_order(placed.order.id, stranger, elsewhere.id, true, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let listed = orders.list_orders_for_store(vendor_a, store_a).await.unwrap();
    assert_eq!(listed.len(), 1);
    let err = orders
        .list_orders_for_store(vendor_b, store_a)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn vendors_only_see_orders_that_include_their_store() {
    let app = TestApp::new().await;
    let placed = two_store_order(&app).await;
    let orders = &app.state.services.orders;
    let (vendor_a, _) = placed.first;

    let seen = orders
        .get_order(&Actor::vendor(vendor_a), placed.order.id)
        .await
        .unwrap();
    assert_eq!(seen.items.len(), 2);

    let stranger = app.vendor().await;
    let err = orders
        .get_order(&Actor::vendor(stranger), placed.order.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn each_store_sees_its_own_creation_entry() {
    let app = TestApp::new().await;
    let placed = two_store_order(&app).await;
    let orders = &app.state.services.orders;
    let (vendor_a, store_a) = placed.first;
    let (_, store_b) = placed.second;

    let history = orders
        .get_order_history(&Actor::vendor(vendor_a), placed.order.id, Some(store_a))
        .await
        .unwrap();
    let created: Vec<Option<Uuid>> = history
        .iter()
        .filter(|h| h.status == HistoryStatus::Created)
        .map(|h| h.store_id)
        .collect();
    assert!(created.contains(&None));
    assert!(created.contains(&Some(store_a)));
    assert!(!created.contains(&Some(store_b)));
    let own = history
        .iter()
        .find(|h| h.status == HistoryStatus::Created && h.store_id == Some(store_a))
        .unwrap();
    assert_eq!(own.note.as_deref(), Some("2 unit(s) ordered from this store"));

    let everything = orders
        .get_order_history(&Actor::system(), placed.order.id, None)
        .await
        .unwrap();
    assert_eq!(
        everything
            .iter()
            .filter(|h| h.status == HistoryStatus::Created)
            .count(),
        3
    );
}
