mod common;

use assert_matches::assert_matches;
use common::{north_of, store_location, TestApp};
use marketplace_api::{
    entities::{delivery_history::DeliveryStatus, order::OrderStatus},
    errors::ServiceError,
    models::Person,
    services::history::Actor,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

struct Accepted {
    order_id: Uuid,
    customer: Uuid,
    store_id: Uuid,
}

/// Places a single-store order 4 km from the store and has the vendor accept it.
async fn accepted_order(app: &TestApp) -> Accepted {
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let product = app.product(vendor, store.id, dec!(100), 10).await;
    let customer = app.customer(None).await;
    let order = app
        .place_order(customer, product.id, 2, north_of(store_location(), 4.0))
        .await;
    app.state
        .services
        .orders
        .vendor_respond_to_order(order.id, vendor, store.id, true, None)
        .await
        .unwrap();
    Accepted {
        order_id: order.id,
        customer,
        store_id: store.id,
    }
}

async fn deliveries_of(app: &TestApp, partner: Uuid) -> i32 {
    match app.state.services.people.get_person(partner).await.unwrap() {
        Person::DeliveryPartner { partner, .. } => partner.total_deliveries,
        other => panic!("expected a delivery partner, got {:?}", other.user().role),
    }
}

#[tokio::test]
async fn partner_completes_the_delivery() {
    let app = TestApp::new().await;
    let partner = app.partner_at(north_of(store_location(), 0.5)).await;
    let placed = accepted_order(&app).await;
    let delivery = &app.state.services.delivery;

    let err = delivery
        .mark_picked_up(placed.order_id, partner)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));

    let accepted = delivery
        .partner_respond(placed.order_id, partner, true, None)
        .await
        .unwrap();
    assert_eq!(accepted.status, OrderStatus::PartnerAccepted);

    let picked = delivery.mark_picked_up(placed.order_id, partner).await.unwrap();
    assert_eq!(picked.status, OrderStatus::PickedFromStore);

    let delivered = delivery.mark_delivered(placed.order_id, partner).await.unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.delivered_at.is_some());
    assert_eq!(delivered.partner_base_fee, dec!(35));
    assert_eq!(delivered.partner_incentive, dec!(0));
    assert_eq!(delivered.partner_total, dec!(35));
    assert_eq!(deliveries_of(&app, partner).await, 1);

    let trail: Vec<DeliveryStatus> = delivery
        .delivery_history(placed.order_id)
        .await
        .unwrap()
        .iter()
        .map(|row| row.status)
        .collect();
    assert_eq!(trail.len(), 4);
    for expected in [
        DeliveryStatus::Assigned,
        DeliveryStatus::Accepted,
        DeliveryStatus::PickedUp,
        DeliveryStatus::Delivered,
    ] {
        assert!(trail.contains(&expected), "missing {:?}", expected);
    }

    let earnings = delivery
        .update_delivery_partner_earnings(placed.order_id)
        .await
        .unwrap();
    assert_eq!(earnings.delivered_today, 1);
    assert_eq!(earnings.total, dec!(35));
}

#[tokio::test]
async fn declined_orders_go_to_the_next_nearest_partner() {
    let app = TestApp::new().await;
    let nearest = app.partner_at(north_of(store_location(), 0.5)).await;
    let placed = accepted_order(&app).await;
    let delivery = &app.state.services.delivery;

    let declined = delivery
        .partner_respond(placed.order_id, nearest, false, Some("flat tyre".to_string()))
        .await
        .unwrap();
    assert_eq!(declined.status, OrderStatus::PendingReassign);
    assert!(declined.delivery_partner_id.is_none());

    let admin = Uuid::new_v4();
    let err = delivery
        .assign_delivery_partner(placed.order_id, placed.store_id, Actor::admin(admin))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let backup = app.partner_at(north_of(store_location(), 2.0)).await;
    let reassigned = delivery
        .assign_delivery_partner(placed.order_id, placed.store_id, Actor::admin(admin))
        .await
        .unwrap();
    assert_eq!(reassigned.status, OrderStatus::AssignedToPartner);
    assert_eq!(reassigned.delivery_partner_id, Some(backup));
}

#[tokio::test]
async fn unavailable_or_distant_partners_are_skipped() {
    let app = TestApp::new().await;
    let resting = app.partner_at(north_of(store_location(), 0.2)).await;
    app.state
        .services
        .people
        .set_partner_availability(resting, false)
        .await
        .unwrap();
    app.partner_at(north_of(store_location(), 8.0)).await;

    let placed = accepted_order(&app).await;
    let order = app
        .state
        .services
        .orders
        .get_order(&Actor::system(), placed.order_id)
        .await
        .unwrap()
        .order;

    assert_eq!(order.status, OrderStatus::Processing);
    assert!(order.delivery_partner_id.is_none());
}

#[tokio::test]
async fn only_the_assigned_partner_can_act() {
    let app = TestApp::new().await;
    let partner = app.partner_at(north_of(store_location(), 0.5)).await;
    let placed = accepted_order(&app).await;
    let other = app.partner_at(north_of(store_location(), 30.0)).await;
    let delivery = &app.state.services.delivery;

    let err = delivery
        .partner_respond(placed.order_id, other, true, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    delivery
        .partner_respond(placed.order_id, partner, true, None)
        .await
        .unwrap();
    let err = delivery
        .mark_picked_up(placed.order_id, other)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let seen = app
        .state
        .services
        .orders
        .get_order(&Actor::delivery_partner(partner), placed.order_id)
        .await;
    assert!(seen.is_ok());
    let err = app
        .state
        .services
        .orders
        .get_order(&Actor::delivery_partner(other), placed.order_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn tips_are_added_to_the_partner_total() {
    let app = TestApp::new().await;
    let partner = app.partner_at(north_of(store_location(), 0.5)).await;
    let placed = accepted_order(&app).await;
    let delivery = &app.state.services.delivery;
    delivery
        .partner_respond(placed.order_id, partner, true, None)
        .await
        .unwrap();
    delivery.mark_picked_up(placed.order_id, partner).await.unwrap();
    delivery.mark_delivered(placed.order_id, partner).await.unwrap();

    let earnings = delivery
        .update_order_tip(placed.order_id, placed.customer, dec!(20))
        .await
        .unwrap();
    assert_eq!(earnings.tip, dec!(20));
    assert_eq!(earnings.total, dec!(55));

    let err = delivery
        .update_order_tip(placed.order_id, placed.customer, dec!(-5))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let stranger = app.customer(None).await;
    let err = delivery
        .update_order_tip(placed.order_id, stranger, dec!(5))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn manual_assignment_requires_a_processing_order() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let product = app.product(vendor, store.id, dec!(10), 10).await;
    let customer = app.customer(None).await;
    app.partner_at(north_of(store_location(), 0.5)).await;
    let order = app
        .place_order(customer, product.id, 1, north_of(store_location(), 1.0))
        .await;

    let err = app
        .state
        .services
        .delivery
        .assign_delivery_partner(order.id, store.id, Actor::admin(Uuid::new_v4()))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InvalidStatus(_));
}
