mod common;

use assert_matches::assert_matches;
use common::{store_location, TestApp};
use marketplace_api::errors::ServiceError;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn adding_the_same_product_sums_quantities() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let product = app.product(vendor, store.id, dec!(40), 10).await;
    let customer = app.customer(None).await;
    let cart = &app.state.services.cart;

    cart.add_to_cart(customer, product.id, Some(2)).await.unwrap();
    let view = cart.add_to_cart(customer, product.id, Some(3)).await.unwrap();

    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 5);
    assert_eq!(view.item_count, 5);
    assert_eq!(view.sub_total, dec!(200));
    assert_eq!(view.grand_total, dec!(200));
}

#[tokio::test]
async fn missing_or_non_positive_quantity_adds_one_unit() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let product = app.product(vendor, store.id, dec!(10), 10).await;
    let customer = app.customer(None).await;
    let cart = &app.state.services.cart;

    cart.add_to_cart(customer, product.id, None).await.unwrap();
    let view = cart.add_to_cart(customer, product.id, Some(-3)).await.unwrap();

    assert_eq!(view.items[0].quantity, 2);
}

#[tokio::test]
async fn adding_beyond_stock_is_rejected() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let product = app.product(vendor, store.id, dec!(10), 3).await;
    let customer = app.customer(None).await;
    let cart = &app.state.services.cart;

    cart.add_to_cart(customer, product.id, Some(2)).await.unwrap();
    let err = cart
        .add_to_cart(customer, product.id, Some(2))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(_));
    let view = cart.get_cart(customer).await.unwrap();
    assert_eq!(view.items[0].quantity, 2);
}

#[tokio::test]
async fn closed_store_products_cannot_be_added() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let product = app.product(vendor, store.id, dec!(10), 3).await;
    app.state
        .services
        .stores
        .set_store_open(vendor, store.id, false)
        .await
        .unwrap();
    let customer = app.customer(None).await;

    let err = app
        .state
        .services
        .cart
        .add_to_cart(customer, product.id, Some(1))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let customer = app.customer(None).await;

    let err = app
        .state
        .services
        .cart
        .add_to_cart(customer, Uuid::new_v4(), Some(1))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn deactivated_products_stay_listed_but_leave_the_totals() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let apples = app.product(vendor, store.id, dec!(30), 10).await;
    let pears = app.product(vendor, store.id, dec!(20), 10).await;
    let customer = app.customer(None).await;
    let cart = &app.state.services.cart;

    cart.add_to_cart(customer, apples.id, Some(1)).await.unwrap();
    cart.add_to_cart(customer, pears.id, Some(2)).await.unwrap();
    app.state
        .services
        .products
        .set_active(vendor, pears.id, false)
        .await
        .unwrap();

    let view = cart.get_cart(customer).await.unwrap();
    assert_eq!(view.items.len(), 2);
    assert!(view.items[0].available);
    assert!(!view.items[1].available);
    assert_eq!(view.sub_total, dec!(30));
    assert_eq!(view.item_count, 1);
}

#[tokio::test]
async fn zero_quantity_update_removes_the_line() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let product = app.product(vendor, store.id, dec!(10), 10).await;
    let customer = app.customer(None).await;
    let cart = &app.state.services.cart;

    cart.add_to_cart(customer, product.id, Some(4)).await.unwrap();
    let view = cart
        .update_item_quantity(customer, product.id, 0)
        .await
        .unwrap();

    assert!(view.is_empty());
    let err = cart.remove_item(customer, product.id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(msg) if msg == "Item not found in cart");
}

#[tokio::test]
async fn clearing_keeps_the_cart_row() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let product = app.product(vendor, store.id, dec!(10), 10).await;
    let customer = app.customer(None).await;
    let cart = &app.state.services.cart;

    let before = cart.add_to_cart(customer, product.id, Some(1)).await.unwrap();
    let cleared = cart.clear_cart(customer).await.unwrap();

    assert!(cleared.is_empty());
    assert_eq!(cleared.cart_id, before.cart_id);

    let err = cart.clear_cart(Uuid::new_v4()).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(msg) if msg == "Cart not found");
}
