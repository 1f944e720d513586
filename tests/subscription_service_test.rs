mod common;

use assert_matches::assert_matches;
use common::{store_location, TestApp};
use chrono::{Duration, Utc};
use marketplace_api::{
    entities::vendor_subscription::{self, SubscriptionStatus},
    errors::ServiceError,
    services::history::Actor,
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

/// Moves a subscription's end date into the past.
async fn end_yesterday(app: &TestApp, subscription: vendor_subscription::Model) {
    let mut active: vendor_subscription::ActiveModel = subscription.into();
    active.end_date = Set(Utc::now() - Duration::days(1));
    active.update(&*app.state.db).await.unwrap();
}

/// Replaces the store's free trial with a paid plan.
async fn switch_to_paid_plan(
    app: &TestApp,
    vendor: Uuid,
    store_id: Uuid,
    plan: &str,
    auto_renew: bool,
) -> vendor_subscription::Model {
    let subscriptions = &app.state.services.subscriptions;
    let trial = subscriptions
        .active_subscription(store_id)
        .await
        .unwrap()
        .unwrap();
    subscriptions
        .cancel(&Actor::vendor(vendor), trial.id)
        .await
        .unwrap();
    subscriptions
        .subscribe(vendor, store_id, plan, auto_renew)
        .await
        .unwrap()
}

#[tokio::test]
async fn plans_are_listed_with_their_commission() {
    let app = TestApp::new().await;
    let plans = app.state.services.subscriptions.list_plans();

    let names: Vec<&str> = plans.iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Free Trial", "Basic", "Standard", "Premium"]);
    let premium = plans.iter().find(|p| p.name == "Premium").unwrap();
    assert_eq!(premium.commission_percent, dec!(8));
}

#[tokio::test]
async fn approval_grants_a_single_free_trial() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let subscriptions = &app.state.services.subscriptions;

    assert_eq!(store.subscription_plan.as_deref(), Some("Free Trial"));
    let active = subscriptions
        .active_subscription(store.id)
        .await
        .unwrap()
        .unwrap();
    assert!(active.is_free_trial);
    assert_eq!(active.commission_percent, dec!(0));

    let err = subscriptions
        .grant_free_trial(vendor, store.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    // approving again does not stack a second trial
    app.state.services.stores.approve_store(store.id).await.unwrap();
    assert_eq!(subscriptions.list_for_store(store.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn a_store_holds_one_active_subscription() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let subscriptions = &app.state.services.subscriptions;

    let err = subscriptions
        .subscribe(vendor, store.id, "Basic", false)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    let err = subscriptions
        .subscribe(vendor, store.id, "Free Trial", false)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));

    let err = subscriptions
        .subscribe(vendor, store.id, "Platinum", false)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn pause_resume_and_cancel_keep_the_store_snapshot_in_sync() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let subscriptions = &app.state.services.subscriptions;
    let stores = &app.state.services.stores;
    let trial = subscriptions
        .active_subscription(store.id)
        .await
        .unwrap()
        .unwrap();
    let owner = Actor::vendor(vendor);

    let paused = subscriptions.pause(&owner, trial.id).await.unwrap();
    assert_eq!(paused.status, SubscriptionStatus::Paused);
    assert!(stores.get_store(store.id).await.unwrap().subscription_plan.is_none());

    let err = subscriptions.pause(&owner, trial.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));

    // a paused trial leaves room for a paid plan
    let standard = subscriptions
        .subscribe(vendor, store.id, "Standard", true)
        .await
        .unwrap();
    assert_eq!(standard.commission_percent, dec!(10));
    assert!(standard.auto_renew);
    assert_eq!(
        stores.get_store(store.id).await.unwrap().subscription_plan.as_deref(),
        Some("Standard")
    );

    let cancelled = subscriptions.cancel(&owner, standard.id).await.unwrap();
    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
    let err = subscriptions.renew(&owner, standard.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));

    let resumed = subscriptions.resume(&owner, trial.id).await.unwrap();
    assert_eq!(resumed.status, SubscriptionStatus::Active);
    assert_eq!(
        stores.get_store(store.id).await.unwrap().subscription_plan.as_deref(),
        Some("Free Trial")
    );
}

#[tokio::test]
async fn renewal_extends_the_period() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let subscriptions = &app.state.services.subscriptions;
    let owner = Actor::vendor(vendor);
    let trial = subscriptions
        .active_subscription(store.id)
        .await
        .unwrap()
        .unwrap();

    let err = subscriptions.renew(&owner, trial.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));

    subscriptions.cancel(&owner, trial.id).await.unwrap();
    let basic = subscriptions
        .subscribe(vendor, store.id, "Basic", false)
        .await
        .unwrap();
    let renewed = subscriptions.renew(&owner, basic.id).await.unwrap();
    assert_eq!(renewed.end_date, basic.end_date + chrono::Duration::days(30));
    assert_eq!(renewed.start_date, basic.end_date);
}

#[tokio::test]
async fn other_vendors_cannot_touch_the_subscription() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let subscriptions = &app.state.services.subscriptions;
    let trial = subscriptions
        .active_subscription(store.id)
        .await
        .unwrap()
        .unwrap();
    let intruder = app.vendor().await;

    let err = subscriptions
        .pause(&Actor::vendor(intruder), trial.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let err = subscriptions
        .subscribe(intruder, store.id, "Basic", false)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let admin = Actor::admin(Uuid::new_v4());
    let paused = subscriptions.pause(&admin, trial.id).await.unwrap();
    assert_eq!(paused.status, SubscriptionStatus::Paused);
}

#[tokio::test]
async fn commission_follows_override_then_subscription() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let product = app.product(vendor, store.id, dec!(100), 10).await;
    let subscriptions = &app.state.services.subscriptions;
    let owner = Actor::vendor(vendor);
    let trial = subscriptions
        .active_subscription(store.id)
        .await
        .unwrap()
        .unwrap();
    subscriptions.cancel(&owner, trial.id).await.unwrap();
    subscriptions
        .subscribe(vendor, store.id, "Basic", false)
        .await
        .unwrap();

    let customer = app.customer(None).await;
    let order = app
        .place_order(customer, product.id, 3, common::north_of(store_location(), 2.0))
        .await;
    assert_eq!(order.store_breakdown.0[0].commission_percent, dec!(12));
    assert_eq!(order.commission_total, dec!(36));

    app.state
        .services
        .stores
        .set_commission_override(store.id, Some(dec!(5)))
        .await
        .unwrap();
    let order = app
        .place_order(customer, product.id, 3, common::north_of(store_location(), 2.0))
        .await;
    assert_eq!(order.commission_total, dec!(15));
    assert_eq!(order.platform_total, dec!(15));
    assert_eq!(order.vendor_total, dec!(285));
}

#[tokio::test]
async fn ended_subscription_without_auto_renew_expires_lazily() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let basic = switch_to_paid_plan(&app, vendor, store.id, "Basic", false).await;
    end_yesterday(&app, basic.clone()).await;
    let subscriptions = &app.state.services.subscriptions;

    assert!(subscriptions
        .active_subscription(store.id)
        .await
        .unwrap()
        .is_none());

    let stored = vendor_subscription::Entity::find_by_id(basic.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Expired);
    let store = app.state.services.stores.get_store(store.id).await.unwrap();
    assert_eq!(store.subscription_plan.as_deref(), Some("Basic"));
    assert!(store.subscription_id.is_none());
}

#[tokio::test]
async fn ended_subscription_with_auto_renew_rolls_over() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let standard = switch_to_paid_plan(&app, vendor, store.id, "Standard", true).await;
    end_yesterday(&app, standard.clone()).await;
    let before = Utc::now();

    let renewed = app
        .state
        .services
        .subscriptions
        .active_subscription(store.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(renewed.id, standard.id);
    assert_eq!(renewed.status, SubscriptionStatus::Active);
    assert!(renewed.start_date >= before);
    assert_eq!(renewed.end_date - renewed.start_date, Duration::days(30));
}

#[tokio::test]
async fn paused_paid_plan_falls_back_to_the_plan_table_rate() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let product = app.product(vendor, store.id, dec!(100), 10).await;
    let premium = switch_to_paid_plan(&app, vendor, store.id, "Premium", false).await;

    app.state
        .services
        .subscriptions
        .pause(&Actor::vendor(vendor), premium.id)
        .await
        .unwrap();
    let snapshot = app.state.services.stores.get_store(store.id).await.unwrap();
    assert_eq!(snapshot.subscription_plan.as_deref(), Some("Premium"));

    let customer = app.customer(None).await;
    let order = app
        .place_order(customer, product.id, 3, common::north_of(store_location(), 2.0))
        .await;
    assert_eq!(order.store_breakdown.0[0].commission_percent, dec!(8));
    assert_eq!(order.commission_total, dec!(24));
}

#[tokio::test]
async fn paused_free_trial_leaves_the_default_rate() {
    let app = TestApp::new().await;
    let vendor = app.vendor().await;
    let store = app.open_store(vendor, store_location()).await;
    let product = app.product(vendor, store.id, dec!(100), 10).await;
    let subscriptions = &app.state.services.subscriptions;
    let trial = subscriptions
        .active_subscription(store.id)
        .await
        .unwrap()
        .unwrap();
    subscriptions
        .pause(&Actor::vendor(vendor), trial.id)
        .await
        .unwrap();

    let customer = app.customer(None).await;
    let order = app
        .place_order(customer, product.id, 1, common::north_of(store_location(), 2.0))
        .await;
    assert_eq!(order.store_breakdown.0[0].commission_percent, dec!(10));
}
