pub mod admin;
pub mod carts;
pub mod common;
pub mod delivery;
pub mod orders;
pub mod people;
pub mod stores;
pub mod subscriptions;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    fees::FeePolicy, geocoding::Geocoder, CartService, DeliveryService, OrderService,
    PeopleService, ProductService, StoreService, SubscriptionService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub people: Arc<PeopleService>,
    pub stores: Arc<StoreService>,
    pub products: Arc<ProductService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub cart: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub delivery: Arc<DeliveryService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let marketplace = &config.marketplace;
        let policy = FeePolicy::from(marketplace);

        let subscriptions = SubscriptionService::new(db_pool.clone(), event_sender.clone());
        let delivery = DeliveryService::new(
            db_pool.clone(),
            event_sender.clone(),
            marketplace.partner_search_radius_km,
        );
        let orders = OrderService::new(
            db_pool.clone(),
            event_sender,
            policy.clone(),
            subscriptions.clone(),
            delivery.clone(),
            geocoder,
            marketplace.order_number_attempts,
        );

        Self {
            people: Arc::new(PeopleService::new(db_pool.clone())),
            stores: Arc::new(StoreService::new(db_pool.clone(), subscriptions.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            cart: Arc::new(CartService::new(db_pool, policy)),
            subscriptions: Arc::new(subscriptions),
            orders: Arc::new(orders),
            delivery: Arc::new(delivery),
        }
    }
}
