pub mod cart;
pub mod delivery;
pub mod fees;
pub mod geocoding;
pub mod history;
pub mod notifications;
pub mod order_number;
pub mod order_status;
pub mod orders;
pub mod people;
pub mod products;
pub mod side_effects;
pub mod stores;
pub mod subscriptions;

pub use cart::CartService;
pub use delivery::DeliveryService;
pub use orders::OrderService;
pub use people::PeopleService;
pub use products::ProductService;
pub use stores::StoreService;
pub use subscriptions::SubscriptionService;
