pub mod commerce;
pub mod counter;
pub mod customer_profile;
pub mod delivery_history;
pub mod delivery_partner;
pub mod order;
pub mod order_history;
pub mod order_item;
pub mod user;
pub mod vendor_subscription;

pub use commerce::{cart, cart_item, customer_address, product, store};
