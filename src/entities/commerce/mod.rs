//! Catalogue and shopping entities.

pub mod cart;
pub mod cart_item;
pub mod customer_address;
pub mod product;
pub mod store;

pub use cart::{CartStatus, Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use customer_address::{Entity as CustomerAddress, Model as CustomerAddressModel};
pub use product::{Entity as Product, Model as ProductModel, StockStatus};
pub use store::{Entity as Store, Model as StoreModel};
