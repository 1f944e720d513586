use crate::entities::{
    cart::{self, CartStatus},
    cart_item, product,
};
use crate::errors::ServiceError;
use crate::services::fees::{percent_of, round_money, FeePolicy};
use crate::services::products::{ensure_purchasable, load_with_store};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Missing, zero or negative quantities count as one unit.
pub fn coerce_quantity(quantity: Option<i64>) -> i32 {
    match quantity {
        Some(q) if q > 0 => i32::try_from(q).unwrap_or(i32::MAX),
        _ => 1,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLineView {
    pub product_id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    /// False when the product was deleted or deactivated after it was added
    pub available: bool,
}

/// Cart with totals computed from current product prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartView {
    pub cart_id: Option<Uuid>,
    pub items: Vec<CartLineView>,
    pub item_count: i32,
    pub sub_total: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
}

impl CartView {
    fn empty(cart_id: Option<Uuid>) -> Self {
        Self {
            cart_id,
            items: Vec::new(),
            item_count: 0,
            sub_total: Decimal::ZERO,
            tax: Decimal::ZERO,
            grand_total: Decimal::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The user's cart and its lines in insertion order.
pub async fn load_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Option<(cart::Model, Vec<cart_item::Model>)>, ServiceError> {
    let Some(cart) = cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(conn)
        .await?
    else {
        return Ok(None);
    };
    let items = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .order_by_asc(cart_item::Column::Position)
        .all(conn)
        .await?;
    Ok(Some((cart, items)))
}

/// Empties a cart without deleting it.
pub async fn clear_cart_items<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> Result<u64, ServiceError> {
    let result = cart_item::Entity::delete_many()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    policy: FeePolicy,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, policy: FeePolicy) -> Self {
        Self { db, policy }
    }

    /// Finds the user's cart or creates it; concurrent first adds converge on one row.
    async fn upsert_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<cart::Model, ServiceError> {
        let now = Utc::now();
        cart::Entity::insert(cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            status: Set(CartStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::column(cart::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

        let cart = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::InternalError("cart upsert lost".to_string()))?;

        if cart.status == CartStatus::Active {
            return Ok(cart);
        }
        let mut active: cart::ActiveModel = cart.into();
        active.status = Set(CartStatus::Active);
        active.updated_at = Set(now);
        Ok(active.update(conn).await?)
    }

    /// Adds units of a product, summing with an existing line.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: Option<i64>,
    ) -> Result<CartView, ServiceError> {
        let quantity = coerce_quantity(quantity);
        let txn = self.db.begin().await?;

        let (product, store) = load_with_store(&txn, product_id).await?;
        let cart = Self::upsert_cart(&txn, user_id).await?;

        let existing = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;
        let wanted = existing
            .as_ref()
            .map(|item| item.quantity.saturating_add(quantity))
            .unwrap_or(quantity);
        ensure_purchasable(product.as_ref(), store.as_ref(), wanted)?;
        let product = product.ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let now = Utc::now();
        match existing {
            Some(item) => {
                let mut active: cart_item::ActiveModel = item.into();
                active.quantity = Set(wanted);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
            None => {
                let last_position = cart_item::Entity::find()
                    .filter(cart_item::Column::CartId.eq(cart.id))
                    .order_by_desc(cart_item::Column::Position)
                    .one(&txn)
                    .await?
                    .map(|item| item.position)
                    .unwrap_or(0);
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    product_id: Set(product.id),
                    store_id: Set(product.store_id),
                    quantity: Set(wanted),
                    name: Set(product.name.clone()),
                    image_url: Set(product.image_url.clone()),
                    position: Set(last_position + 1),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?;
            }
        }

        let mut touched: cart::ActiveModel = cart.into();
        touched.updated_at = Set(now);
        touched.update(&txn).await?;
        txn.commit().await?;

        info!(%user_id, %product_id, quantity = wanted, "cart line updated");
        self.get_cart(user_id).await
    }

    /// Current cart; an empty view when the user has none yet.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let Some((cart, items)) = load_cart(&*self.db, user_id).await? else {
            return Ok(CartView::empty(None));
        };
        if items.is_empty() {
            return Ok(CartView::empty(Some(cart.id)));
        }

        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut view = CartView::empty(Some(cart.id));
        for item in items {
            let current = products
                .get(&item.product_id)
                .filter(|p| !p.is_deleted() && p.is_active);
            let unit_price = current.map(|p| p.price).unwrap_or(Decimal::ZERO);
            let line_total = round_money(unit_price * Decimal::from(item.quantity));
            if current.is_some() {
                view.sub_total += line_total;
                view.item_count += item.quantity;
            }
            view.items.push(CartLineView {
                product_id: item.product_id,
                store_id: item.store_id,
                name: item.name,
                image_url: item.image_url,
                quantity: item.quantity,
                unit_price,
                line_total,
                available: current.is_some(),
            });
        }
        view.tax = percent_of(view.sub_total, self.policy.tax_percent);
        view.grand_total = view.sub_total + view.tax;
        Ok(view)
    }

    async fn find_line(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        let cart = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;
        cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not found in cart".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<CartView, ServiceError> {
        let line = self.find_line(user_id, product_id).await?;
        cart_item::Entity::delete_by_id(line.id).exec(&*self.db).await?;
        info!(%user_id, %product_id, "cart line removed");
        self.get_cart(user_id).await
    }

    /// Sets a line's quantity; zero or less removes the line.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<CartView, ServiceError> {
        if quantity <= 0 {
            return self.remove_item(user_id, product_id).await;
        }
        let line = self.find_line(user_id, product_id).await?;
        let quantity = coerce_quantity(Some(quantity));
        let (product, store) = load_with_store(&*self.db, product_id).await?;
        ensure_purchasable(product.as_ref(), store.as_ref(), quantity)?;

        let mut active: cart_item::ActiveModel = line.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        self.get_cart(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let cart = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;
        let removed = clear_cart_items(&*self.db, cart.id).await?;
        info!(%user_id, removed, "cart cleared");
        Ok(CartView::empty(Some(cart.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, 1)]
    #[case(Some(0), 1)]
    #[case(Some(-4), 1)]
    #[case(Some(3), 3)]
    #[case(Some(i64::MAX), i32::MAX)]
    fn quantities_are_coerced(#[case] input: Option<i64>, #[case] expected: i32) {
        assert_eq!(coerce_quantity(input), expected);
    }
}
