use crate::entities::{
    product::{self, StockStatus},
    store,
};
use crate::errors::ServiceError;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub image_url: Option<String>,
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

/// Checks that `requested` units of a product can be bought right now.
///
/// Used both when mutating a cart and when converting it into an order.
pub fn ensure_purchasable(
    product: Option<&product::Model>,
    store: Option<&store::Model>,
    requested: i32,
) -> Result<(), ServiceError> {
    let product = product
        .filter(|p| !p.is_deleted())
        .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;
    if !product.is_active {
        return Err(ServiceError::InvalidOperation(format!(
            "{} is not available",
            product.name
        )));
    }
    let store = store.ok_or_else(|| ServiceError::NotFound("Store not found".to_string()))?;
    if !store.is_approved {
        return Err(ServiceError::InvalidOperation(format!(
            "Store {} is not approved",
            store.name
        )));
    }
    if !store.is_open {
        return Err(ServiceError::InvalidOperation(format!(
            "Store {} is currently closed",
            store.name
        )));
    }
    if requested > product.quantity {
        return Err(ServiceError::InsufficientStock(format!(
            "Only {} units of {} available",
            product.quantity.max(0),
            product.name
        )));
    }
    Ok(())
}

/// Loads a product together with its store.
pub async fn load_with_store<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<(Option<product::Model>, Option<store::Model>), ServiceError> {
    let product = product::Entity::find_by_id(product_id).one(conn).await?;
    let store = match &product {
        Some(p) => store::Entity::find_by_id(p.store_id).one(conn).await?,
        None => None,
    };
    Ok((product, store))
}

/// Re-derives the stock status from the stored quantity.
async fn refresh_status<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<product::Model, ServiceError> {
    let current = product::Entity::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

    let derived = StockStatus::from_quantity(current.quantity);
    if derived == current.status {
        return Ok(current);
    }
    let mut active: product::ActiveModel = current.into();
    active.status = Set(derived);
    Ok(active.update(conn).await?)
}

/// Takes `quantity` units out of stock with a single conditional update.
///
/// Fails with `InsufficientStock` when fewer units remain, leaving the row
/// untouched.
pub async fn reserve_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
    name: &str,
) -> Result<product::Model, ServiceError> {
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::Quantity,
            Expr::col(product::Column::Quantity).sub(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::Quantity.gte(quantity))
        .filter(product::Column::DeletedAt.is_null())
        .exec(conn)
        .await?;

    if result.rows_affected != 1 {
        return Err(ServiceError::InsufficientStock(format!(
            "{} is out of stock for the requested quantity",
            name
        )));
    }
    refresh_status(conn, product_id).await
}

/// Puts units back, e.g. when an order is cancelled.
pub async fn restore_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    product::Entity::update_many()
        .col_expr(
            product::Column::Quantity,
            Expr::col(product::Column::Quantity).add(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .exec(conn)
        .await?;
    refresh_status(conn, product_id).await.map(|_| ())
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn owned_store(&self, vendor_id: Uuid, store_id: Uuid) -> Result<store::Model, ServiceError> {
        let store = store::Entity::find_by_id(store_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Store not found".to_string()))?;
        if store.vendor_id != vendor_id {
            return Err(ServiceError::Forbidden(
                "Store does not belong to this vendor".to_string(),
            ));
        }
        Ok(store)
    }

    async fn owned_product(
        &self,
        vendor_id: Uuid,
        product_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        let product = self.get_product(product_id).await?;
        if product.vendor_id != vendor_id {
            return Err(ServiceError::Forbidden(
                "Product does not belong to this vendor".to_string(),
            ));
        }
        Ok(product)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        vendor_id: Uuid,
        store_id: Uuid,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        if input.price.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "price cannot be negative".to_string(),
            ));
        }
        let store = self.owned_store(vendor_id, store_id).await?;

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store.id),
            vendor_id: Set(vendor_id),
            name: Set(input.name),
            image_url: Set(input.image_url),
            price: Set(input.price),
            quantity: Set(input.quantity),
            status: Set(StockStatus::from_quantity(input.quantity)),
            is_active: Set(true),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(product_id = %model.id, store_id = %store.id, "product created");
        Ok(model)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    pub async fn list_store_products(
        &self,
        store_id: Uuid,
    ) -> Result<Vec<product::Model>, ServiceError> {
        Ok(product::Entity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::DeletedAt.is_null())
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Sets the on-hand quantity; status follows.
    #[instrument(skip(self))]
    pub async fn update_stock(
        &self,
        vendor_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<product::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "quantity cannot be negative".to_string(),
            ));
        }
        let product = self.owned_product(vendor_id, product_id).await?;

        let mut active: product::ActiveModel = product.into();
        active.quantity = Set(quantity);
        active.status = Set(StockStatus::from_quantity(quantity));
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    pub async fn set_active(
        &self,
        vendor_id: Uuid,
        product_id: Uuid,
        is_active: bool,
    ) -> Result<product::Model, ServiceError> {
        let product = self.owned_product(vendor_id, product_id).await?;
        let mut active: product::ActiveModel = product.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn soft_delete_product(
        &self,
        vendor_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        let product = self.owned_product(vendor_id, product_id).await?;
        let mut active: product::ActiveModel = product.into();
        let now = Utc::now();
        active.deleted_at = Set(Some(now));
        active.is_active = Set(false);
        active.updated_at = Set(now);
        active.update(&*self.db).await?;
        info!(%product_id, "product soft-deleted");
        Ok(())
    }
}
