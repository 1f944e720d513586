use crate::entities::{store, user};
use crate::errors::ServiceError;
use crate::models::GeoPoint;
use crate::services::{order_number, subscriptions::SubscriptionService};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStoreInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub delivery_radius_km: Option<f64>,
}

#[derive(Clone)]
pub struct StoreService {
    db: Arc<DatabaseConnection>,
    subscriptions: SubscriptionService,
}

impl StoreService {
    pub fn new(db: Arc<DatabaseConnection>, subscriptions: SubscriptionService) -> Self {
        Self { db, subscriptions }
    }

    /// Creates an unapproved, closed store with the next `STRNNNN` code.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_store(
        &self,
        vendor_id: Uuid,
        input: CreateStoreInput,
    ) -> Result<store::Model, ServiceError> {
        input.validate()?;
        if (input.latitude.is_some() || input.longitude.is_some())
            && GeoPoint::from_parts(input.latitude, input.longitude).is_none()
        {
            return Err(ServiceError::ValidationError(
                "latitude and longitude must both be valid coordinates".to_string(),
            ));
        }
        let vendor = user::Entity::find_by_id(vendor_id)
            .one(&*self.db)
            .await?
            .filter(|u| u.role == user::UserRole::Vendor)
            .ok_or_else(|| ServiceError::NotFound("Vendor not found".to_string()))?;

        let code = order_number::next_store_code(&*self.db).await?;
        let now = Utc::now();
        let created = store::ActiveModel {
            id: Set(Uuid::new_v4()),
            vendor_id: Set(vendor.id),
            name: Set(input.name),
            code: Set(code),
            is_approved: Set(false),
            is_open: Set(false),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            delivery_radius_km: Set(input.delivery_radius_km),
            commission_percent: Set(None),
            subscription_plan: Set(None),
            subscription_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(store_id = %created.id, code = %created.code, "store created");
        Ok(created)
    }

    pub async fn get_store(&self, store_id: Uuid) -> Result<store::Model, ServiceError> {
        store::Entity::find_by_id(store_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Store not found".to_string()))
    }

    pub async fn list_vendor_stores(
        &self,
        vendor_id: Uuid,
    ) -> Result<Vec<store::Model>, ServiceError> {
        Ok(store::Entity::find()
            .filter(store::Column::VendorId.eq(vendor_id))
            .order_by_asc(store::Column::Code)
            .all(&*self.db)
            .await?)
    }

    /// Approves the store and grants the free-trial plan.
    ///
    /// The trial is best-effort: a store that already used it is still approved.
    #[instrument(skip(self))]
    pub async fn approve_store(&self, store_id: Uuid) -> Result<store::Model, ServiceError> {
        let store = self.get_store(store_id).await?;
        let vendor_id = store.vendor_id;

        let mut active: store::ActiveModel = store.into();
        active.is_approved = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        if let Err(e) = self.subscriptions.grant_free_trial(vendor_id, store_id).await {
            warn!(%store_id, error = %e, "free trial not granted");
        }

        info!(%store_id, "store approved");
        self.get_store(store_id).await
    }

    #[instrument(skip(self))]
    pub async fn set_store_open(
        &self,
        vendor_id: Uuid,
        store_id: Uuid,
        is_open: bool,
    ) -> Result<store::Model, ServiceError> {
        let store = self.get_store(store_id).await?;
        if store.vendor_id != vendor_id {
            return Err(ServiceError::Forbidden(
                "Store does not belong to this vendor".to_string(),
            ));
        }
        if is_open && !store.is_approved {
            return Err(ServiceError::InvalidOperation(
                "Store must be approved before opening".to_string(),
            ));
        }
        let mut active: store::ActiveModel = store.into();
        active.is_open = Set(is_open);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    /// Admin-only per-store commission override; `None` clears it.
    pub async fn set_commission_override(
        &self,
        store_id: Uuid,
        percent: Option<Decimal>,
    ) -> Result<store::Model, ServiceError> {
        if let Some(p) = percent {
            if p.is_sign_negative() || p > Decimal::ONE_HUNDRED {
                return Err(ServiceError::ValidationError(
                    "commission must be between 0 and 100".to_string(),
                ));
            }
        }
        let store = self.get_store(store_id).await?;
        let mut active: store::ActiveModel = store.into();
        active.commission_percent = Set(percent);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    pub async fn set_location(
        &self,
        vendor_id: Uuid,
        store_id: Uuid,
        point: GeoPoint,
    ) -> Result<store::Model, ServiceError> {
        let store = self.get_store(store_id).await?;
        if store.vendor_id != vendor_id {
            return Err(ServiceError::Forbidden(
                "Store does not belong to this vendor".to_string(),
            ));
        }
        let mut active: store::ActiveModel = store.into();
        active.latitude = Set(Some(point.latitude));
        active.longitude = Set(Some(point.longitude));
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }
}
