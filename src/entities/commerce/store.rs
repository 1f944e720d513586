use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vendor storefront
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stores")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    /// `STR` followed by a 4-digit sequence
    #[sea_orm(unique)]
    pub code: String,
    pub is_approved: bool,
    pub is_open: bool,
    #[sea_orm(nullable)]
    pub latitude: Option<f64>,
    #[sea_orm(nullable)]
    pub longitude: Option<f64>,
    #[sea_orm(nullable)]
    pub delivery_radius_km: Option<f64>,
    /// Per-store commission override, in percent
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub commission_percent: Option<Decimal>,
    /// Snapshot of the current vendor subscription
    #[sea_orm(nullable)]
    pub subscription_plan: Option<String>,
    #[sea_orm(nullable)]
    pub subscription_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn location(&self) -> Option<crate::models::geo::GeoPoint> {
        crate::models::geo::GeoPoint::from_parts(self.latitude, self.longitude)
    }

    pub fn accepts_orders(&self) -> bool {
        self.is_approved && self.is_open
    }
}
