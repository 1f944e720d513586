use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order: a priced snapshot of the cart at purchase time. Never hard-deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub tax: Decimal,
    /// Delivery fee actually charged to the customer
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub delivery_charge: Decimal,
    /// Full delivery fee before any split
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub delivery_fee_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub commission_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub vendor_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub platform_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub cashback_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub partner_base_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub partner_incentive: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub partner_tip: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub partner_total: Decimal,
    #[sea_orm(nullable)]
    pub distance_km: Option<f64>,
    #[sea_orm(column_type = "Json")]
    pub store_breakdown: StoreBreakdowns,
    #[sea_orm(column_type = "Json", nullable)]
    pub delivery_address: Option<DeliveryAddress>,
    #[sea_orm(nullable)]
    pub delivery_partner_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::order_history::Entity")]
    History,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::order_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn store_ids(&self) -> Vec<Uuid> {
        self.store_breakdown.0.iter().map(|b| b.store_id).collect()
    }

    pub fn includes_store(&self, store_id: Uuid) -> bool {
        self.store_breakdown.0.iter().any(|b| b.store_id == store_id)
    }
}

/// Per-store financial breakdown stored with the order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreBreakdown {
    pub store_id: Uuid,
    pub vendor_id: Uuid,
    pub subtotal: Decimal,
    pub tax: Decimal,
    /// Full slab fee for this store's leg
    pub delivery_fee: Decimal,
    /// Part of the fee charged to the customer
    pub shipping: Decimal,
    pub customer_delivery_share: Decimal,
    pub vendor_delivery_share: Decimal,
    pub platform_delivery_share: Decimal,
    pub distance_km: Option<f64>,
    pub commission_percent: Decimal,
    pub commission_amount: Decimal,
    pub vendor_share: Decimal,
    pub platform_share: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct StoreBreakdowns(pub Vec<StoreBreakdown>);

/// Address snapshot captured when the order was placed
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct DeliveryAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_id: Option<Uuid>,
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl DeliveryAddress {
    pub fn location(&self) -> Option<crate::models::geo::GeoPoint> {
        crate::models::geo::GeoPoint::from_parts(self.latitude, self.longitude)
    }
}

/// Order lifecycle status
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PROCESSING")]
    Processing,
    #[sea_orm(string_value = "ASSIGNED_TO_PARTNER")]
    AssignedToPartner,
    #[sea_orm(string_value = "PARTNER_ACCEPTED")]
    PartnerAccepted,
    #[sea_orm(string_value = "PENDING_REASSIGN")]
    PendingReassign,
    #[sea_orm(string_value = "PICKED_FROM_STORE")]
    PickedFromStore,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "FAILED")]
    Failed,
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
}
