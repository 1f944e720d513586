use crate::entities::{
    delivery_history::{self, DeliveryStatus},
    order_history::{self, ActorRole, HistoryStatus},
};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

/// Who performed a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Option<Uuid>,
    pub role: ActorRole,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            id: None,
            role: ActorRole::System,
        }
    }

    pub fn customer(id: Uuid) -> Self {
        Self {
            id: Some(id),
            role: ActorRole::Customer,
        }
    }

    pub fn vendor(id: Uuid) -> Self {
        Self {
            id: Some(id),
            role: ActorRole::Vendor,
        }
    }

    pub fn delivery_partner(id: Uuid) -> Self {
        Self {
            id: Some(id),
            role: ActorRole::DeliveryPartner,
        }
    }

    pub fn admin(id: Uuid) -> Self {
        Self {
            id: Some(id),
            role: ActorRole::Admin,
        }
    }
}

/// Entry to append to an order's history
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub order_id: Uuid,
    pub store_id: Option<Uuid>,
    pub status: HistoryStatus,
    pub note: Option<String>,
    pub actor: Actor,
}

impl HistoryEntry {
    pub fn new(order_id: Uuid, status: HistoryStatus, actor: Actor) -> Self {
        Self {
            order_id,
            store_id: None,
            status,
            note: None,
            actor,
        }
    }

    pub fn for_store(mut self, store_id: Uuid) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Appends one row to the order history. There is no update path.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    entry: HistoryEntry,
) -> Result<order_history::Model, ServiceError> {
    let row = order_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(entry.order_id),
        store_id: Set(entry.store_id),
        status: Set(entry.status),
        note: Set(entry.note),
        changed_by: Set(entry.actor.id),
        actor_role: Set(entry.actor.role),
        created_at: Set(Utc::now()),
    };
    Ok(row.insert(conn).await?)
}

pub async fn record_delivery<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    partner_id: Uuid,
    status: DeliveryStatus,
    note: Option<String>,
) -> Result<delivery_history::Model, ServiceError> {
    let row = delivery_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        delivery_partner_id: Set(partner_id),
        status: Set(status),
        note: Set(note),
        created_at: Set(Utc::now()),
    };
    Ok(row.insert(conn).await?)
}

/// History of an order, oldest first; optionally only one store's entries
/// (store-scoped entries plus global ones).
pub async fn order_history<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    store_id: Option<Uuid>,
) -> Result<Vec<order_history::Model>, ServiceError> {
    let mut query = order_history::Entity::find()
        .filter(order_history::Column::OrderId.eq(order_id));
    if let Some(store_id) = store_id {
        query = query.filter(
            order_history::Column::StoreId
                .eq(store_id)
                .or(order_history::Column::StoreId.is_null()),
        );
    }
    Ok(query
        .order_by_asc(order_history::Column::CreatedAt)
        .all(conn)
        .await?)
}

pub async fn delivery_history<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<delivery_history::Model>, ServiceError> {
    Ok(delivery_history::Entity::find()
        .filter(delivery_history::Column::OrderId.eq(order_id))
        .order_by_asc(delivery_history::Column::CreatedAt)
        .all(conn)
        .await?)
}
