use crate::entities::{
    delivery_history::{self, DeliveryStatus},
    delivery_partner,
    order::{self, OrderStatus},
    order_history::HistoryStatus,
    store, user,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::GeoPoint;
use crate::services::fees::{self, round_money};
use crate::services::history::{self, Actor, HistoryEntry};
use crate::services::order_status::{transition, PartnerChange};
use chrono::{Duration, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A partner picked for a pickup and their distance from the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyPartner {
    pub partner: delivery_partner::Model,
    pub distance_km: f64,
}

/// Picks the strictly nearest candidate within `radius_km`; ties keep the
/// first candidate seen.
pub fn nearest_within(
    origin: GeoPoint,
    candidates: impl IntoIterator<Item = delivery_partner::Model>,
    radius_km: f64,
) -> Option<NearbyPartner> {
    let mut best: Option<NearbyPartner> = None;
    for partner in candidates {
        let Some(location) = GeoPoint::from_parts(partner.latitude, partner.longitude) else {
            continue;
        };
        let distance_km = origin.distance_km(&location);
        if distance_km > radius_km {
            continue;
        }
        if best.as_ref().map_or(true, |b| distance_km < b.distance_km) {
            best = Some(NearbyPartner {
                partner,
                distance_km,
            });
        }
    }
    best
}

/// Partner earnings for an order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Earnings {
    pub order_id: Uuid,
    pub base_fee: Decimal,
    pub incentive: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
    pub delivered_today: u64,
}

#[derive(Clone)]
pub struct DeliveryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    search_radius_km: f64,
}

impl DeliveryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>, search_radius_km: f64) -> Self {
        Self {
            db,
            event_sender,
            search_radius_km,
        }
    }

    async fn load_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    /// Nearest available partner with a known location within the search radius.
    #[instrument(skip(self))]
    pub async fn find_nearby_delivery_partner(
        &self,
        store_location: GeoPoint,
    ) -> Result<Option<NearbyPartner>, ServiceError> {
        self.nearest_excluding(store_location, &HashSet::new()).await
    }

    async fn nearest_excluding(
        &self,
        origin: GeoPoint,
        excluded: &HashSet<Uuid>,
    ) -> Result<Option<NearbyPartner>, ServiceError> {
        let active_users: HashSet<Uuid> = user::Entity::find()
            .filter(user::Column::Role.eq(user::UserRole::DeliveryPartner))
            .filter(user::Column::IsActive.eq(true))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();

        let candidates = delivery_partner::Entity::find()
            .filter(delivery_partner::Column::IsAvailable.eq(true))
            .filter(delivery_partner::Column::Latitude.is_not_null())
            .filter(delivery_partner::Column::Longitude.is_not_null())
            .all(&*self.db)
            .await?
            .into_iter()
            .filter(|p| active_users.contains(&p.user_id) && !excluded.contains(&p.user_id));

        Ok(nearest_within(origin, candidates, self.search_radius_km))
    }

    /// Assigns the nearest partner to the pickup at `store_id`.
    ///
    /// Works for orders that are PROCESSING or waiting for reassignment after
    /// a partner declined. Partners who already declined this order are skipped.
    #[instrument(skip(self, actor))]
    pub async fn assign_delivery_partner(
        &self,
        order_id: Uuid,
        store_id: Uuid,
        actor: Actor,
    ) -> Result<order::Model, ServiceError> {
        let order = self.load_order(order_id).await?;
        if !matches!(
            order.status,
            OrderStatus::Processing | OrderStatus::PendingReassign
        ) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot assign a partner to an order that is {}",
                order.status
            )));
        }
        if !order.includes_store(store_id) {
            return Err(ServiceError::ValidationError(
                "Store is not part of this order".to_string(),
            ));
        }
        let store = store::Entity::find_by_id(store_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Store not found".to_string()))?;
        let location = store.location().ok_or_else(|| {
            ServiceError::InvalidOperation(format!("Store {} has no location", store.name))
        })?;

        let declined: HashSet<Uuid> = delivery_history::Entity::find()
            .filter(delivery_history::Column::OrderId.eq(order_id))
            .filter(delivery_history::Column::Status.eq(DeliveryStatus::Rejected))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|row| row.delivery_partner_id)
            .collect();

        let Some(nearby) = self.nearest_excluding(location, &declined).await? else {
            warn!(%order_id, %store_id, "no delivery partner within range");
            counter!("marketplace_delivery.assignment_misses", 1);
            return Err(ServiceError::NotFound(
                "No delivery partner available nearby".to_string(),
            ));
        };
        let partner_id = nearby.partner.user_id;

        let txn = self.db.begin().await?;
        let updated = transition(
            &txn,
            order_id,
            order.status,
            OrderStatus::AssignedToPartner,
            PartnerChange::Assign(partner_id),
            None,
        )
        .await?;
        history::record(
            &txn,
            HistoryEntry::new(order_id, HistoryStatus::AssignedToPartner, actor)
                .for_store(store_id)
                .with_note(format!("{:.2} km from store", nearby.distance_km)),
        )
        .await?;
        history::record_delivery(&txn, order_id, partner_id, DeliveryStatus::Assigned, None).await?;
        txn.commit().await?;

        info!(%order_id, %partner_id, distance_km = nearby.distance_km, "delivery partner assigned");
        counter!("marketplace_delivery.assigned", 1);
        self.event_sender
            .send_or_log(Event::PartnerAssigned {
                order_id,
                partner_id,
                store_id,
            })
            .await;
        self.status_changed(&order, updated.status).await;
        Ok(updated)
    }

    fn ensure_assigned(order: &order::Model, partner_id: Uuid) -> Result<(), ServiceError> {
        if order.delivery_partner_id != Some(partner_id) {
            return Err(ServiceError::Forbidden(
                "Order is not assigned to this delivery partner".to_string(),
            ));
        }
        Ok(())
    }

    /// Accept keeps the assignment; reject clears it and parks the order
    /// for reassignment.
    #[instrument(skip(self))]
    pub async fn partner_respond(
        &self,
        order_id: Uuid,
        partner_id: Uuid,
        accept: bool,
        note: Option<String>,
    ) -> Result<order::Model, ServiceError> {
        let order = self.load_order(order_id).await?;
        Self::ensure_assigned(&order, partner_id)?;
        if order.status != OrderStatus::AssignedToPartner {
            return Err(ServiceError::InvalidStatus(format!(
                "Order is {}, not awaiting a partner response",
                order.status
            )));
        }

        let (to, change, history_status, delivery_status) = if accept {
            (
                OrderStatus::PartnerAccepted,
                PartnerChange::Keep,
                HistoryStatus::PartnerAccepted,
                DeliveryStatus::Accepted,
            )
        } else {
            (
                OrderStatus::PendingReassign,
                PartnerChange::Clear,
                HistoryStatus::PartnerRejected,
                DeliveryStatus::Rejected,
            )
        };

        let txn = self.db.begin().await?;
        let updated = transition(&txn, order_id, order.status, to, change, None).await?;
        let mut entry = HistoryEntry::new(order_id, history_status, Actor::delivery_partner(partner_id));
        if let Some(note) = note.clone() {
            entry = entry.with_note(note);
        }
        history::record(&txn, entry).await?;
        history::record_delivery(&txn, order_id, partner_id, delivery_status, note).await?;
        txn.commit().await?;

        info!(%order_id, %partner_id, accept, "partner responded");
        self.status_changed(&order, updated.status).await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn mark_picked_up(&self, order_id: Uuid, partner_id: Uuid) -> Result<order::Model, ServiceError> {
        let order = self.load_order(order_id).await?;
        Self::ensure_assigned(&order, partner_id)?;

        let txn = self.db.begin().await?;
        let updated = transition(
            &txn,
            order_id,
            order.status,
            OrderStatus::PickedFromStore,
            PartnerChange::Keep,
            None,
        )
        .await?;
        history::record(
            &txn,
            HistoryEntry::new(order_id, HistoryStatus::PickedFromStore, Actor::delivery_partner(partner_id)),
        )
        .await?;
        history::record_delivery(&txn, order_id, partner_id, DeliveryStatus::PickedUp, None).await?;
        txn.commit().await?;

        self.status_changed(&order, updated.status).await;
        Ok(updated)
    }

    /// Completes the delivery, bumps the partner's lifetime counter and
    /// recomputes their earnings for the order.
    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: Uuid, partner_id: Uuid) -> Result<order::Model, ServiceError> {
        let order = self.load_order(order_id).await?;
        Self::ensure_assigned(&order, partner_id)?;
        let delivered_at = Utc::now();

        let txn = self.db.begin().await?;
        transition(
            &txn,
            order_id,
            order.status,
            OrderStatus::Delivered,
            PartnerChange::Keep,
            Some(delivered_at),
        )
        .await?;
        delivery_partner::Entity::update_many()
            .col_expr(
                delivery_partner::Column::TotalDeliveries,
                Expr::col(delivery_partner::Column::TotalDeliveries).add(1),
            )
            .col_expr(delivery_partner::Column::UpdatedAt, Expr::value(delivered_at))
            .filter(delivery_partner::Column::UserId.eq(partner_id))
            .exec(&txn)
            .await?;
        history::record(
            &txn,
            HistoryEntry::new(order_id, HistoryStatus::Delivered, Actor::delivery_partner(partner_id)),
        )
        .await?;
        history::record_delivery(&txn, order_id, partner_id, DeliveryStatus::Delivered, None).await?;
        recompute_earnings(&txn, order_id).await?;
        txn.commit().await?;

        counter!("marketplace_orders.delivered", 1);
        self.event_sender
            .send_or_log(Event::OrderDelivered {
                order_id,
                customer_id: order.customer_id,
                partner_id,
                delivered_at,
            })
            .await;
        self.status_changed(&order, OrderStatus::Delivered).await;
        self.load_order(order_id).await
    }

    /// Recomputes incentive and total from the stored base fee and tip.
    #[instrument(skip(self))]
    pub async fn update_delivery_partner_earnings(&self, order_id: Uuid) -> Result<Earnings, ServiceError> {
        recompute_earnings(&*self.db, order_id).await
    }

    /// Sets the customer's tip and recomputes the partner total.
    #[instrument(skip(self))]
    pub async fn update_order_tip(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
        tip: Decimal,
    ) -> Result<Earnings, ServiceError> {
        if tip.is_sign_negative() {
            return Err(ServiceError::ValidationError("Tip cannot be negative".to_string()));
        }
        let order = self.load_order(order_id).await?;
        if order.customer_id != customer_id {
            return Err(ServiceError::Forbidden(
                "Order belongs to another customer".to_string(),
            ));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(ServiceError::InvalidStatus(
                "Cannot tip a cancelled order".to_string(),
            ));
        }

        let mut active: order::ActiveModel = order.into();
        active.partner_tip = Set(round_money(tip));
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        recompute_earnings(&*self.db, order_id).await
    }

    pub async fn delivery_history(&self, order_id: Uuid) -> Result<Vec<delivery_history::Model>, ServiceError> {
        history::delivery_history(&*self.db, order_id).await
    }

    async fn status_changed(&self, before: &order::Model, new_status: OrderStatus) {
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id: before.id,
                customer_id: before.customer_id,
                old_status: before.status,
                new_status,
            })
            .await;
    }
}

/// Orders delivered today by the order's partner decide the incentive;
/// base fee and tip come from the row.
pub async fn recompute_earnings<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> Result<Earnings, ServiceError> {
    let order = order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

    let delivered_today = match (order.delivery_partner_id, order.delivered_at) {
        (Some(partner_id), Some(at)) => {
            let day_start = at
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|t| t.and_utc())
                .unwrap_or(at);
            order::Entity::find()
                .filter(order::Column::DeliveryPartnerId.eq(partner_id))
                .filter(order::Column::Status.eq(OrderStatus::Delivered))
                .filter(order::Column::DeliveredAt.gte(day_start))
                .filter(order::Column::DeliveredAt.lt(day_start + Duration::days(1)))
                .count(conn)
                .await?
        }
        _ => 0,
    };

    let incentive = fees::partner_incentive(delivered_today);
    let total = fees::partner_total(order.partner_base_fee, incentive, order.partner_tip);
    let earnings = Earnings {
        order_id,
        base_fee: order.partner_base_fee,
        incentive,
        tip: order.partner_tip,
        total,
        delivered_today,
    };

    if order.partner_incentive != incentive || order.partner_total != total {
        let mut active: order::ActiveModel = order.into();
        active.partner_incentive = Set(incentive);
        active.partner_total = Set(total);
        active.update(conn).await?;
    }
    Ok(earnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partner(lat: Option<f64>, lon: Option<f64>) -> delivery_partner::Model {
        let now = Utc::now();
        delivery_partner::Model {
            user_id: Uuid::new_v4(),
            is_available: true,
            latitude: lat,
            longitude: lon,
            vehicle: None,
            total_deliveries: 0,
            location_updated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn picks_the_nearest_partner_in_range() {
        let store = GeoPoint::new(12.9716, 77.5946);
        let far = partner(Some(13.0), Some(77.5946)); // ~3.2 km
        let near = partner(Some(12.98), Some(77.5946)); // ~0.9 km
        let out_of_range = partner(Some(13.1), Some(77.5946));
        let unknown = partner(None, None);
        let near_id = near.user_id;

        let found = nearest_within(store, vec![far, out_of_range, near, unknown], 5.0).unwrap();
        assert_eq!(found.partner.user_id, near_id);
        assert!(found.distance_km < 1.0);
    }

    #[test]
    fn nobody_within_radius() {
        let store = GeoPoint::new(0.0, 0.0);
        assert!(nearest_within(store, vec![partner(Some(1.0), Some(1.0))], 5.0).is_none());
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let store = GeoPoint::new(0.0, 0.0);
        let a = partner(Some(0.01), Some(0.0));
        let b = partner(Some(-0.01), Some(0.0));
        let a_id = a.user_id;
        let found = nearest_within(store, vec![a, b], 5.0).unwrap();
        assert_eq!(found.partner.user_id, a_id);
    }
}
