use crate::entities::{
    order_history::ActorRole,
    store,
    vendor_subscription::{self, SubscriptionStatus},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::fees::{self, VendorPlan, FREE_TRIAL_PLAN, VENDOR_PLANS};
use crate::services::history::Actor;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct SubscriptionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl SubscriptionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    pub fn list_plans(&self) -> &'static [VendorPlan] {
        &VENDOR_PLANS
    }

    async fn load_store(&self, store_id: Uuid) -> Result<store::Model, ServiceError> {
        store::Entity::find_by_id(store_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Store not found".to_string()))
    }

    async fn load(&self, subscription_id: Uuid) -> Result<vendor_subscription::Model, ServiceError> {
        vendor_subscription::Entity::find_by_id(subscription_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Subscription not found".to_string()))
    }

    fn authorize(actor: &Actor, vendor_id: Uuid) -> Result<(), ServiceError> {
        match actor.role {
            ActorRole::Admin | ActorRole::System => Ok(()),
            ActorRole::Vendor if actor.id == Some(vendor_id) => Ok(()),
            _ => Err(ServiceError::Forbidden(
                "Subscription belongs to another vendor".to_string(),
            )),
        }
    }

    /// Current subscription of a store, applying lazy expiry: an ended
    /// subscription is renewed when `auto_renew` is set and marked EXPIRED
    /// otherwise.
    #[instrument(skip(self))]
    pub async fn active_subscription(
        &self,
        store_id: Uuid,
    ) -> Result<Option<vendor_subscription::Model>, ServiceError> {
        let now = Utc::now();
        let current = vendor_subscription::Entity::find()
            .filter(vendor_subscription::Column::StoreId.eq(store_id))
            .filter(vendor_subscription::Column::Status.eq(SubscriptionStatus::Active))
            .order_by_desc(vendor_subscription::Column::EndDate)
            .one(&*self.db)
            .await?;

        let Some(current) = current else {
            return Ok(None);
        };
        if !current.has_ended(now) {
            return Ok(Some(current));
        }

        if current.auto_renew && !current.is_free_trial {
            let renewed = self.extend(current, now).await?;
            info!(subscription_id = %renewed.id, "subscription auto-renewed");
            Ok(Some(renewed))
        } else {
            let mut active: vendor_subscription::ActiveModel = current.into();
            active.status = Set(SubscriptionStatus::Expired);
            active.updated_at = Set(now);
            let expired = active.update(&*self.db).await?;
            sync_store_snapshot(&*self.db, store_id).await?;
            self.publish(&expired).await;
            info!(subscription_id = %expired.id, "subscription expired");
            Ok(None)
        }
    }

    #[instrument(skip(self))]
    pub async fn subscribe(
        &self,
        vendor_id: Uuid,
        store_id: Uuid,
        plan_name: &str,
        auto_renew: bool,
    ) -> Result<vendor_subscription::Model, ServiceError> {
        let plan = fees::vendor_plan(plan_name)
            .ok_or_else(|| ServiceError::ValidationError(format!("Unknown plan {}", plan_name)))?;
        if plan.is_free_trial {
            return Err(ServiceError::InvalidOperation(
                "The free trial is granted on store approval".to_string(),
            ));
        }
        self.start(vendor_id, store_id, plan, auto_renew).await
    }

    /// Grants the free-trial plan; a store gets it at most once.
    #[instrument(skip(self))]
    pub async fn grant_free_trial(
        &self,
        vendor_id: Uuid,
        store_id: Uuid,
    ) -> Result<vendor_subscription::Model, ServiceError> {
        let previous_trials = vendor_subscription::Entity::find()
            .filter(vendor_subscription::Column::StoreId.eq(store_id))
            .filter(vendor_subscription::Column::IsFreeTrial.eq(true))
            .count(&*self.db)
            .await?;
        if previous_trials > 0 {
            return Err(ServiceError::Conflict(
                "Free trial already used for this store".to_string(),
            ));
        }
        let plan = fees::vendor_plan(FREE_TRIAL_PLAN)
            .ok_or_else(|| ServiceError::InternalError("free trial plan missing".to_string()))?;
        self.start(vendor_id, store_id, plan, false).await
    }

    async fn start(
        &self,
        vendor_id: Uuid,
        store_id: Uuid,
        plan: &VendorPlan,
        auto_renew: bool,
    ) -> Result<vendor_subscription::Model, ServiceError> {
        let store = self.load_store(store_id).await?;
        if store.vendor_id != vendor_id {
            return Err(ServiceError::Forbidden(
                "Store does not belong to this vendor".to_string(),
            ));
        }
        if self.active_subscription(store_id).await?.is_some() {
            return Err(ServiceError::Conflict(
                "Store already has an active subscription".to_string(),
            ));
        }

        let now = Utc::now();
        let created = vendor_subscription::ActiveModel {
            id: Set(Uuid::new_v4()),
            vendor_id: Set(vendor_id),
            store_id: Set(store_id),
            plan_name: Set(plan.name.to_string()),
            commission_percent: Set(plan.commission_percent),
            monthly_fee: Set(plan.monthly_fee),
            start_date: Set(now),
            end_date: Set(now + Duration::days(plan.duration_days)),
            status: Set(SubscriptionStatus::Active),
            auto_renew: Set(auto_renew),
            is_free_trial: Set(plan.is_free_trial),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        sync_store_snapshot(&*self.db, store_id).await?;
        self.publish(&created).await;
        info!(subscription_id = %created.id, plan = %created.plan_name, "subscription started");
        Ok(created)
    }

    async fn extend(
        &self,
        sub: vendor_subscription::Model,
        now: DateTime<Utc>,
    ) -> Result<vendor_subscription::Model, ServiceError> {
        let days = fees::vendor_plan(&sub.plan_name)
            .map(|p| p.duration_days)
            .unwrap_or(30);
        let from = if sub.end_date > now { sub.end_date } else { now };
        let store_id = sub.store_id;

        let mut active: vendor_subscription::ActiveModel = sub.into();
        active.start_date = Set(from);
        active.end_date = Set(from + Duration::days(days));
        active.status = Set(SubscriptionStatus::Active);
        active.updated_at = Set(now);
        let renewed = active.update(&*self.db).await?;

        sync_store_snapshot(&*self.db, store_id).await?;
        self.publish(&renewed).await;
        Ok(renewed)
    }

    #[instrument(skip(self, actor))]
    pub async fn renew(
        &self,
        actor: &Actor,
        subscription_id: Uuid,
    ) -> Result<vendor_subscription::Model, ServiceError> {
        let sub = self.load(subscription_id).await?;
        Self::authorize(actor, sub.vendor_id)?;
        if sub.is_free_trial {
            return Err(ServiceError::InvalidOperation(
                "Free trials cannot be renewed".to_string(),
            ));
        }
        if sub.status == SubscriptionStatus::Cancelled {
            return Err(ServiceError::InvalidStatus(
                "Cancelled subscriptions cannot be renewed".to_string(),
            ));
        }
        if sub.status != SubscriptionStatus::Active {
            let other_active = vendor_subscription::Entity::find()
                .filter(vendor_subscription::Column::StoreId.eq(sub.store_id))
                .filter(vendor_subscription::Column::Status.eq(SubscriptionStatus::Active))
                .filter(vendor_subscription::Column::Id.ne(sub.id))
                .count(&*self.db)
                .await?;
            if other_active > 0 {
                return Err(ServiceError::Conflict(
                    "Store already has an active subscription".to_string(),
                ));
            }
        }
        self.extend(sub, Utc::now()).await
    }

    async fn transition(
        &self,
        actor: &Actor,
        subscription_id: Uuid,
        allowed_from: &[SubscriptionStatus],
        to: SubscriptionStatus,
    ) -> Result<vendor_subscription::Model, ServiceError> {
        let sub = self.load(subscription_id).await?;
        Self::authorize(actor, sub.vendor_id)?;
        if !allowed_from.contains(&sub.status) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot move subscription from {} to {}",
                sub.status, to
            )));
        }
        let store_id = sub.store_id;
        let mut active: vendor_subscription::ActiveModel = sub.into();
        active.status = Set(to);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        sync_store_snapshot(&*self.db, store_id).await?;
        self.publish(&updated).await;
        Ok(updated)
    }

    #[instrument(skip(self, actor))]
    pub async fn pause(
        &self,
        actor: &Actor,
        subscription_id: Uuid,
    ) -> Result<vendor_subscription::Model, ServiceError> {
        self.transition(
            actor,
            subscription_id,
            &[SubscriptionStatus::Active],
            SubscriptionStatus::Paused,
        )
        .await
    }

    #[instrument(skip(self, actor))]
    pub async fn resume(
        &self,
        actor: &Actor,
        subscription_id: Uuid,
    ) -> Result<vendor_subscription::Model, ServiceError> {
        let sub = self.load(subscription_id).await?;
        if sub.has_ended(Utc::now()) {
            return Err(ServiceError::InvalidOperation(
                "Subscription period has ended; renew instead".to_string(),
            ));
        }
        self.transition(
            actor,
            subscription_id,
            &[SubscriptionStatus::Paused],
            SubscriptionStatus::Active,
        )
        .await
    }

    #[instrument(skip(self, actor))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        subscription_id: Uuid,
    ) -> Result<vendor_subscription::Model, ServiceError> {
        self.transition(
            actor,
            subscription_id,
            &[SubscriptionStatus::Active, SubscriptionStatus::Paused],
            SubscriptionStatus::Cancelled,
        )
        .await
    }

    pub async fn list_for_store(
        &self,
        store_id: Uuid,
    ) -> Result<Vec<vendor_subscription::Model>, ServiceError> {
        Ok(vendor_subscription::Entity::find()
            .filter(vendor_subscription::Column::StoreId.eq(store_id))
            .order_by_desc(vendor_subscription::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    async fn publish(&self, sub: &vendor_subscription::Model) {
        self.event_sender
            .send_or_log(Event::SubscriptionChanged {
                vendor_id: sub.vendor_id,
                store_id: sub.store_id,
                subscription_id: sub.id,
                plan_name: sub.plan_name.clone(),
                status: sub.status,
            })
            .await;
    }
}

/// Plan name a store keeps once its latest subscription is no longer active.
/// Paused or expired paid plans keep their name so the plan-table commission
/// still applies; cancelled plans and free trials leave nothing behind.
fn retained_plan_name(latest: &vendor_subscription::Model) -> Option<String> {
    match latest.status {
        SubscriptionStatus::Paused | SubscriptionStatus::Expired if !latest.is_free_trial => {
            Some(latest.plan_name.clone())
        }
        _ => None,
    }
}

/// Copies the store's current subscription onto the store row.
pub async fn sync_store_snapshot<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
) -> Result<(), ServiceError> {
    let Some(store) = store::Entity::find_by_id(store_id).one(conn).await? else {
        warn!(%store_id, "subscription refers to a missing store");
        return Ok(());
    };
    let current = vendor_subscription::Entity::find()
        .filter(vendor_subscription::Column::StoreId.eq(store_id))
        .filter(vendor_subscription::Column::Status.eq(SubscriptionStatus::Active))
        .order_by_desc(vendor_subscription::Column::EndDate)
        .one(conn)
        .await?;

    let (plan_name, subscription_id) = match current {
        Some(sub) => (Some(sub.plan_name), Some(sub.id)),
        None => {
            let latest = vendor_subscription::Entity::find()
                .filter(vendor_subscription::Column::StoreId.eq(store_id))
                .order_by_desc(vendor_subscription::Column::UpdatedAt)
                .one(conn)
                .await?;
            (latest.as_ref().and_then(retained_plan_name), None)
        }
    };

    let mut active: store::ActiveModel = store.into();
    active.subscription_plan = Set(plan_name);
    active.subscription_id = Set(subscription_id);
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;
    Ok(())
}
