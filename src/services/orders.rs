use crate::db::is_unique_violation;
use crate::entities::{
    cart, cart_item, customer_address, customer_profile,
    order::{self, DeliveryAddress, OrderStatus, PaymentStatus, StoreBreakdowns},
    order_history::{self, ActorRole, HistoryStatus},
    order_item, product, store,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::cart::{clear_cart_items, load_cart};
use crate::services::delivery::DeliveryService;
use crate::services::fees::{self, round_distance, FeePolicy, OrderPricing, StoreLeg};
use crate::services::geocoding::Geocoder;
use crate::services::history::{self, Actor, HistoryEntry};
use crate::services::order_number::next_order_number;
use crate::services::order_status::{transition, PartnerChange};
use crate::services::people::{self, AddressInput};
use crate::services::products::{ensure_purchasable, load_with_store, reserve_stock, restore_stock};
use crate::services::side_effects::SideEffectLog;
use crate::services::subscriptions::SubscriptionService;
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Where the order should be delivered
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AddressChoice {
    #[default]
    None,
    Saved {
        address_id: Uuid,
    },
    Inline(AddressInput),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    #[serde(default)]
    pub address: AddressChoice,
    #[serde(default = "default_true")]
    pub clear_cart: bool,
    #[serde(default)]
    pub save_address: bool,
}

impl Default for CreateOrderInput {
    fn default() -> Self {
        Self {
            address: AddressChoice::None,
            clear_cart: true,
            save_address: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Order with its line items
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Result of placing an order: the committed order plus the outcome of the
/// best-effort work that followed the commit.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    #[serde(flatten)]
    pub details: OrderDetails,
    pub side_effects: SideEffectLog,
}

/// One validated cart line with the data it was priced from
struct CheckedLine {
    product: product::Model,
    quantity: i32,
}

/// Everything the persistence step needs, computed before any write
struct Draft<'a> {
    customer_id: Uuid,
    cart: &'a cart::Model,
    lines: &'a [CheckedLine],
    pricing: &'a OrderPricing,
    address: Option<DeliveryAddress>,
    save_address: Option<AddressInput>,
    clear_cart: bool,
    now: DateTime<Utc>,
}

fn rejection_reason(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::ValidationError(_) => "validation",
        ServiceError::NotFound(_) => "not_found",
        ServiceError::InsufficientStock(_) => "insufficient_stock",
        ServiceError::InvalidOperation(_) => "invalid_operation",
        ServiceError::Conflict(_) => "conflict",
        ServiceError::Forbidden(_) => "forbidden",
        _ => "internal",
    }
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    policy: FeePolicy,
    subscriptions: SubscriptionService,
    delivery: DeliveryService,
    geocoder: Arc<dyn Geocoder>,
    order_number_attempts: u32,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        policy: FeePolicy,
        subscriptions: SubscriptionService,
        delivery: DeliveryService,
        geocoder: Arc<dyn Geocoder>,
        order_number_attempts: u32,
    ) -> Self {
        Self {
            db,
            event_sender,
            policy,
            subscriptions,
            delivery,
            geocoder,
            order_number_attempts: order_number_attempts.max(1),
        }
    }

    /// Converts the customer's cart into an order.
    ///
    /// Validation, pricing and address resolution happen before any write.
    /// Stock reservation, the order rows, the "created" history entry and the
    /// cart clear commit together. Cashback and events run afterwards and
    /// are reported in the returned side-effect log.
    #[instrument(skip(self, input), fields(customer_id = %customer_id))]
    pub async fn create_order_from_cart(
        &self,
        customer_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<PlacedOrder, ServiceError> {
        match self.place_order(customer_id, input).await {
            Ok(placed) => {
                counter!("marketplace_orders.created", 1);
                Ok(placed)
            }
            Err(e) => {
                counter!("marketplace_orders.rejected", 1, "reason" => rejection_reason(&e));
                Err(e)
            }
        }
    }

    async fn place_order(
        &self,
        customer_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<PlacedOrder, ServiceError> {
        let mut side_effects = SideEffectLog::new();

        let profile = customer_profile::Entity::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Forbidden("Only customers can place orders".to_string()))?;
        let plan = profile.plan.as_deref();

        let (cart, items) = match load_cart(&*self.db, customer_id).await? {
            Some((cart, items)) if !items.is_empty() => (cart, items),
            _ => return Err(ServiceError::ValidationError("Cart is empty".to_string())),
        };

        let (lines, stores) = self.check_lines(&items).await?;
        let (address, save_address) = self
            .resolve_address(customer_id, input.address, input.save_address, &mut side_effects)
            .await?;

        let now = Utc::now();
        let legs = self.build_legs(&lines, &stores, address.as_ref(), now).await?;
        let pricing = self.policy.price_order(&legs, plan)?;

        let draft = Draft {
            customer_id,
            cart: &cart,
            lines: &lines,
            pricing: &pricing,
            address,
            save_address,
            clear_cart: input.clear_cart,
            now,
        };
        let details = self.persist_with_retry(&draft).await?;
        let order = &details.order;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            stores = order.store_breakdown.0.len(),
            "order placed"
        );

        if pricing.cashback_amount > Decimal::ZERO {
            match people::credit_wallet(&*self.db, customer_id, pricing.cashback_amount).await {
                Ok(balance) => {
                    info!(order_id = %order.id, amount = %pricing.cashback_amount, %balance, "cashback credited");
                    side_effects.succeeded("cashback");
                    self.event_sender
                        .send_or_log(Event::CashbackCredited {
                            order_id: order.id,
                            customer_id,
                            amount: pricing.cashback_amount,
                        })
                        .await;
                }
                Err(e) => side_effects.failed("cashback", e.to_string()),
            }
        }

        let queued = self
            .event_sender
            .send_or_log(Event::OrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
                customer_id,
                store_ids: order.store_ids(),
                total_amount: order.total_amount,
            })
            .await;
        if queued {
            side_effects.succeeded("order_created_event");
        } else {
            side_effects.failed("order_created_event", "event channel closed");
        }

        Ok(PlacedOrder {
            details,
            side_effects,
        })
    }

    /// Reloads every product and its store; the first failing line rejects the order.
    async fn check_lines(
        &self,
        items: &[cart_item::Model],
    ) -> Result<(Vec<CheckedLine>, Vec<store::Model>), ServiceError> {
        let mut lines = Vec::with_capacity(items.len());
        let mut stores: Vec<store::Model> = Vec::new();
        for item in items {
            let (product, store) = load_with_store(&*self.db, item.product_id).await?;
            ensure_purchasable(product.as_ref(), store.as_ref(), item.quantity)?;
            let (Some(product), Some(store)) = (product, store) else {
                return Err(ServiceError::NotFound("Product not found".to_string()));
            };
            if !stores.iter().any(|s| s.id == store.id) {
                stores.push(store);
            }
            lines.push(CheckedLine {
                product,
                quantity: item.quantity,
            });
        }
        Ok((lines, stores))
    }

    async fn resolve_address(
        &self,
        customer_id: Uuid,
        choice: AddressChoice,
        save: bool,
        side_effects: &mut SideEffectLog,
    ) -> Result<(Option<DeliveryAddress>, Option<AddressInput>), ServiceError> {
        match choice {
            AddressChoice::None => Ok((None, None)),
            AddressChoice::Saved { address_id } => {
                let saved = customer_address::Entity::find_by_id(address_id)
                    .filter(customer_address::Column::UserId.eq(customer_id))
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("Address not found".to_string()))?;
                Ok((
                    Some(DeliveryAddress {
                        address_id: Some(saved.id),
                        line1: Some(saved.line1),
                        city: saved.city,
                        postal_code: saved.postal_code,
                        latitude: saved.latitude,
                        longitude: saved.longitude,
                    }),
                    None,
                ))
            }
            AddressChoice::Inline(mut input) => {
                if input.location().is_none() {
                    match self.geocoder.geocode(&input.one_line()).await {
                        Ok(Some(point)) => {
                            input.latitude = Some(point.latitude);
                            input.longitude = Some(point.longitude);
                            side_effects.succeeded("geocode");
                        }
                        Ok(None) => side_effects.skipped("geocode", "no match for address"),
                        Err(e) => side_effects.failed("geocode", e.to_string()),
                    }
                }
                let location = input.location();
                let snapshot = DeliveryAddress {
                    address_id: None,
                    line1: Some(input.line1.clone()),
                    city: input.city.clone(),
                    postal_code: input.postal_code.clone(),
                    latitude: location.map(|p| p.latitude),
                    longitude: location.map(|p| p.longitude),
                };
                Ok((Some(snapshot), save.then_some(input)))
            }
        }
    }

    async fn build_legs(
        &self,
        lines: &[CheckedLine],
        stores: &[store::Model],
        address: Option<&DeliveryAddress>,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoreLeg>, ServiceError> {
        let destination = address.and_then(|a| a.location());
        let mut legs = Vec::with_capacity(stores.len());
        for store in stores {
            let subtotal: Decimal = lines
                .iter()
                .filter(|l| l.product.store_id == store.id)
                .map(|l| l.product.price * Decimal::from(l.quantity))
                .sum();
            let distance_km = match (store.location(), destination) {
                (Some(from), Some(to)) => Some(round_distance(from.distance_km(&to))),
                _ => None,
            };
            let subscription = self.subscriptions.active_subscription(store.id).await?;
            let (commission_percent, source) = self.policy.resolve_commission(
                store.commission_percent,
                subscription.as_ref(),
                store.subscription_plan.as_deref(),
                now,
            );
            debug!(store_id = %store.id, %commission_percent, ?source, ?distance_km, "store leg");
            legs.push(StoreLeg {
                store_id: store.id,
                vendor_id: store.vendor_id,
                subtotal,
                distance_km,
                commission_percent,
            });
        }
        Ok(legs)
    }

    async fn persist_with_retry(&self, draft: &Draft<'_>) -> Result<OrderDetails, ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let order_number = next_order_number(&*self.db, draft.now).await?;
            match self.persist(draft, &order_number).await {
                Ok(details) => return Ok(details),
                Err(ServiceError::DatabaseError(e)) if is_unique_violation(&e) => {
                    warn!(%order_number, attempt, "order number already taken");
                    counter!("marketplace_orders.number_collisions", 1);
                    if attempt >= self.order_number_attempts {
                        return Err(ServiceError::Conflict(
                            "Could not allocate an order number, please retry".to_string(),
                        ));
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn persist(&self, draft: &Draft<'_>, order_number: &str) -> Result<OrderDetails, ServiceError> {
        let pricing = draft.pricing;
        let txn = self.db.begin().await?;

        for line in draft.lines {
            reserve_stock(&txn, line.product.id, line.quantity, &line.product.name).await?;
        }

        let mut address = draft.address.clone();
        if let Some(input) = draft.save_address.clone() {
            let saved = people::insert_address(&txn, draft.customer_id, input).await?;
            if let Some(a) = address.as_mut() {
                a.address_id = Some(saved.id);
            }
        }

        let order_id = Uuid::new_v4();
        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.to_string()),
            customer_id: Set(draft.customer_id),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            subtotal: Set(pricing.subtotal),
            tax: Set(pricing.tax),
            delivery_charge: Set(pricing.delivery_charge),
            delivery_fee_total: Set(pricing.delivery_fee_total),
            commission_total: Set(pricing.commission_total),
            vendor_total: Set(pricing.vendor_total),
            platform_total: Set(pricing.platform_total),
            cashback_amount: Set(pricing.cashback_amount),
            total_amount: Set(pricing.total_amount),
            partner_base_fee: Set(pricing.partner_base_fee),
            partner_incentive: Set(Decimal::ZERO),
            partner_tip: Set(Decimal::ZERO),
            partner_total: Set(fees::partner_total(pricing.partner_base_fee, Decimal::ZERO, Decimal::ZERO)),
            distance_km: Set(pricing.distance_km),
            store_breakdown: Set(StoreBreakdowns(pricing.breakdown.clone())),
            delivery_address: Set(address),
            delivery_partner_id: Set(None),
            delivered_at: Set(None),
            created_at: Set(draft.now),
            updated_at: Set(draft.now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in draft.lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product.id),
                store_id: Set(line.product.store_id),
                name: Set(line.product.name.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.product.price),
                line_total: Set(fees::round_money(line.product.price * Decimal::from(line.quantity))),
                created_at: Set(draft.now),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        history::record(
            &txn,
            HistoryEntry::new(order_id, HistoryStatus::Created, Actor::customer(draft.customer_id))
                .with_note(format!("Order {} placed", order_number)),
        )
        .await?;
        for leg in &pricing.breakdown {
            let units: i32 = draft
                .lines
                .iter()
                .filter(|l| l.product.store_id == leg.store_id)
                .map(|l| l.quantity)
                .sum();
            history::record(
                &txn,
                HistoryEntry::new(order_id, HistoryStatus::Created, Actor::customer(draft.customer_id))
                    .for_store(leg.store_id)
                    .with_note(format!("{} unit(s) ordered from this store", units)),
            )
            .await?;
        }

        if draft.clear_cart {
            clear_cart_items(&txn, draft.cart.id).await?;
        }

        txn.commit().await?;
        Ok(OrderDetails { order, items })
    }

    async fn load_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    async fn load_items<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> Result<Vec<order_item::Model>, ServiceError> {
        Ok(order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(conn)
            .await?)
    }

    fn can_view(actor: &Actor, order: &order::Model) -> bool {
        match actor.role {
            ActorRole::Admin | ActorRole::System => true,
            ActorRole::Customer => actor.id == Some(order.customer_id),
            ActorRole::Vendor => order
                .store_breakdown
                .0
                .iter()
                .any(|b| Some(b.vendor_id) == actor.id),
            ActorRole::DeliveryPartner => {
                actor.id.is_some() && order.delivery_partner_id == actor.id
            }
        }
    }

    /// Order with items, visible to its customer, its vendors, its partner and admins.
    #[instrument(skip(self, actor))]
    pub async fn get_order(&self, actor: &Actor, order_id: Uuid) -> Result<OrderDetails, ServiceError> {
        let order = self.load_order(order_id).await?;
        if !Self::can_view(actor, &order) {
            return Err(ServiceError::Forbidden(
                "Not allowed to view this order".to_string(),
            ));
        }
        let items = Self::load_items(&*self.db, order_id).await?;
        Ok(OrderDetails { order, items })
    }

    pub async fn list_orders_for_customer(&self, customer_id: Uuid) -> Result<Vec<order::Model>, ServiceError> {
        Ok(order::Entity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Orders containing at least one item from the vendor's store, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders_for_store(
        &self,
        vendor_id: Uuid,
        store_id: Uuid,
    ) -> Result<Vec<order::Model>, ServiceError> {
        self.owned_store(vendor_id, store_id).await?;
        let order_ids: HashSet<Uuid> = order_item::Entity::find()
            .filter(order_item::Column::StoreId.eq(store_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|item| item.order_id)
            .collect();
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(order::Entity::find()
            .filter(order::Column::Id.is_in(order_ids))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// History oldest first. Vendors only see their store's entries plus
    /// order-wide ones.
    pub async fn get_order_history(
        &self,
        actor: &Actor,
        order_id: Uuid,
        store_id: Option<Uuid>,
    ) -> Result<Vec<order_history::Model>, ServiceError> {
        let order = self.get_order(actor, order_id).await?.order;
        let scope = match (actor.role, store_id) {
            (ActorRole::Vendor, Some(store_id)) => {
                let owned = order
                    .store_breakdown
                    .0
                    .iter()
                    .any(|b| b.store_id == store_id && Some(b.vendor_id) == actor.id);
                if !owned {
                    return Err(ServiceError::Forbidden(
                        "Store does not belong to this vendor".to_string(),
                    ));
                }
                Some(store_id)
            }
            (ActorRole::Vendor, None) => order
                .store_breakdown
                .0
                .iter()
                .find(|b| Some(b.vendor_id) == actor.id)
                .map(|b| b.store_id),
            (_, scope) => scope,
        };
        history::order_history(&*self.db, order_id, scope).await
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

    /// Cancels the order and puts every reserved unit back in stock.
    async fn cancel_and_restock(
        &self,
        order: &order::Model,
        entries: Vec<HistoryEntry>,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let cancelled = transition(
            &txn,
            order.id,
            order.status,
            OrderStatus::Cancelled,
            PartnerChange::Keep,
            None,
        )
        .await?;
        for item in Self::load_items(&txn, order.id).await? {
            restore_stock(&txn, item.product_id, item.quantity).await?;
        }
        for entry in entries {
            history::record(&txn, entry).await?;
        }
        txn.commit().await?;
        Ok(cancelled)
    }

    /// Customer cancellation; only while no vendor has moved the order on.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
        reason: Option<String>,
    ) -> Result<order::Model, ServiceError> {
        let order = self.load_order(order_id).await?;
        if order.customer_id != customer_id {
            return Err(ServiceError::Forbidden(
                "Order belongs to another customer".to_string(),
            ));
        }
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "Only pending orders can be cancelled, order is {}",
                order.status
            )));
        }

        let reason = reason.unwrap_or_else(|| "Cancelled by customer".to_string());
        let cancelled = self
            .cancel_and_restock(
                &order,
                vec![HistoryEntry::new(order_id, HistoryStatus::Cancelled, Actor::customer(customer_id))
                    .with_note(reason.clone())],
            )
            .await?;

        info!(%order_id, "order cancelled by customer");
        counter!("marketplace_orders.cancelled", 1, "by" => "customer");
        self.event_sender
            .send_or_log(Event::OrderCancelled {
                order_id,
                customer_id,
                store_ids: order.store_ids(),
                reason,
            })
            .await;
        Ok(cancelled)
    }

    /// A store's accept or reject for a pending order.
    ///
    /// Each store answers once. A rejection cancels the whole order and
    /// restocks it. When every store has accepted the order moves to
    /// PROCESSING and a delivery partner is assigned on a best-effort basis.
    #[instrument(skip(self, note))]
    pub async fn vendor_respond_to_order(
        &self,
        order_id: Uuid,
        vendor_id: Uuid,
        store_id: Uuid,
        accept: bool,
        note: Option<String>,
    ) -> Result<(order::Model, SideEffectLog), ServiceError> {
        let mut side_effects = SideEffectLog::new();
        let order = self.load_order(order_id).await?;
        if !order.includes_store(store_id) {
            return Err(ServiceError::NotFound(
                "Store is not part of this order".to_string(),
            ));
        }
        let store = self.owned_store(vendor_id, store_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "Order is {}, no longer awaiting vendor response",
                order.status
            )));
        }

        let answered = order_history::Entity::find()
            .filter(order_history::Column::OrderId.eq(order_id))
            .filter(order_history::Column::StoreId.eq(store_id))
            .filter(
                order_history::Column::Status
                    .is_in([HistoryStatus::VendorAccepted, HistoryStatus::VendorRejected]),
            )
            .one(&*self.db)
            .await?;
        if answered.is_some() {
            return Err(ServiceError::Conflict(
                "Store has already responded to this order".to_string(),
            ));
        }

        let actor = Actor::vendor(vendor_id);
        if !accept {
            let mut rejected = HistoryEntry::new(order_id, HistoryStatus::VendorRejected, actor).for_store(store_id);
            if let Some(note) = note.clone() {
                rejected = rejected.with_note(note);
            }
            let reason = format!("Rejected by store {}", store.name);
            let cancelled = self
                .cancel_and_restock(
                    &order,
                    vec![
                        rejected,
                        HistoryEntry::new(order_id, HistoryStatus::Cancelled, actor).with_note(reason.clone()),
                    ],
                )
                .await?;

            info!(%order_id, %store_id, "order rejected by vendor");
            counter!("marketplace_orders.cancelled", 1, "by" => "vendor");
            self.event_sender
                .send_or_log(Event::OrderCancelled {
                    order_id,
                    customer_id: order.customer_id,
                    store_ids: order.store_ids(),
                    reason,
                })
                .await;
            return Ok((cancelled, side_effects));
        }

        let mut accepted = HistoryEntry::new(order_id, HistoryStatus::VendorAccepted, actor).for_store(store_id);
        if let Some(note) = note {
            accepted = accepted.with_note(note);
        }
        history::record(&*self.db, accepted).await?;
        info!(%order_id, %store_id, "order accepted by vendor");

        let accepted_stores: HashSet<Uuid> = order_history::Entity::find()
            .filter(order_history::Column::OrderId.eq(order_id))
            .filter(order_history::Column::Status.eq(HistoryStatus::VendorAccepted))
            .all(&*self.db)
            .await?
            .into_iter()
            .filter_map(|row| row.store_id)
            .collect();
        let all_accepted = order.store_ids().iter().all(|id| accepted_stores.contains(id));
        if !all_accepted {
            return Ok((self.load_order(order_id).await?, side_effects));
        }

        let txn = self.db.begin().await?;
        match transition(
            &txn,
            order_id,
            OrderStatus::Pending,
            OrderStatus::Processing,
            PartnerChange::Keep,
            None,
        )
        .await
        {
            Ok(_) => {
                history::record(
                    &txn,
                    HistoryEntry::new(order_id, HistoryStatus::Processing, Actor::system())
                        .with_note("All stores accepted"),
                )
                .await?;
                txn.commit().await?;
            }
            // another store's response already advanced it
            Err(ServiceError::Conflict(_)) => {
                txn.rollback().await?;
                return Ok((self.load_order(order_id).await?, side_effects));
            }
            Err(e) => return Err(e),
        }

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                customer_id: order.customer_id,
                old_status: OrderStatus::Pending,
                new_status: OrderStatus::Processing,
            })
            .await;

        let pickup_store = order.store_ids().first().copied().unwrap_or(store_id);
        match self
            .delivery
            .assign_delivery_partner(order_id, pickup_store, Actor::system())
            .await
        {
            Ok(_) => side_effects.succeeded("assign_partner"),
            Err(e) => side_effects.failed("assign_partner", e.to_string()),
        }

        Ok((self.load_order(order_id).await?, side_effects))
    }

    /// Admin update of the payment status.
    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        admin_id: Uuid,
        order_id: Uuid,
        status: PaymentStatus,
    ) -> Result<order::Model, ServiceError> {
        let order = self.load_order(order_id).await?;
        if order.payment_status == status {
            return Ok(order);
        }
        let previous = order.payment_status;

        let txn = self.db.begin().await?;
        let mut active: order::ActiveModel = order.into();
        active.payment_status = Set(status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        history::record(
            &txn,
            HistoryEntry::new(order_id, HistoryStatus::PaymentUpdated, Actor::admin(admin_id))
                .with_note(format!("Payment {} -> {}", previous, status)),
        )
        .await?;
        txn.commit().await?;
        Ok(updated)
    }
}
