use crate::entities::{order::OrderStatus, vendor_subscription::SubscriptionStatus};
use crate::errors::ServiceError;
use crate::services::notifications::{notifications_for, Notifier};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Domain events published after a state change has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
        customer_id: Uuid,
        store_ids: Vec<Uuid>,
        total_amount: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        customer_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderCancelled {
        order_id: Uuid,
        customer_id: Uuid,
        store_ids: Vec<Uuid>,
        reason: String,
    },
    PartnerAssigned {
        order_id: Uuid,
        partner_id: Uuid,
        store_id: Uuid,
    },
    OrderDelivered {
        order_id: Uuid,
        customer_id: Uuid,
        partner_id: Uuid,
        delivered_at: DateTime<Utc>,
    },
    CashbackCredited {
        order_id: Uuid,
        customer_id: Uuid,
        amount: Decimal,
    },
    SubscriptionChanged {
        vendor_id: Uuid,
        store_id: Uuid,
        subscription_id: Uuid,
        plan_name: String,
        status: SubscriptionStatus,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::OrderCreated { .. } => "order_created",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::OrderCancelled { .. } => "order_cancelled",
            Event::PartnerAssigned { .. } => "partner_assigned",
            Event::OrderDelivered { .. } => "order_delivered",
            Event::CashbackCredited { .. } => "cashback_credited",
            Event::SubscriptionChanged { .. } => "subscription_changed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, waiting for channel capacity
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Sends an event and logs instead of failing. Returns whether it was queued.
    pub async fn send_or_log(&self, event: Event) -> bool {
        let name = event.name();
        match self.send(event).await {
            Ok(()) => {
                debug!(event = name, "event queued");
                true
            }
            Err(e) => {
                warn!(event = name, error = %e, "dropping event");
                counter!("marketplace_events.dropped", 1);
                false
            }
        }
    }
}

/// Creates the event channel used by the services and the event loop.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, turning each event into notifications.
///
/// Delivery is fire-and-forget: a failing notifier is logged and the loop
/// moves on to the next notification.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, notifier: Arc<dyn Notifier>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let name = event.name();
        counter!("marketplace_events.received", 1, "event" => name);

        for notification in notifications_for(&event) {
            if let Err(e) = notifier.notify(&notification).await {
                counter!("marketplace_notifications.failed", 1, "event" => name);
                error!(
                    event = name,
                    recipient = ?notification.recipient,
                    error = %e,
                    "notification delivery failed"
                );
            }
        }
    }

    info!("Event channel closed; event processing loop stopped");
}
