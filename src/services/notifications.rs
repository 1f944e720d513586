use crate::errors::ServiceError;
use crate::events::Event;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Who a notification is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Customer(Uuid),
    Store(Uuid),
    DeliveryPartner(Uuid),
    Vendor(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub title: String,
    pub body: String,
    pub order_id: Option<Uuid>,
}

impl Notification {
    fn new(recipient: Recipient, title: &str, body: String, order_id: Option<Uuid>) -> Self {
        Self {
            recipient,
            title: title.to_string(),
            body,
            order_id,
        }
    }
}

/// Outbound channel (push, SMS, e-mail) used by the event loop.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError>;
}

/// Default notifier: writes each notification as a structured log line.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError> {
        info!(
            recipient = ?notification.recipient,
            order_id = ?notification.order_id,
            title = %notification.title,
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// Maps a domain event to the notifications it should produce.
pub fn notifications_for(event: &Event) -> Vec<Notification> {
    match event {
        Event::OrderCreated {
            order_id,
            order_number,
            customer_id,
            store_ids,
            total_amount,
        } => {
            let mut out = vec![Notification::new(
                Recipient::Customer(*customer_id),
                "Order placed",
                format!("Your order {} for {} has been placed", order_number, total_amount),
                Some(*order_id),
            )];
            out.extend(store_ids.iter().map(|store_id| {
                Notification::new(
                    Recipient::Store(*store_id),
                    "New order",
                    format!("Order {} is waiting for your response", order_number),
                    Some(*order_id),
                )
            }));
            out
        }
        Event::OrderStatusChanged {
            order_id,
            customer_id,
            new_status,
            ..
        } => vec![Notification::new(
            Recipient::Customer(*customer_id),
            "Order update",
            format!("Your order is now {}", new_status),
            Some(*order_id),
        )],
        Event::OrderCancelled {
            order_id,
            customer_id,
            store_ids,
            reason,
        } => {
            let mut out = vec![Notification::new(
                Recipient::Customer(*customer_id),
                "Order cancelled",
                format!("Your order was cancelled: {}", reason),
                Some(*order_id),
            )];
            out.extend(store_ids.iter().map(|store_id| {
                Notification::new(
                    Recipient::Store(*store_id),
                    "Order cancelled",
                    reason.clone(),
                    Some(*order_id),
                )
            }));
            out
        }
        Event::PartnerAssigned {
            order_id,
            partner_id,
            ..
        } => vec![Notification::new(
            Recipient::DeliveryPartner(*partner_id),
            "New delivery",
            "A delivery has been assigned to you".to_string(),
            Some(*order_id),
        )],
        Event::OrderDelivered {
            order_id,
            customer_id,
            ..
        } => vec![Notification::new(
            Recipient::Customer(*customer_id),
            "Delivered",
            "Your order has been delivered".to_string(),
            Some(*order_id),
        )],
        Event::CashbackCredited {
            order_id,
            customer_id,
            amount,
        } => vec![Notification::new(
            Recipient::Customer(*customer_id),
            "Cashback credited",
            format!("{} has been added to your wallet", amount),
            Some(*order_id),
        )],
        Event::SubscriptionChanged {
            vendor_id,
            plan_name,
            status,
            ..
        } => vec![Notification::new(
            Recipient::Vendor(*vendor_id),
            "Subscription update",
            format!("Plan {} is now {}", plan_name, status),
            None,
        )],
    }
}
