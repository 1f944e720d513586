use crate::entities::{
    customer_address, customer_profile, delivery_partner, store,
    user::{self, UserRole},
};
use serde::Serialize;
use uuid::Uuid;

/// A user together with the payload selected by its role.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Person {
    Customer {
        user: user::Model,
        profile: customer_profile::Model,
        addresses: Vec<customer_address::Model>,
    },
    Vendor {
        user: user::Model,
        stores: Vec<store::Model>,
    },
    DeliveryPartner {
        user: user::Model,
        partner: delivery_partner::Model,
    },
    Admin {
        user: user::Model,
    },
}

impl Person {
    pub fn user(&self) -> &user::Model {
        match self {
            Person::Customer { user, .. }
            | Person::Vendor { user, .. }
            | Person::DeliveryPartner { user, .. }
            | Person::Admin { user } => user,
        }
    }

    pub fn id(&self) -> Uuid {
        self.user().id
    }

    pub fn role(&self) -> UserRole {
        match self {
            Person::Customer { .. } => UserRole::Customer,
            Person::Vendor { .. } => UserRole::Vendor,
            Person::DeliveryPartner { .. } => UserRole::DeliveryPartner,
            Person::Admin { .. } => UserRole::Admin,
        }
    }

    /// Membership plan name; only customers carry one.
    pub fn customer_plan(&self) -> Option<&str> {
        match self {
            Person::Customer { profile, .. } => profile.plan.as_deref(),
            _ => None,
        }
    }
}
