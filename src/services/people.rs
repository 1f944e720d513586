use crate::entities::{
    customer_address, customer_profile, delivery_partner, store,
    user::{self, UserRole},
};
use crate::errors::ServiceError;
use crate::models::{GeoPoint, Person};
use crate::services::fees;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterPartnerInput {
    #[validate]
    #[serde(flatten)]
    pub person: RegisterInput,
    #[validate(length(max = 60))]
    pub vehicle: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(max = 60))]
    pub label: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub line1: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl AddressInput {
    /// Single-line form handed to the geocoder.
    pub fn one_line(&self) -> String {
        [Some(self.line1.as_str()), self.city.as_deref(), self.postal_code.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::from_parts(self.latitude, self.longitude)
    }
}

fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ServiceError> {
    if (latitude.is_some() || longitude.is_some())
        && GeoPoint::from_parts(latitude, longitude).is_none()
    {
        return Err(ServiceError::ValidationError(
            "latitude and longitude must both be valid coordinates".to_string(),
        ));
    }
    Ok(())
}

/// Identity and role payloads for customers, vendors, delivery partners and admins.
#[derive(Clone)]
pub struct PeopleService {
    db: Arc<DatabaseConnection>,
}

impl PeopleService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn insert_user<C: ConnectionTrait>(
        conn: &C,
        input: RegisterInput,
        role: UserRole,
    ) -> Result<user::Model, ServiceError> {
        let now = Utc::now();
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            email: Set(input.email.map(|e| e.trim().to_lowercase())),
            phone: Set(input.phone),
            role: Set(role),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn register_customer(
        &self,
        input: RegisterInput,
        plan: Option<String>,
    ) -> Result<Person, ServiceError> {
        input.validate()?;
        let plan = plan
            .map(|name| {
                fees::customer_plan(&name)
                    .map(|p| p.name.to_string())
                    .ok_or_else(|| ServiceError::ValidationError(format!("Unknown plan {}", name)))
            })
            .transpose()?;

        let txn = self.db.begin().await?;
        let user = Self::insert_user(&txn, input, UserRole::Customer).await?;
        let now = Utc::now();
        let profile = customer_profile::ActiveModel {
            user_id: Set(user.id),
            plan: Set(plan),
            wallet_balance: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(user_id = %user.id, "customer registered");
        Ok(Person::Customer {
            user,
            profile,
            addresses: Vec::new(),
        })
    }

    #[instrument(skip(self, input))]
    pub async fn register_vendor(&self, input: RegisterInput) -> Result<Person, ServiceError> {
        input.validate()?;
        let user = Self::insert_user(&*self.db, input, UserRole::Vendor).await?;
        info!(user_id = %user.id, "vendor registered");
        Ok(Person::Vendor {
            user,
            stores: Vec::new(),
        })
    }

    #[instrument(skip(self, input))]
    pub async fn register_delivery_partner(
        &self,
        input: RegisterPartnerInput,
    ) -> Result<Person, ServiceError> {
        input.validate()?;
        check_coordinates(input.latitude, input.longitude)?;

        let txn = self.db.begin().await?;
        let user = Self::insert_user(&txn, input.person, UserRole::DeliveryPartner).await?;
        let now = Utc::now();
        let located = input.latitude.is_some();
        let partner = delivery_partner::ActiveModel {
            user_id: Set(user.id),
            is_available: Set(true),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            vehicle: Set(input.vehicle),
            total_deliveries: Set(0),
            location_updated_at: Set(located.then_some(now)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(user_id = %user.id, "delivery partner registered");
        Ok(Person::DeliveryPartner { user, partner })
    }

    #[instrument(skip(self, input))]
    pub async fn register_admin(&self, input: RegisterInput) -> Result<Person, ServiceError> {
        input.validate()?;
        let user = Self::insert_user(&*self.db, input, UserRole::Admin).await?;
        Ok(Person::Admin { user })
    }

    /// Loads a user with the payload selected by its role.
    #[instrument(skip(self))]
    pub async fn get_person(&self, user_id: Uuid) -> Result<Person, ServiceError> {
        let user = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let person = match user.role {
            UserRole::Customer => {
                let profile = customer_profile::Entity::find_by_id(user.id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "customer {} has no profile",
                            user.id
                        ))
                    })?;
                let addresses = customer_address::Entity::find()
                    .filter(customer_address::Column::UserId.eq(user.id))
                    .order_by_asc(customer_address::Column::CreatedAt)
                    .all(&*self.db)
                    .await?;
                Person::Customer {
                    user,
                    profile,
                    addresses,
                }
            }
            UserRole::Vendor => {
                let stores = store::Entity::find()
                    .filter(store::Column::VendorId.eq(user.id))
                    .order_by_asc(store::Column::Code)
                    .all(&*self.db)
                    .await?;
                Person::Vendor { user, stores }
            }
            UserRole::DeliveryPartner => {
                let partner = delivery_partner::Entity::find_by_id(user.id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "delivery partner {} has no profile",
                            user.id
                        ))
                    })?;
                Person::DeliveryPartner { user, partner }
            }
            UserRole::Admin => Person::Admin { user },
        };
        Ok(person)
    }

    async fn customer_profile(&self, user_id: Uuid) -> Result<customer_profile::Model, ServiceError> {
        customer_profile::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))
    }

    /// Plan name of a customer, `None` for non-customers or customers without one.
    pub async fn customer_plan_name(&self, user_id: Uuid) -> Result<Option<String>, ServiceError> {
        Ok(customer_profile::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .and_then(|p| p.plan))
    }

    #[instrument(skip(self, input))]
    pub async fn add_address(
        &self,
        user_id: Uuid,
        input: AddressInput,
    ) -> Result<customer_address::Model, ServiceError> {
        self.customer_profile(user_id).await?;
        insert_address(&*self.db, user_id, input).await
    }

    /// A saved address of this customer; other customers' addresses are not found.
    pub async fn find_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<customer_address::Model, ServiceError> {
        customer_address::Entity::find_by_id(address_id)
            .filter(customer_address::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Address not found".to_string()))
    }

    /// Sets or clears the customer's membership plan.
    #[instrument(skip(self))]
    pub async fn set_customer_plan(
        &self,
        user_id: Uuid,
        plan: Option<&str>,
    ) -> Result<customer_profile::Model, ServiceError> {
        let plan = match plan {
            Some(name) => Some(
                fees::customer_plan(name)
                    .ok_or_else(|| ServiceError::ValidationError(format!("Unknown plan {}", name)))?
                    .name
                    .to_string(),
            ),
            None => None,
        };
        let profile = self.customer_profile(user_id).await?;
        let mut active: customer_profile::ActiveModel = profile.into();
        active.plan = Set(plan);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    /// Adds `amount` to the wallet in one statement and returns the new balance.
    #[instrument(skip(self))]
    pub async fn credit_wallet(&self, user_id: Uuid, amount: Decimal) -> Result<Decimal, ServiceError> {
        credit_wallet(&*self.db, user_id, amount).await
    }

    #[instrument(skip(self))]
    pub async fn update_partner_location(
        &self,
        partner_id: Uuid,
        point: GeoPoint,
    ) -> Result<delivery_partner::Model, ServiceError> {
        check_coordinates(Some(point.latitude), Some(point.longitude))?;
        let partner = self.partner(partner_id).await?;
        let now = Utc::now();
        let mut active: delivery_partner::ActiveModel = partner.into();
        active.latitude = Set(Some(point.latitude));
        active.longitude = Set(Some(point.longitude));
        active.location_updated_at = Set(Some(now));
        active.updated_at = Set(now);
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn set_partner_availability(
        &self,
        partner_id: Uuid,
        is_available: bool,
    ) -> Result<delivery_partner::Model, ServiceError> {
        let partner = self.partner(partner_id).await?;
        let mut active: delivery_partner::ActiveModel = partner.into();
        active.is_available = Set(is_available);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    async fn partner(&self, partner_id: Uuid) -> Result<delivery_partner::Model, ServiceError> {
        delivery_partner::Entity::find_by_id(partner_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Delivery partner not found".to_string()))
    }
}

/// Validates and saves an address for `user_id`.
pub async fn insert_address<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    input: AddressInput,
) -> Result<customer_address::Model, ServiceError> {
    input.validate()?;
    check_coordinates(input.latitude, input.longitude)?;

    let created = customer_address::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        label: Set(input.label),
        line1: Set(input.line1),
        city: Set(input.city),
        postal_code: Set(input.postal_code),
        latitude: Set(input.latitude),
        longitude: Set(input.longitude),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(created)
}

/// Wallet credit usable inside a caller's transaction.
pub async fn credit_wallet<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    amount: Decimal,
) -> Result<Decimal, ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "credit amount must be positive".to_string(),
        ));
    }
    let result = customer_profile::Entity::update_many()
        .col_expr(
            customer_profile::Column::WalletBalance,
            Expr::col(customer_profile::Column::WalletBalance).add(amount),
        )
        .col_expr(customer_profile::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(customer_profile::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound("Customer not found".to_string()));
    }

    let profile = customer_profile::Entity::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;
    Ok(profile.wallet_balance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_line_address_skips_blank_parts() {
        let input = AddressInput {
            line1: "12 MG Road".into(),
            city: Some("Bengaluru".into()),
            postal_code: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(input.one_line(), "12 MG Road, Bengaluru");
    }

    #[test]
    fn half_coordinates_are_rejected() {
        assert!(check_coordinates(Some(12.0), None).is_err());
        assert!(check_coordinates(None, None).is_ok());
        assert!(check_coordinates(Some(12.0), Some(77.0)).is_ok());
    }
}
