//! Delivery fee slabs, commission resolution and the per-store money split.
//!
//! Everything in here is pure: callers load the store, subscription and
//! customer data, then hand plain values to [`FeePolicy::price_order`].

use crate::config::MarketplaceConfig;
use crate::entities::order::StoreBreakdown;
use crate::entities::vendor_subscription::{self, SubscriptionStatus};
use crate::errors::ServiceError;
use chrono::{DateTime, Utc};
use rust_decimal::{prelude::FromPrimitive, Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use uuid::Uuid;

/// Customer delivery fee when either coordinate is unknown
pub const DEFAULT_DELIVERY_FEE: Decimal = dec!(25);
/// Partner base fee when the order distance is unknown
pub const DEFAULT_PARTNER_BASE_FEE: Decimal = dec!(25);

pub const PARTNER_INCENTIVE_MIN: Decimal = dec!(10);
pub const PARTNER_INCENTIVE_MAX: Decimal = dec!(20);
/// Same-day deliveries a partner must exceed to earn the incentive
pub const PARTNER_INCENTIVE_DAILY_DELIVERIES: u64 = 10;

pub const SUPER_SAVER: &str = "Super Saver";
pub const SMART_SAVER: &str = "Smart Saver";
pub const FREE_TRIAL_PLAN: &str = "Free Trial";

/// (upper bound km inclusive, fee)
const CUSTOMER_FEE_SLABS: [(f64, Decimal); 3] = [(3.0, dec!(20)), (8.0, dec!(25)), (15.0, dec!(30))];
const PARTNER_FEE_SLABS: [(f64, Decimal); 3] = [(3.0, dec!(25)), (8.0, dec!(35)), (15.0, dec!(45))];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VendorPlan {
    pub name: &'static str,
    pub monthly_fee: Decimal,
    pub commission_percent: Decimal,
    pub duration_days: i64,
    pub is_free_trial: bool,
}

pub const VENDOR_PLANS: [VendorPlan; 4] = [
    VendorPlan {
        name: FREE_TRIAL_PLAN,
        monthly_fee: dec!(0),
        commission_percent: dec!(0),
        duration_days: 30,
        is_free_trial: true,
    },
    VendorPlan {
        name: "Basic",
        monthly_fee: dec!(499),
        commission_percent: dec!(12),
        duration_days: 30,
        is_free_trial: false,
    },
    VendorPlan {
        name: "Standard",
        monthly_fee: dec!(999),
        commission_percent: dec!(10),
        duration_days: 30,
        is_free_trial: false,
    },
    VendorPlan {
        name: "Premium",
        monthly_fee: dec!(1999),
        commission_percent: dec!(8),
        duration_days: 30,
        is_free_trial: false,
    },
];

/// Plan lookup is case-insensitive.
pub fn vendor_plan(name: &str) -> Option<&'static VendorPlan> {
    let name = name.trim();
    VENDOR_PLANS
        .iter()
        .find(|plan| plan.name.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CustomerPlan {
    pub name: &'static str,
    pub free_delivery_threshold: Decimal,
    pub cashback_percent: Decimal,
    /// Order total from which cashback applies
    pub cashback_min_total: Decimal,
}

pub const CUSTOMER_PLANS: [CustomerPlan; 2] = [
    CustomerPlan {
        name: SUPER_SAVER,
        free_delivery_threshold: dec!(99),
        cashback_percent: dec!(5),
        cashback_min_total: dec!(299),
    },
    CustomerPlan {
        name: SMART_SAVER,
        free_delivery_threshold: dec!(149),
        cashback_percent: dec!(0),
        cashback_min_total: dec!(0),
    },
];

pub fn customer_plan(name: &str) -> Option<&'static CustomerPlan> {
    let name = name.trim();
    CUSTOMER_PLANS
        .iter()
        .find(|plan| plan.name.eq_ignore_ascii_case(name))
}

/// Rounds a money amount to 2 decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_money(amount * percent / dec!(100))
}

fn slab_fee(slabs: &[(f64, Decimal)], distance_km: f64) -> Decimal {
    slabs
        .iter()
        .find(|(limit, _)| distance_km <= *limit)
        .or_else(|| slabs.last())
        .map(|(_, fee)| *fee)
        .unwrap_or(Decimal::ZERO)
}

/// Customer-facing delivery fee for one store leg.
pub fn delivery_fee_for_distance(distance_km: Option<f64>) -> Decimal {
    match distance_km {
        Some(d) => slab_fee(&CUSTOMER_FEE_SLABS, d),
        None => DEFAULT_DELIVERY_FEE,
    }
}

/// Base fee paid to the delivery partner for an order.
pub fn partner_base_fee(distance_km: Option<f64>) -> Decimal {
    match distance_km {
        Some(d) => slab_fee(&PARTNER_FEE_SLABS, d),
        None => DEFAULT_PARTNER_BASE_FEE,
    }
}

/// Incentive for the partner given the number of orders delivered today.
pub fn partner_incentive(delivered_today: u64) -> Decimal {
    if delivered_today > PARTNER_INCENTIVE_DAILY_DELIVERIES {
        (PARTNER_INCENTIVE_MIN + PARTNER_INCENTIVE_MAX) / dec!(2)
    } else {
        Decimal::ZERO
    }
}

pub fn partner_total(base: Decimal, incentive: Decimal, tip: Decimal) -> Decimal {
    round_money(base + incentive + tip)
}

/// Who ends up paying for a store's delivery leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPayer {
    Customer,
    /// Order above the free-delivery threshold: vendor and platform split 50/50
    VendorAndPlatform,
    /// Customer plan benefit: platform absorbs the fee
    Platform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliverySplit {
    pub payer: DeliveryPayer,
    pub customer: Decimal,
    pub vendor: Decimal,
    pub platform: Decimal,
}

impl DeliverySplit {
    pub fn total(&self) -> Decimal {
        self.customer + self.vendor + self.platform
    }
}

/// Where a store's commission percent came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionSource {
    StoreOverride,
    Subscription,
    PlanTable,
    Default,
}

/// One store's share of an order, before pricing
#[derive(Debug, Clone, PartialEq)]
pub struct StoreLeg {
    pub store_id: Uuid,
    pub vendor_id: Uuid,
    pub subtotal: Decimal,
    pub distance_km: Option<f64>,
    pub commission_percent: Decimal,
}

/// Fully priced order, ready to persist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPricing {
    pub breakdown: Vec<StoreBreakdown>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub delivery_charge: Decimal,
    pub delivery_fee_total: Decimal,
    pub commission_total: Decimal,
    pub vendor_total: Decimal,
    pub platform_total: Decimal,
    pub cashback_amount: Decimal,
    pub total_amount: Decimal,
    pub distance_km: Option<f64>,
    pub partner_base_fee: Decimal,
}

/// Deployment-tunable part of the fee policy.
#[derive(Debug, Clone, PartialEq)]
pub struct FeePolicy {
    pub tax_percent: Decimal,
    pub free_delivery_threshold: Decimal,
    pub default_commission_percent: Decimal,
    pub max_delivery_distance_km: f64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        FeePolicy::from(&MarketplaceConfig::default())
    }
}

impl From<&MarketplaceConfig> for FeePolicy {
    fn from(cfg: &MarketplaceConfig) -> Self {
        Self {
            tax_percent: cfg.tax_percent,
            free_delivery_threshold: cfg.free_delivery_threshold,
            default_commission_percent: cfg.default_commission_percent,
            max_delivery_distance_km: cfg.max_delivery_distance_km,
        }
    }
}

impl FeePolicy {
    /// Commission percent for a store: explicit store override, then the
    /// active (not yet ended) subscription, then the plan table by the store's
    /// plan name, then the marketplace default.
    pub fn resolve_commission(
        &self,
        store_override: Option<Decimal>,
        subscription: Option<&vendor_subscription::Model>,
        store_plan_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> (Decimal, CommissionSource) {
        if let Some(pct) = store_override {
            return (pct, CommissionSource::StoreOverride);
        }
        if let Some(sub) = subscription
            .filter(|s| s.status == SubscriptionStatus::Active && !s.has_ended(now))
        {
            return (sub.commission_percent, CommissionSource::Subscription);
        }
        if let Some(plan) = store_plan_name.and_then(vendor_plan) {
            return (plan.commission_percent, CommissionSource::PlanTable);
        }
        (self.default_commission_percent, CommissionSource::Default)
    }

    /// Splits one store's delivery fee given the whole order's value
    /// (subtotal plus tax across all stores).
    pub fn split_delivery_fee(
        &self,
        fee: Decimal,
        order_value: Decimal,
        customer_plan_name: Option<&str>,
    ) -> DeliverySplit {
        if order_value >= self.free_delivery_threshold {
            let vendor = round_money(fee / dec!(2));
            return DeliverySplit {
                payer: DeliveryPayer::VendorAndPlatform,
                customer: Decimal::ZERO,
                vendor,
                platform: fee - vendor,
            };
        }

        let plan_covers = customer_plan_name
            .and_then(customer_plan)
            .map(|plan| order_value >= plan.free_delivery_threshold)
            .unwrap_or(false);

        if plan_covers {
            DeliverySplit {
                payer: DeliveryPayer::Platform,
                customer: Decimal::ZERO,
                vendor: Decimal::ZERO,
                platform: fee,
            }
        } else {
            DeliverySplit {
                payer: DeliveryPayer::Customer,
                customer: fee,
                vendor: Decimal::ZERO,
                platform: Decimal::ZERO,
            }
        }
    }

    pub fn cashback(&self, total_amount: Decimal, customer_plan_name: Option<&str>) -> Decimal {
        match customer_plan_name.and_then(customer_plan) {
            Some(plan)
                if plan.cashback_percent > Decimal::ZERO
                    && total_amount >= plan.cashback_min_total =>
            {
                percent_of(total_amount, plan.cashback_percent)
            }
            _ => Decimal::ZERO,
        }
    }

    fn check_distance(&self, distance_km: Option<f64>) -> Result<(), ServiceError> {
        match distance_km {
            Some(d) if d > self.max_delivery_distance_km => {
                Err(ServiceError::InvalidOperation(format!(
                    "Delivery not available beyond {} km",
                    self.max_delivery_distance_km
                )))
            }
            _ => Ok(()),
        }
    }

    /// Prices an order from its store legs.
    ///
    /// Fails when any leg is beyond the maximum delivery distance; nothing is
    /// priced partially.
    pub fn price_order(
        &self,
        legs: &[StoreLeg],
        customer_plan_name: Option<&str>,
    ) -> Result<OrderPricing, ServiceError> {
        if legs.is_empty() {
            return Err(ServiceError::ValidationError(
                "Order has no items".to_string(),
            ));
        }
        for leg in legs {
            self.check_distance(leg.distance_km)?;
        }

        let taxed: Vec<(Decimal, Decimal)> = legs
            .iter()
            .map(|leg| {
                let subtotal = round_money(leg.subtotal);
                (subtotal, percent_of(subtotal, self.tax_percent))
            })
            .collect();
        let order_value: Decimal = taxed.iter().map(|(s, t)| *s + *t).sum();

        let mut breakdown = Vec::with_capacity(legs.len());
        for (leg, (subtotal, tax)) in legs.iter().zip(taxed) {
            let fee = delivery_fee_for_distance(leg.distance_km);
            let split = self.split_delivery_fee(fee, order_value, customer_plan_name);
            let commission_amount = percent_of(subtotal, leg.commission_percent);
            let total = subtotal + tax + split.customer;

            breakdown.push(StoreBreakdown {
                store_id: leg.store_id,
                vendor_id: leg.vendor_id,
                subtotal,
                tax,
                delivery_fee: fee,
                shipping: split.customer,
                customer_delivery_share: split.customer,
                vendor_delivery_share: split.vendor,
                platform_delivery_share: split.platform,
                distance_km: leg.distance_km,
                commission_percent: leg.commission_percent,
                commission_amount,
                vendor_share: total - commission_amount,
                platform_share: commission_amount,
                total,
            });
        }

        let sum = |f: fn(&StoreBreakdown) -> Decimal| breakdown.iter().map(f).sum::<Decimal>();
        let total_amount = sum(|b| b.total);

        let distance_km = legs
            .iter()
            .filter_map(|leg| leg.distance_km)
            .fold(None, |max: Option<f64>, d| Some(max.map_or(d, |m| m.max(d))));

        Ok(OrderPricing {
            subtotal: sum(|b| b.subtotal),
            tax: sum(|b| b.tax),
            delivery_charge: sum(|b| b.shipping),
            delivery_fee_total: sum(|b| b.delivery_fee),
            commission_total: sum(|b| b.commission_amount),
            vendor_total: sum(|b| b.vendor_share),
            platform_total: sum(|b| b.platform_share),
            cashback_amount: self.cashback(total_amount, customer_plan_name),
            total_amount,
            partner_base_fee: partner_base_fee(distance_km),
            distance_km,
            breakdown,
        })
    }
}

/// Distance rounded to metres, for storage and display.
pub fn round_distance(distance_km: f64) -> f64 {
    Decimal::from_f64(distance_km)
        .map(|d| d.round_dp(3))
        .and_then(|d| rust_decimal::prelude::ToPrimitive::to_f64(&d))
        .unwrap_or(distance_km)
}
