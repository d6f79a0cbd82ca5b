//! Fee arithmetic.
//!
//! There are two independent rates in the system and they are never mixed:
//! * the *platform fee rate* is charged on every payment intent and withheld by the payment provider as the
//!   application fee ([`compute_fees`]);
//! * the *admin fee rate* is only used in reporting, to show sellers and admins how an order total divides
//!   ([`compute_earnings`]).
use checkout_common::{Cents, FeeRate, FeeRateError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PLATFORM_FEE_PERCENT: u32 = 5;
pub const DEFAULT_ADMIN_FEE_PERCENT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub platform_fee_rate: FeeRate,
    pub admin_fee_rate: FeeRate,
}

impl FeeSchedule {
    pub fn new(platform_fee_rate: FeeRate, admin_fee_rate: FeeRate) -> Self {
        Self { platform_fee_rate, admin_fee_rate }
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            platform_fee_rate: FeeRate::from_percent(DEFAULT_PLATFORM_FEE_PERCENT).unwrap_or_default(),
            admin_fee_rate: FeeRate::from_percent(DEFAULT_ADMIN_FEE_PERCENT).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSplit {
    pub application_fee: Cents,
    pub net_to_seller: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsView {
    pub admin_fee: Cents,
    pub seller_earnings: Cents,
}

/// Splits a gross charge into the platform's application fee and the seller's payout.
pub fn compute_fees(gross: Cents, rate: FeeRate) -> Result<FeeSplit, FeeRateError> {
    let application_fee = rate.apply(gross)?;
    Ok(FeeSplit { application_fee, net_to_seller: gross - application_fee })
}

/// The reporting view of an order total: the admin's commission and what the seller keeps.
pub fn compute_earnings(order_total: Cents, admin_rate: FeeRate) -> Result<EarningsView, FeeRateError> {
    let admin_fee = admin_rate.apply(order_total)?;
    Ok(EarningsView { admin_fee, seller_earnings: order_total - admin_fee })
}
