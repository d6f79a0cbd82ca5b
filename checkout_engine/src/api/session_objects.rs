use checkout_common::Cents;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{CartLineItem, CouponRef, PaymentSession, SessionId, SessionStatus};

/// A buyer's checkout submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub cart: Vec<CartLineItem>,
    #[serde(default, alias = "selectedAddressId")]
    pub shipping_address_id: Option<String>,
    #[serde(default)]
    pub coupon: Option<CouponRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub session_id: SessionId,
    /// `true` if an existing pending session with the identical cart was returned instead of creating a new one
    pub reused: bool,
    pub total_amount: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub total_amount: Cents,
    pub item_count: usize,
    pub shop_count: usize,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&PaymentSession> for SessionSummary {
    fn from(session: &PaymentSession) -> Self {
        Self {
            session_id: session.session_id,
            total_amount: session.total_amount,
            item_count: session.cart.iter().map(|i| i.quantity.max(0) as usize).sum(),
            shop_count: session.shop_ids().len(),
            status: session.status,
            created_at: session.created_at,
        }
    }
}
