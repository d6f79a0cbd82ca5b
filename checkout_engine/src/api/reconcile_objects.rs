use std::{collections::HashMap, fmt::Display};

use checkout_common::Cents;
use serde::{Deserialize, Serialize};

use crate::{
    api::errors::CheckoutError,
    cart::{price_lines, CartError, LinePrice},
    db_types::{CartLineItem, Order, PaymentSession, SessionId},
};

pub const SESSION_ID_METADATA_KEY: &str = "sessionId";
pub const USER_ID_METADATA_KEY: &str = "userId";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// The charge went through and the funds are secured
    ChargeSucceeded,
    Other(String),
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::ChargeSucceeded => write!(f, "charge succeeded"),
            EventKind::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A payment provider's confirmation event, stripped down to what reconciliation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationEvent {
    pub event_id: String,
    pub kind: EventKind,
    /// The provider's id for the charge, e.g. a payment intent id
    pub payment_reference: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl ConfirmationEvent {
    pub fn charge_succeeded<S: Into<String>>(event_id: S, payment_reference: S) -> Self {
        Self {
            event_id: event_id.into(),
            kind: EventKind::ChargeSucceeded,
            payment_reference: Some(payment_reference.into()),
            metadata: HashMap::new(),
        }
    }

    pub fn with_session(mut self, user_id: &str, session_id: &SessionId) -> Self {
        self.metadata.insert(USER_ID_METADATA_KEY.to_string(), user_id.to_string());
        self.metadata.insert(SESSION_ID_METADATA_KEY.to_string(), session_id.to_string());
        self
    }

    /// Extracts `(user_id, session_id)` from the event metadata.
    pub fn session_ref(&self) -> Result<(String, SessionId), CheckoutError> {
        let field = |key: &str| {
            self.metadata
                .get(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CheckoutError::Validation(format!("Event {} has no {key} in its metadata", self.event_id)))
        };
        let user_id = field(USER_ID_METADATA_KEY)?.clone();
        let session_id = field(SESSION_ID_METADATA_KEY)?
            .parse::<SessionId>()
            .map_err(|e| CheckoutError::Validation(e.to_string()))?;
        Ok((user_id, session_id))
    }
}

//--------------------------------------       ShopGroup       ---------------------------------------------------------
/// The items of a session that belong to a single shop, with their prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopGroup {
    pub shop_id: String,
    pub items: Vec<CartLineItem>,
    pub prices: Vec<LinePrice>,
}

impl ShopGroup {
    pub fn subtotal(&self) -> Cents {
        self.prices.iter().map(|p| p.amount).sum()
    }

    pub fn discount(&self) -> Cents {
        self.prices.iter().map(|p| p.discount).sum()
    }

    pub fn total(&self) -> Cents {
        self.subtotal() - self.discount()
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().fold(0, |count, i| count.saturating_add(i.quantity))
    }
}

/// Splits the session's cart into one group per shop. Groups appear in the order their shop is first seen in the cart.
/// Coupon discounts are computed over the whole cart, so a coupon only reduces the total of the group that holds the
/// targeted line.
///
/// Fails if the cart cannot be priced without overflow. Group totals are in range whenever this succeeds.
pub fn partition_by_shop(session: &PaymentSession) -> Result<Vec<ShopGroup>, CartError> {
    let prices = price_lines(&session.cart, session.coupon.as_ref())?;
    let mut groups: Vec<ShopGroup> = Vec::new();
    for (item, price) in session.cart.iter().zip(prices) {
        match groups.iter_mut().find(|g| g.shop_id == item.shop_id) {
            Some(group) => {
                group.items.push(item.clone());
                group.prices.push(price);
            },
            None => groups.push(ShopGroup { shop_id: item.shop_id.clone(), items: vec![item.clone()], prices: vec![price] }),
        }
    }
    Ok(groups)
}

//--------------------------------------       Outcomes        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStage {
    DuplicateCheck,
    OrderInsert,
    Inventory,
}

impl Display for GroupStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupStage::DuplicateCheck => write!(f, "duplicate check"),
            GroupStage::OrderInsert => write!(f, "order insert"),
            GroupStage::Inventory => write!(f, "inventory"),
        }
    }
}

/// What happened to one shop group during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    Created { order: Order },
    /// A matching paid order already exists, so nothing was done
    SkippedDuplicate { shop_id: String, existing_order_id: i64 },
    /// The group could not be completed. If the failure happened after the order was stored, `order_id` points at it
    Failed { shop_id: String, stage: GroupStage, reason: String, order_id: Option<i64> },
}

impl GroupOutcome {
    pub fn shop_id(&self) -> &str {
        match self {
            GroupOutcome::Created { order } => order.shop_id.as_str(),
            GroupOutcome::SkippedDuplicate { shop_id, .. } => shop_id.as_str(),
            GroupOutcome::Failed { shop_id, .. } => shop_id.as_str(),
        }
    }

    pub fn created_order(&self) -> Option<&Order> {
        match self {
            GroupOutcome::Created { order } => Some(order),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The event was not a successful charge, and was acknowledged without doing anything
    Ignored { kind: EventKind },
    Processed { orders_created: usize, groups: Vec<GroupOutcome> },
}

impl ReconcileOutcome {
    pub fn orders_created(&self) -> usize {
        match self {
            ReconcileOutcome::Ignored { .. } => 0,
            ReconcileOutcome::Processed { orders_created, .. } => *orders_created,
        }
    }
}
