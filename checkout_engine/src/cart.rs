//! Cart canonicalisation and pricing.
//!
//! Two carts are considered the same cart if they contain the same products, variations, quantities, prices, shops
//! and selected options, regardless of the order in which the buyer added them. [`normalize_cart`] produces a
//! [`NormalizedCart`] whose canonical byte form can be compared directly, or hashed with
//! [`NormalizedCart::fingerprint`].
//!
//! Pricing helpers in this module compute line amounts and coupon discounts. A coupon applies to at most one line
//! item: the first one it targets.
use std::cmp::Ordering;

use blake2::{digest::consts::U32, Blake2b, Digest};
use checkout_common::Cents;
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;

use crate::db_types::{CartLineItem, CouponRef, SelectedOption};

type Blake2b256 = Blake2b<U32>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Line item {0} has a missing product id")]
    MissingProductId(usize),
    #[error("Line item {0} has a missing shop id")]
    MissingShopId(usize),
    #[error("Line item {index} has an invalid quantity: {quantity}")]
    InvalidQuantity { index: usize, quantity: i64 },
    #[error("Line item {index} has a negative unit price: {price}")]
    NegativePrice { index: usize, price: Cents },
    #[error("Invalid coupon {code}: {reason}")]
    InvalidCoupon { code: String, reason: String },
    #[error("Line item {0} is too large to price")]
    AmountOverflow(usize),
    #[error("The cart total is too large to represent")]
    TotalOverflow,
}

/// Checks the structural validity of every line item in the cart, and of the coupon, if one is given. A valid cart
/// can always be priced: its item count, line amounts and total all fit in an `i64`.
pub fn validate_cart(items: &[CartLineItem], coupon: Option<&CouponRef>) -> Result<(), CartError> {
    if items.is_empty() {
        return Err(CartError::EmptyCart);
    }
    for (index, item) in items.iter().enumerate() {
        if item.product_id.trim().is_empty() {
            return Err(CartError::MissingProductId(index));
        }
        if item.shop_id.trim().is_empty() {
            return Err(CartError::MissingShopId(index));
        }
        if item.quantity <= 0 {
            return Err(CartError::InvalidQuantity { index, quantity: item.quantity });
        }
        if item.unit_price.is_negative() {
            return Err(CartError::NegativePrice { index, price: item.unit_price });
        }
    }
    items.iter().try_fold(0i64, |count, item| count.checked_add(item.quantity)).ok_or(CartError::TotalOverflow)?;
    if let Some(coupon) = coupon {
        let invalid = |reason: &str| CartError::InvalidCoupon { code: coupon.code.clone(), reason: reason.into() };
        if let Some(pct) = coupon.discount_percent {
            if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                return Err(invalid("discount percent must be between 0 and 100"));
            }
        }
        if coupon.discount_amount.map(|a| a.is_negative()).unwrap_or(false) {
            return Err(invalid("discount amount cannot be negative"));
        }
    }
    price_lines(items, coupon)?;
    Ok(())
}

//--------------------------------------    NormalizedCart     ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedItem {
    pub id: String,
    pub quantity: i64,
    pub price: Cents,
    #[serde(rename = "shopId")]
    pub shop_id: String,
    #[serde(rename = "selectedOptions")]
    pub selected_options: Vec<SelectedOption>,
}

impl From<&CartLineItem> for NormalizedItem {
    fn from(item: &CartLineItem) -> Self {
        let mut selected_options = item.selected_options.clone();
        selected_options.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.value.cmp(&b.value)));
        Self {
            id: item.line_id(),
            quantity: item.quantity,
            price: item.unit_price,
            shop_id: item.shop_id.clone(),
            selected_options,
        }
    }
}

/// An order-independent representation of a cart.
#[derive(Debug, Clone)]
pub struct NormalizedCart {
    items: Vec<NormalizedItem>,
    canonical: Vec<u8>,
}

impl NormalizedCart {
    pub fn items(&self) -> &[NormalizedItem] {
        &self.items
    }

    /// The canonical JSON encoding of the normalized cart.
    pub fn as_bytes(&self) -> &[u8] {
        &self.canonical
    }

    /// Hex-encoded BLAKE2b-256 hash of the canonical encoding.
    pub fn fingerprint(&self) -> String {
        hex::encode(Blake2b256::digest(&self.canonical))
    }
}

impl PartialEq for NormalizedCart {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for NormalizedCart {}

/// Projects each line item onto the fields that define cart identity and sorts them by line id. Ties (the same line
/// id appearing twice) are broken by comparing the canonical encoding of the whole item, so the result never depends
/// on input order.
pub fn normalize_cart(items: &[CartLineItem]) -> NormalizedCart {
    let mut keyed = items
        .iter()
        .map(|item| {
            let normalized = NormalizedItem::from(item);
            let bytes = canonical_bytes(&normalized);
            (normalized, bytes)
        })
        .collect::<Vec<_>>();
    keyed.sort_by(|(a, a_bytes), (b, b_bytes)| match a.id.cmp(&b.id) {
        Ordering::Equal => a_bytes.cmp(b_bytes),
        ord => ord,
    });
    let items = keyed.into_iter().map(|(item, _)| item).collect::<Vec<_>>();
    let canonical = canonical_bytes(&items);
    NormalizedCart { items, canonical }
}

fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    // Serialising plain structs, strings and integers to a Vec cannot fail
    serde_json::to_vec(value).unwrap_or_default()
}

//--------------------------------------        Pricing        ---------------------------------------------------------

/// The amount and discount for a single cart line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinePrice {
    pub amount: Cents,
    pub discount: Cents,
}

impl LinePrice {
    pub fn net(&self) -> Cents {
        self.amount - self.discount
    }
}

/// The discount a coupon grants on a single line item, ignoring whether the coupon targets it. `None` if the line
/// amount itself overflows.
///
/// Percentage discounts take precedence over fixed amounts. A percentage is applied to the unit price and multiplied
/// by the quantity, rounding half-up at the cent. A fixed amount is taken off each unit. The discount never exceeds
/// the line amount.
pub fn coupon_discount(item: &CartLineItem, coupon: &CouponRef) -> Option<Cents> {
    let line_amount = item.line_amount()?;
    let raw = match (coupon.discount_percent, coupon.discount_amount) {
        (Some(pct), _) => percent_of(item.unit_price, pct, item.quantity).unwrap_or(line_amount),
        // A fixed discount that overflows is larger than the line amount anyway
        (None, Some(amount)) => amount.checked_mul(item.quantity).unwrap_or(line_amount),
        (None, None) => Cents::default(),
    };
    Some(raw.clamp(Cents::default(), line_amount.max(Cents::default())))
}

fn percent_of(price: Cents, pct: Decimal, quantity: i64) -> Option<Cents> {
    let value = Decimal::from(price.value())
        .checked_mul(pct)?
        .checked_div(Decimal::ONE_HUNDRED)?
        .checked_mul(Decimal::from(quantity))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    value.to_i64().map(Cents::from)
}

/// Prices every line in the cart. The result is index-aligned with `items`.
///
/// Fails if any line amount, or the sum of all line amounts, does not fit in an `i64`. Once this succeeds, every
/// partial sum of amounts, discounts or net amounts over the same cart is in range too.
pub fn price_lines(items: &[CartLineItem], coupon: Option<&CouponRef>) -> Result<Vec<LinePrice>, CartError> {
    let target = coupon.and_then(|c| items.iter().position(|item| c.targets(item)));
    let mut running = Cents::default();
    let mut lines = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let amount = item.line_amount().ok_or(CartError::AmountOverflow(i))?;
        running = running.checked_add(amount).ok_or(CartError::TotalOverflow)?;
        let discount = match (coupon, target) {
            (Some(c), Some(t)) if t == i => coupon_discount(item, c).ok_or(CartError::AmountOverflow(i))?,
            _ => Cents::default(),
        };
        lines.push(LinePrice { amount, discount });
    }
    Ok(lines)
}

/// Σ line amounts less the coupon discount.
pub fn cart_total(items: &[CartLineItem], coupon: Option<&CouponRef>) -> Result<Cents, CartError> {
    Ok(price_lines(items, coupon)?.iter().map(LinePrice::net).sum())
}
