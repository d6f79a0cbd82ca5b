use std::{fmt::Display, str::FromStr};

use checkout_common::Cents;
use chrono::{DateTime, Utc};
use log::error;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------       SessionId       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|e| ConversionError(format!("{s} is not a valid session id. {e}")))
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     CartLineItem      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<String>,
    pub quantity: i64,
    pub unit_price: Cents,
    pub shop_id: String,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

impl CartLineItem {
    /// The identifier a line item is known by in normalized carts and coupon targets: the product id, or
    /// `productId:variationId` when a variation is selected.
    pub fn line_id(&self) -> String {
        match &self.variation_id {
            Some(v) => format!("{}:{v}", self.product_id),
            None => self.product_id.clone(),
        }
    }

    /// unit price × quantity, or `None` if that does not fit in an `i64`.
    pub fn line_amount(&self) -> Option<Cents> {
        self.unit_price.checked_mul(self.quantity)
    }
}

//--------------------------------------       CouponRef       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRef {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Cents>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<Decimal>,
    pub target_line_item_id: String,
}

impl CouponRef {
    /// A coupon targets a line item by its product id, its variation id, or its combined line id.
    pub fn targets(&self, item: &CartLineItem) -> bool {
        let target = self.target_line_item_id.as_str();
        target == item.product_id || item.variation_id.as_deref() == Some(target) || target == item.line_id()
    }
}

//--------------------------------------     SellerBinding     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerBinding {
    pub shop_id: String,
    pub seller_id: String,
    pub provider_account_id: String,
}

//--------------------------------------     PaymentSession    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Completed,
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A buyer's cart captured at checkout time, held in the session store until the payment provider confirms the
/// charge or the entry expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub session_id: SessionId,
    pub user_id: String,
    pub cart: Vec<CartLineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address_id: Option<String>,
    #[serde(default)]
    pub seller_bindings: Vec<SellerBinding>,
    pub total_amount: Cents,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponRef>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl PaymentSession {
    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }

    pub fn binding_for_shop(&self, shop_id: &str) -> Option<&SellerBinding> {
        self.seller_bindings.iter().find(|b| b.shop_id == shop_id)
    }

    /// The distinct shop ids in the cart, in first-seen order.
    pub fn shop_ids(&self) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for item in &self.cart {
            if !result.contains(&item.shop_id) {
                result.push(item.shop_id.clone());
            }
        }
        result
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The provider confirmed the charge for this order
    Paid,
    Pending,
    Failed,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Paid => write!(f, "paid"),
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(Self::Paid),
            "pending" => Ok(Self::Pending),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------    DeliveryStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Ordered,
    Packed,
    Shipped,
    OutForDelivery,
    Delivered,
}

impl Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeliveryStatus::Ordered => "ordered",
            DeliveryStatus::Packed => "packed",
            DeliveryStatus::Shipped => "shipped",
            DeliveryStatus::OutForDelivery => "out_for_delivery",
            DeliveryStatus::Delivered => "delivered",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DeliveryStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordered" => Ok(Self::Ordered),
            "packed" => Ok(Self::Packed),
            "shipped" => Ok(Self::Shipped),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            s => Err(ConversionError(format!("Invalid delivery status: {s}"))),
        }
    }
}

impl From<String> for DeliveryStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid delivery status: {value}. But this conversion cannot fail. Defaulting to ordered");
            DeliveryStatus::Ordered
        })
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: String,
    pub variation_id: Option<String>,
    pub quantity: i64,
    pub price: Cents,
    pub selected_options: Vec<SelectedOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    pub shop_id: String,
    pub total: Cents,
    pub status: OrderStatusType,
    pub delivery_status: DeliveryStatus,
    pub shipping_address_id: Option<String>,
    pub coupon_code: Option<String>,
    pub discount_amount: Cents,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: String,
    pub variation_id: Option<String>,
    pub quantity: i64,
    pub price: Cents,
    pub selected_options: Vec<SelectedOption>,
}

impl From<&CartLineItem> for NewOrderItem {
    fn from(item: &CartLineItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            variation_id: item.variation_id.clone(),
            quantity: item.quantity,
            price: item.unit_price,
            selected_options: item.selected_options.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: String,
    pub shop_id: String,
    /// The amount charged for this shop's share of the cart, after any coupon discount
    pub total: Cents,
    pub status: OrderStatusType,
    pub delivery_status: DeliveryStatus,
    pub shipping_address_id: Option<String>,
    pub coupon_code: Option<String>,
    pub discount_amount: Cents,
    /// The payment provider's reference for the charge that paid for this order
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// A freshly paid order with status `paid` and delivery status `ordered`.
    pub fn paid(user_id: &str, shop_id: &str, total: Cents) -> Self {
        Self {
            user_id: user_id.to_string(),
            shop_id: shop_id.to_string(),
            total,
            status: OrderStatusType::Paid,
            delivery_status: DeliveryStatus::Ordered,
            shipping_address_id: None,
            coupon_code: None,
            discount_amount: Cents::default(),
            payment_reference: None,
            created_at: Utc::now(),
            items: vec![],
        }
    }

    pub fn with_item(mut self, item: NewOrderItem) -> Self {
        self.items.push(item);
        self
    }
}

//--------------------------------------      UserProfile      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod test {
    use super::*;

    fn item(product: &str, variation: Option<&str>) -> CartLineItem {
        CartLineItem {
            product_id: product.into(),
            variation_id: variation.map(String::from),
            quantity: 2,
            unit_price: Cents::from(1000),
            shop_id: "shop1".into(),
            selected_options: vec![],
        }
    }

    #[test]
    fn line_ids() {
        assert_eq!(item("p1", None).line_id(), "p1");
        assert_eq!(item("p1", Some("v9")).line_id(), "p1:v9");
        assert_eq!(item("p1", None).line_amount(), Some(Cents::from(2000)));
    }

    #[test]
    fn coupon_targets() {
        let coupon = CouponRef {
            code: "SAVE".into(),
            discount_amount: Some(Cents::from(100)),
            discount_percent: None,
            target_line_item_id: "v9".into(),
        };
        assert!(coupon.targets(&item("p1", Some("v9"))));
        assert!(!coupon.targets(&item("p1", None)));
        let coupon = CouponRef { target_line_item_id: "p1".into(), ..coupon };
        assert!(coupon.targets(&item("p1", Some("v9"))));
        assert!(!coupon.targets(&item("p2", None)));
    }

    #[test]
    fn session_json_is_camel_case() {
        let session = PaymentSession {
            session_id: SessionId::random(),
            user_id: "u1".into(),
            cart: vec![item("p1", Some("v1"))],
            shipping_address_id: Some("addr1".into()),
            seller_bindings: vec![],
            total_amount: Cents::from(2000),
            coupon: None,
            status: SessionStatus::Pending,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["cart"][0]["productId"], "p1");
        assert_eq!(json["cart"][0]["unitPrice"], 1000);
        assert_eq!(json["totalAmount"], 2000);
        assert_eq!(json["status"], "pending");
        let back: PaymentSession = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn status_strings() {
        assert_eq!(OrderStatusType::from("paid".to_string()), OrderStatusType::Paid);
        assert_eq!(OrderStatusType::from("bogus".to_string()), OrderStatusType::Pending);
        assert_eq!(DeliveryStatus::OutForDelivery.to_string(), "out_for_delivery");
        assert_eq!("out_for_delivery".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::OutForDelivery);
    }
}
