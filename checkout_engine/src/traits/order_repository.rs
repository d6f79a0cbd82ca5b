use checkout_common::Cents;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderStatusType};

#[derive(Debug, Clone, Error)]
pub enum OrderRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("Invalid order data: {0}")]
    InvalidOrder(String),
}

impl From<sqlx::Error> for OrderRepositoryError {
    fn from(e: sqlx::Error) -> Self {
        OrderRepositoryError::DatabaseError(e.to_string())
    }
}

/// Identifies "the same order" for duplicate detection: a paid order for the same user, shop and total, created
/// no earlier than `since`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyKey {
    pub user_id: String,
    pub shop_id: String,
    pub total: Cents,
    pub since: DateTime<Utc>,
}

impl IdempotencyKey {
    pub fn new(user_id: &str, shop_id: &str, total: Cents, since: DateTime<Utc>) -> Self {
        Self { user_id: user_id.to_string(), shop_id: shop_id.to_string(), total, since }
    }

    pub fn as_filter(&self) -> OrderQueryFilter {
        OrderQueryFilter::default()
            .with_user_id(self.user_id.clone())
            .with_shop_id(self.shop_id.clone())
            .with_total(self.total)
            .with_status(OrderStatusType::Paid)
            .since(self.since)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderQueryFilter {
    pub user_id: Option<String>,
    pub shop_id: Option<String>,
    pub total: Option<Cents>,
    pub status: Option<OrderStatusType>,
    pub since: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_shop_id(mut self, shop_id: String) -> Self {
        self.shop_id = Some(shop_id);
        self
    }

    pub fn with_total(mut self, total: Cents) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.shop_id.is_none()
            && self.total.is_none()
            && self.status.is_none()
            && self.since.is_none()
    }
}

/// Durable order storage.
#[allow(async_fn_in_trait)]
pub trait OrderRepository: Clone {
    /// Stores the order and all of its items in a single atomic transaction and returns the stored record.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderRepositoryError>;

    /// Returns the most recent order matching the idempotency key, if any.
    async fn find_recent_duplicate(&self, key: &IdempotencyKey) -> Result<Option<Order>, OrderRepositoryError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderRepositoryError>;

    /// Orders matching the filter, oldest first.
    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderRepositoryError>;

    async fn fetch_orders_for_shop(&self, shop_id: &str) -> Result<Vec<Order>, OrderRepositoryError> {
        self.search_orders(OrderQueryFilter::default().with_shop_id(shop_id.to_string())).await
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderRepositoryError> {
        self.search_orders(OrderQueryFilter::default().with_user_id(user_id.to_string())).await
    }
}
