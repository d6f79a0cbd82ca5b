use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(String),
    #[error("Insufficient stock for {id}. Requested {requested}, but only {available} available")]
    InsufficientStock { id: String, requested: i64, available: i64 },
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}

/// The result of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockUpdate {
    Decremented { remaining: i64 },
    /// Nothing was changed because there is not enough stock
    Insufficient { available: i64 },
    NotFound,
}

/// Stock and analytics mutation for the product catalog.
///
/// Stock decrements are conditional: stock is only reduced when at least `quantity` units are available, so stock
/// never goes negative.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement: Clone {
    /// Decrements the variation's stock and flags the variation as having orders.
    async fn decrement_variation_stock(
        &self,
        product_id: &str,
        variation_id: &str,
        quantity: i64,
    ) -> Result<StockUpdate, InventoryError>;

    async fn decrement_product_stock(&self, product_id: &str, quantity: i64) -> Result<StockUpdate, InventoryError>;

    /// Adds `quantity` to the product's purchase counter and stamps `last_viewed_at`, creating the analytics record if
    /// needed.
    async fn record_purchase(&self, product_id: &str, quantity: i64, at: DateTime<Utc>) -> Result<(), InventoryError>;
}
