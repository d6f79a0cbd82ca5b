use chrono::Utc;
use log::*;

use crate::traits::{InventoryError, InventoryManagement, StockUpdate};

/// Applies the stock and analytics side effects of a sale.
#[derive(Debug, Clone)]
pub struct InventoryAdjuster<B> {
    db: B,
}

impl<B> InventoryAdjuster<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> InventoryAdjuster<B>
where B: InventoryManagement
{
    /// Removes `quantity` units from stock and records the purchase.
    ///
    /// If a variation is given and exists, the variation's stock is decremented and the variation is flagged as having
    /// orders. Otherwise the product's own stock is decremented. The decrement only happens if enough stock is
    /// available; if not, nothing is changed and [`InventoryError::InsufficientStock`] is returned.
    pub async fn decrement(
        &self,
        product_id: &str,
        variation_id: Option<&str>,
        quantity: i64,
    ) -> Result<(), InventoryError> {
        let (stock_id, update) = match variation_id {
            Some(variation_id) => match self.db.decrement_variation_stock(product_id, variation_id, quantity).await? {
                StockUpdate::NotFound => {
                    debug!("📦️ Variation {variation_id} of {product_id} not found. Decrementing product stock instead");
                    (product_id, self.db.decrement_product_stock(product_id, quantity).await?)
                },
                update => (variation_id, update),
            },
            None => (product_id, self.db.decrement_product_stock(product_id, quantity).await?),
        };
        match update {
            StockUpdate::Decremented { remaining } => {
                trace!("📦️ Stock for {stock_id} reduced by {quantity}. {remaining} remaining");
            },
            StockUpdate::Insufficient { available } => {
                return Err(InventoryError::InsufficientStock {
                    id: stock_id.to_string(),
                    requested: quantity,
                    available,
                });
            },
            StockUpdate::NotFound => return Err(InventoryError::ProductNotFound(product_id.to_string())),
        }
        self.db.record_purchase(product_id, quantity, Utc::now()).await
    }
}
