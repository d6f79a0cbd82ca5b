use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use super::to_millis;
use crate::traits::{InventoryError, StockUpdate};

/// Conditionally decrements a variation's stock and flags it as having orders. Nothing changes unless the variation
/// belongs to `product_id` and has at least `quantity` units in stock.
pub async fn decrement_variation_stock(
    product_id: &str,
    variation_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<StockUpdate, InventoryError> {
    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
            UPDATE variations SET stock = stock - $1, has_orders = 1
            WHERE id = $2 AND product_id = $3 AND stock >= $4
            RETURNING stock;
        "#,
    )
    .bind(quantity)
    .bind(variation_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(remaining) = remaining {
        trace!("🗃️ Variation {variation_id} stock is now {remaining}");
        return Ok(StockUpdate::Decremented { remaining });
    }
    let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM variations WHERE id = $1 AND product_id = $2")
        .bind(variation_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(available.map(|available| StockUpdate::Insufficient { available }).unwrap_or(StockUpdate::NotFound))
}

/// Conditionally decrements a product's stock.
pub async fn decrement_product_stock(
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<StockUpdate, InventoryError> {
    let remaining: Option<i64> = sqlx::query_scalar(
        "UPDATE products SET stock = stock - $1 WHERE id = $2 AND stock >= $3 RETURNING stock;",
    )
    .bind(quantity)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(remaining) = remaining {
        trace!("🗃️ Product {product_id} stock is now {remaining}");
        return Ok(StockUpdate::Decremented { remaining });
    }
    let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(available.map(|available| StockUpdate::Insufficient { available }).unwrap_or(StockUpdate::NotFound))
}

pub async fn record_purchase(
    product_id: &str,
    quantity: i64,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
            INSERT INTO product_analytics (product_id, purchases, last_viewed_at) VALUES ($1, $2, $3)
            ON CONFLICT (product_id) DO UPDATE SET
                purchases = purchases + excluded.purchases,
                last_viewed_at = excluded.last_viewed_at;
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(to_millis(at))
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_purchases(product_id: &str, conn: &mut SqliteConnection) -> Result<i64, InventoryError> {
    let purchases: Option<i64> = sqlx::query_scalar("SELECT purchases FROM product_analytics WHERE product_id = $1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(purchases.unwrap_or(0))
}
