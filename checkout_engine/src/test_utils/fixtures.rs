//! Catalog seeding and collaborator doubles for tests.
//!
//! Shops, users, products and variations are owned by other parts of the marketplace, so the engine has no API for
//! creating them. These helpers write the rows directly.
use std::sync::{Arc, Mutex};

use crate::{
    traits::{Mailer, MailerError},
    SqliteDatabase,
};

pub async fn seed_shop(db: &SqliteDatabase, shop_id: &str, seller_id: &str, account_id: &str) {
    sqlx::query("INSERT INTO shops (id, seller_id, provider_account_id) VALUES ($1, $2, $3)")
        .bind(shop_id)
        .bind(seller_id)
        .bind(account_id)
        .execute(db.pool())
        .await
        .expect("Error seeding shop");
}

pub async fn seed_user(db: &SqliteDatabase, user_id: &str, name: &str, email: &str) {
    sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(name)
        .bind(email)
        .execute(db.pool())
        .await
        .expect("Error seeding user");
}

pub async fn seed_product(db: &SqliteDatabase, product_id: &str, shop_id: &str, stock: i64) {
    sqlx::query("INSERT INTO products (id, shop_id, stock) VALUES ($1, $2, $3)")
        .bind(product_id)
        .bind(shop_id)
        .bind(stock)
        .execute(db.pool())
        .await
        .expect("Error seeding product");
}

pub async fn seed_variation(db: &SqliteDatabase, variation_id: &str, product_id: &str, stock: i64) {
    sqlx::query("INSERT INTO variations (id, product_id, stock) VALUES ($1, $2, $3)")
        .bind(variation_id)
        .bind(product_id)
        .bind(stock)
        .execute(db.pool())
        .await
        .expect("Error seeding variation");
}

pub async fn product_stock(db: &SqliteDatabase, product_id: &str) -> i64 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(db.pool())
        .await
        .expect("Error fetching product stock")
}

/// Returns `(stock, has_orders)` for the variation
pub async fn variation_stock(db: &SqliteDatabase, variation_id: &str) -> (i64, bool) {
    sqlx::query_as("SELECT stock, has_orders FROM variations WHERE id = $1")
        .bind(variation_id)
        .fetch_one(db.pool())
        .await
        .expect("Error fetching variation stock")
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub template: String,
    pub to: String,
    pub data: serde_json::Value,
}

/// A mailer that remembers everything it was asked to send.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    async fn send(&self, template: &str, to: &str, data: serde_json::Value) -> Result<(), MailerError> {
        let email = SentEmail { template: template.to_string(), to: to.to_string(), data };
        self.sent.lock().map_err(|e| MailerError::SendFailed(e.to_string()))?.push(email);
        Ok(())
    }
}

/// Seeds a two-shop marketplace:
/// * `shopA` owned by `sellerA` (account `acct_A`) selling `a1` (stock 10) and `a2` (stock 5) with variation `a2-red`
///   (stock 3);
/// * `shopB` owned by `sellerB` (account `acct_B`) selling `b1` (stock 10);
/// * buyer `u1` (Alice, alice@example.com).
pub async fn seed_marketplace(db: &SqliteDatabase) {
    seed_shop(db, "shopA", "sellerA", "acct_A").await;
    seed_shop(db, "shopB", "sellerB", "acct_B").await;
    seed_user(db, "u1", "Alice", "alice@example.com").await;
    seed_product(db, "a1", "shopA", 10).await;
    seed_product(db, "a2", "shopA", 5).await;
    seed_variation(db, "a2-red", "a2", 3).await;
    seed_product(db, "b1", "shopB", 10).await;
}
