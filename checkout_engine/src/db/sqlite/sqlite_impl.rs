//! `SqliteDatabase` is a concrete implementation of a checkout engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the durable-storage traits defined in the
//! [`crate::traits`] module: orders, inventory and the shop and user directories.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate, SqlitePool};

use super::db::{db_url, directories, inventory, new_pool, orders};
use crate::{
    db_types::{NewOrder, Order, SellerBinding, UserProfile},
    traits::{
        DirectoryError,
        IdempotencyKey,
        InventoryError,
        InventoryManagement,
        OrderQueryFilter,
        OrderRepository,
        OrderRepositoryError,
        ShopDirectory,
        StockUpdate,
        UserDirectory,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in the `CHK_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Created new SQLite connection pool for {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }

    /// The total number of units ever purchased for the product.
    pub async fn fetch_purchase_count(&self, product_id: &str) -> Result<i64, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::fetch_purchases(product_id, &mut conn).await
    }
}

impl OrderRepository for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderRepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn find_recent_duplicate(&self, key: &IdempotencyKey) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let matches = orders::search_orders(key.as_filter(), &mut conn).await?;
        Ok(matches.into_iter().last())
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(filter, &mut conn).await
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn decrement_variation_stock(
        &self,
        product_id: &str,
        variation_id: &str,
        quantity: i64,
    ) -> Result<StockUpdate, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::decrement_variation_stock(product_id, variation_id, quantity, &mut conn).await
    }

    async fn decrement_product_stock(&self, product_id: &str, quantity: i64) -> Result<StockUpdate, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::decrement_product_stock(product_id, quantity, &mut conn).await
    }

    async fn record_purchase(&self, product_id: &str, quantity: i64, at: DateTime<Utc>) -> Result<(), InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::record_purchase(product_id, quantity, at, &mut conn).await
    }
}

impl ShopDirectory for SqliteDatabase {
    async fn fetch_seller_bindings(&self, shop_ids: &[String]) -> Result<Vec<SellerBinding>, DirectoryError> {
        let mut conn = self.pool.acquire().await?;
        directories::fetch_seller_bindings(shop_ids, &mut conn).await
    }
}

impl UserDirectory for SqliteDatabase {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>, DirectoryError> {
        let mut conn = self.pool.acquire().await?;
        directories::fetch_user(user_id, &mut conn).await
    }
}

#[cfg(test)]
mod test {
    use checkout_common::Cents;
    use chrono::Duration;

    use super::*;
    use crate::{
        db_types::{NewOrderItem, OrderStatusType, SelectedOption},
        test_utils::{
            fixtures::seed_marketplace,
            prepare_env::{prepare_test_env, random_db_path, tear_down},
        },
    };

    fn item(product_id: &str, quantity: i64, price: i64) -> NewOrderItem {
        NewOrderItem {
            product_id: product_id.into(),
            variation_id: None,
            quantity,
            price: Cents::from(price),
            selected_options: vec![SelectedOption { name: "size".into(), value: "M".into() }],
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_order() {
        let db = prepare_test_env(&random_db_path()).await;
        let mut new_order = NewOrder::paid("u1", "shopA", Cents::from(3_000)).with_item(item("a1", 2, 1_000));
        new_order.items.push(item("a2", 1, 1_000));
        new_order.payment_reference = Some("pi_1".into());
        let order = db.insert_order(new_order).await.unwrap();
        assert_eq!(order.status, OrderStatusType::Paid);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].selected_options[0].value, "M");
        let fetched = db.fetch_order(order.id).await.unwrap().unwrap();
        assert_eq!(fetched, order);
        assert!(db.fetch_order(order.id + 1).await.unwrap().is_none());
        tear_down(db).await;
    }

    #[tokio::test]
    async fn orders_need_items() {
        let db = prepare_test_env(&random_db_path()).await;
        let err = db.insert_order(NewOrder::paid("u1", "shopA", Cents::from(100))).await.unwrap_err();
        assert!(matches!(err, OrderRepositoryError::InvalidOrder(_)));
        assert!(db.search_orders(OrderQueryFilter::default()).await.unwrap().is_empty());
        tear_down(db).await;
    }

    #[tokio::test]
    async fn duplicate_lookup_respects_the_window() {
        let db = prepare_test_env(&random_db_path()).await;
        let mut old = NewOrder::paid("u1", "shopA", Cents::from(2_000)).with_item(item("a1", 2, 1_000));
        old.created_at = Utc::now() - Duration::minutes(10);
        db.insert_order(old).await.unwrap();

        let since = Utc::now() - Duration::minutes(5);
        let key = IdempotencyKey::new("u1", "shopA", Cents::from(2_000), since);
        assert!(db.find_recent_duplicate(&key).await.unwrap().is_none());

        let recent = db
            .insert_order(NewOrder::paid("u1", "shopA", Cents::from(2_000)).with_item(item("a1", 2, 1_000)))
            .await
            .unwrap();
        assert_eq!(db.find_recent_duplicate(&key).await.unwrap().map(|o| o.id), Some(recent.id));
        // Any difference in user, shop or total is a different purchase
        for (user, shop, total) in [("u2", "shopA", 2_000), ("u1", "shopB", 2_000), ("u1", "shopA", 1_999)] {
            let key = IdempotencyKey::new(user, shop, Cents::from(total), since);
            assert!(db.find_recent_duplicate(&key).await.unwrap().is_none());
        }
        tear_down(db).await;
    }

    #[tokio::test]
    async fn directories() {
        let db = prepare_test_env(&random_db_path()).await;
        seed_marketplace(&db).await;
        let bindings = db.fetch_seller_bindings(&["shopB".to_string(), "nowhere".to_string()]).await.unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].seller_id, "sellerB");
        assert_eq!(bindings[0].provider_account_id, "acct_B");
        assert_eq!(db.fetch_seller_binding("shopA").await.unwrap().unwrap().seller_id, "sellerA");
        let user = db.fetch_user("u1").await.unwrap().unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(db.fetch_user("u9").await.unwrap().is_none());
        tear_down(db).await;
    }
}
