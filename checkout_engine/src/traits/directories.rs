use thiserror::Error;

use crate::db_types::{SellerBinding, UserProfile};

#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(e: sqlx::Error) -> Self {
        DirectoryError::DatabaseError(e.to_string())
    }
}

/// Read-only lookup of which seller owns a shop and which provider account receives its payouts.
#[allow(async_fn_in_trait)]
pub trait ShopDirectory: Clone {
    /// Returns bindings for those of `shop_ids` that are known. Unknown shops are silently omitted.
    async fn fetch_seller_bindings(&self, shop_ids: &[String]) -> Result<Vec<SellerBinding>, DirectoryError>;

    async fn fetch_seller_binding(&self, shop_id: &str) -> Result<Option<SellerBinding>, DirectoryError> {
        let bindings = self.fetch_seller_bindings(&[shop_id.to_string()]).await?;
        Ok(bindings.into_iter().next())
    }
}

#[allow(async_fn_in_trait)]
pub trait UserDirectory: Clone {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>, DirectoryError>;
}
