use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{SellerBinding, UserProfile},
    traits::DirectoryError,
};

pub async fn fetch_seller_bindings(
    shop_ids: &[String],
    conn: &mut SqliteConnection,
) -> Result<Vec<SellerBinding>, DirectoryError> {
    if shop_ids.is_empty() {
        return Ok(vec![]);
    }
    let mut builder =
        QueryBuilder::<Sqlite>::new("SELECT id AS shop_id, seller_id, provider_account_id FROM shops WHERE id IN (");
    let mut ids = builder.separated(", ");
    for id in shop_ids {
        ids.push_bind(id.clone());
    }
    builder.push(")");
    let bindings = builder.build_query_as::<SellerBinding>().fetch_all(conn).await?;
    Ok(bindings)
}

pub async fn fetch_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<UserProfile>, DirectoryError> {
    let user = sqlx::query_as("SELECT id, name, email FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}
