use checkout_common::Cents;
use log::*;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use super::{from_millis, to_millis};
use crate::{
    db_types::{NewOrder, Order, OrderItem, SelectedOption},
    traits::{OrderQueryFilter, OrderRepositoryError},
};

#[derive(Debug, FromRow)]
struct OrderRow {
    id: i64,
    user_id: String,
    shop_id: String,
    total: i64,
    status: String,
    delivery_status: String,
    shipping_address_id: Option<String>,
    coupon_code: Option<String>,
    discount_amount: i64,
    payment_reference: Option<String>,
    created_at: i64,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, OrderRepositoryError> {
        let created_at = from_millis(self.created_at).ok_or_else(|| {
            OrderRepositoryError::InvalidOrder(format!("Order #{} has an invalid timestamp: {}", self.id, self.created_at))
        })?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            shop_id: self.shop_id,
            total: Cents::from(self.total),
            status: self.status.into(),
            delivery_status: self.delivery_status.into(),
            shipping_address_id: self.shipping_address_id,
            coupon_code: self.coupon_code,
            discount_amount: Cents::from(self.discount_amount),
            payment_reference: self.payment_reference,
            created_at,
            items,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: String,
    variation_id: Option<String>,
    quantity: i64,
    price: i64,
    selected_options: String,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = OrderRepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let selected_options = serde_json::from_str::<Vec<SelectedOption>>(&row.selected_options).map_err(|e| {
            OrderRepositoryError::InvalidOrder(format!("Order item {} has invalid options. {e}", row.id))
        })?;
        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            variation_id: row.variation_id,
            quantity: row.quantity,
            price: Cents::from(row.price),
            selected_options,
        })
    }
}

/// Inserts a new order and its items using the given connection. This is not atomic. Embed this call inside a
/// transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderRepositoryError> {
    if order.items.is_empty() {
        return Err(OrderRepositoryError::InvalidOrder("An order must have at least one item".into()));
    }
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO orders (
                user_id,
                shop_id,
                total,
                status,
                delivery_status,
                shipping_address_id,
                coupon_code,
                discount_amount,
                payment_reference,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id;
        "#,
    )
    .bind(&order.user_id)
    .bind(&order.shop_id)
    .bind(order.total.value())
    .bind(order.status.to_string())
    .bind(order.delivery_status.to_string())
    .bind(&order.shipping_address_id)
    .bind(&order.coupon_code)
    .bind(order.discount_amount.value())
    .bind(&order.payment_reference)
    .bind(to_millis(order.created_at))
    .fetch_one(&mut *conn)
    .await?;
    for item in &order.items {
        let options = serde_json::to_string(&item.selected_options)
            .map_err(|e| OrderRepositoryError::InvalidOrder(e.to_string()))?;
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, product_id, variation_id, quantity, price, selected_options)
                VALUES ($1, $2, $3, $4, $5, $6);
            "#,
        )
        .bind(id)
        .bind(&item.product_id)
        .bind(&item.variation_id)
        .bind(item.quantity)
        .bind(item.price.value())
        .bind(options)
        .execute(&mut *conn)
        .await?;
    }
    debug!(
        "🗃️ Order #{id} inserted for user {} at shop {} with {} items",
        order.user_id,
        order.shop_id,
        order.items.len()
    );
    fetch_order(id, conn).await?.ok_or(OrderRepositoryError::OrderNotFound(id))
}

async fn fetch_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, OrderRepositoryError> {
    let rows: Vec<OrderItemRow> = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    rows.into_iter().map(OrderItem::try_from).collect()
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, OrderRepositoryError> {
    let row: Option<OrderRow> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => {
            let items = fetch_items(row.id, conn).await?;
            Ok(Some(row.into_order(items)?))
        },
        None => Ok(None),
    }
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, OrderRepositoryError> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(shop_id) = query.shop_id {
        where_clause.push("shop_id = ");
        where_clause.push_bind_unseparated(shop_id);
    }
    if let Some(total) = query.total {
        where_clause.push("total = ");
        where_clause.push_bind_unseparated(total.value());
    }
    if let Some(status) = query.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(to_millis(since));
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let rows: Vec<OrderRow> = builder.build_query_as().fetch_all(&mut *conn).await?;
    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        let items = fetch_items(row.id, conn).await?;
        orders.push(row.into_order(items)?);
    }
    Ok(orders)
}
