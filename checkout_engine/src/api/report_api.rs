use std::fmt::Debug;

use checkout_common::Cents;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    api::errors::CheckoutError,
    db_types::Order,
    fees::{compute_earnings, EarningsView, FeeSchedule},
    traits::{OrderQueryFilter, OrderRepository, ShopDirectory},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithEarnings {
    #[serde(flatten)]
    pub order: Order,
    pub earnings: EarningsView,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSummary {
    pub order_count: usize,
    pub total_order_value: Cents,
    pub total_admin_fees: Cents,
    pub total_seller_earnings: Cents,
}

/// Read-only order reporting for sellers and admins.
///
/// Every figure is shown with the reporting split from the admin fee rate. This is not the same as the platform fee
/// that was withheld when the charge was made.
pub struct OrderReportApi<B> {
    db: B,
    fees: FeeSchedule,
}

impl<B> Debug for OrderReportApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderReportApi (admin fee {})", self.fees.admin_fee_rate)
    }
}

impl<B> OrderReportApi<B> {
    pub fn new(db: B, fees: FeeSchedule) -> Self {
        Self { db, fees }
    }

    fn with_earnings(&self, order: Order) -> Result<OrderWithEarnings, CheckoutError> {
        let earnings = compute_earnings(order.total, self.fees.admin_fee_rate)
            .map_err(|e| CheckoutError::Validation(e.to_string()))?;
        Ok(OrderWithEarnings { order, earnings })
    }
}

impl<B> OrderReportApi<B>
where B: OrderRepository + ShopDirectory
{
    async fn check_shop_owner(&self, seller_id: &str, shop_id: &str) -> Result<(), CheckoutError> {
        let binding = self
            .db
            .fetch_seller_binding(shop_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("Shop {shop_id}")))?;
        if binding.seller_id != seller_id {
            warn!("📊️ Seller {seller_id} tried to read orders for shop {shop_id}, which belongs to someone else");
            return Err(CheckoutError::Auth(format!("Shop {shop_id} does not belong to seller {seller_id}")));
        }
        Ok(())
    }

    pub async fn orders_for_shop(&self, seller_id: &str, shop_id: &str) -> Result<Vec<OrderWithEarnings>, CheckoutError> {
        self.check_shop_owner(seller_id, shop_id).await?;
        let orders = self.db.fetch_orders_for_shop(shop_id).await?;
        trace!("📊️ {} orders for shop {shop_id}", orders.len());
        orders.into_iter().map(|o| self.with_earnings(o)).collect()
    }

    pub async fn order_for_seller(&self, seller_id: &str, order_id: i64) -> Result<OrderWithEarnings, CheckoutError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| CheckoutError::NotFound(format!("Order #{order_id}")))?;
        self.check_shop_owner(seller_id, &order.shop_id).await?;
        self.with_earnings(order)
    }

    pub async fn platform_summary(&self) -> Result<PlatformSummary, CheckoutError> {
        let orders = self.db.search_orders(OrderQueryFilter::default()).await?;
        let mut summary = PlatformSummary::default();
        for order in orders {
            let view = self.with_earnings(order)?;
            summary.order_count += 1;
            summary.total_order_value += view.order.total;
            summary.total_admin_fees += view.earnings.admin_fee;
            summary.total_seller_earnings += view.earnings.seller_earnings;
        }
        Ok(summary)
    }
}
