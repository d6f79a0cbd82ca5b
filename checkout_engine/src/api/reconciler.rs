//! Webhook reconciliation: turning a confirmed payment into orders, exactly once.
//!
//! Payment providers deliver webhooks *at least* once, and may deliver the same event concurrently. The reconciler
//! does not take locks. Instead it relies on three guards:
//! 1. A session that no longer exists has already been reconciled (or expired), so the event is a no-op.
//! 2. The session is marked `completed` before any order is written.
//! 3. Before creating each shop's order, the order repository is checked for a paid order with the same user, shop
//!    and total created within the duplicate window.
//!
//! Each shop group is processed independently. A failure in one group is logged and reported in the outcome, but
//! never prevents the other groups from being created.
use std::fmt::Debug;

use checkout_common::Cents;
use chrono::{Duration, Utc};
use log::*;

use crate::{
    api::{
        checkout_api::DEFAULT_SESSION_TTL_SECS,
        errors::CheckoutError,
        inventory_api::InventoryAdjuster,
        notifications::NotificationFanout,
        reconcile_objects::{
            partition_by_shop,
            ConfirmationEvent,
            EventKind,
            GroupOutcome,
            GroupStage,
            ReconcileOutcome,
            ShopGroup,
        },
    },
    db_types::{NewOrder, NewOrderItem, Order, PaymentSession, SessionId},
    traits::{CheckoutDatabase, IdempotencyKey, Mailer, SessionStore, SessionStoreError},
};

pub const DEFAULT_DUPLICATE_WINDOW_SECS: i64 = 300;

pub struct WebhookReconciler<S, B, M> {
    sessions: S,
    db: B,
    inventory: InventoryAdjuster<B>,
    notifier: NotificationFanout<M>,
    session_ttl: Duration,
    duplicate_window: Duration,
}

impl<S, B, M> Debug for WebhookReconciler<S, B, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookReconciler (duplicate window: {}s)", self.duplicate_window.num_seconds())
    }
}

impl<S, B: Clone, M> WebhookReconciler<S, B, M> {
    pub fn new(sessions: S, db: B, notifier: NotificationFanout<M>) -> Self {
        let inventory = InventoryAdjuster::new(db.clone());
        Self {
            sessions,
            db,
            inventory,
            notifier,
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            duplicate_window: Duration::seconds(DEFAULT_DUPLICATE_WINDOW_SECS),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_duplicate_window(mut self, window: Duration) -> Self {
        self.duplicate_window = window;
        self
    }
}

impl<S, B, M> WebhookReconciler<S, B, M>
where
    S: SessionStore,
    B: CheckoutDatabase,
    M: Mailer,
{
    /// Processes a payment confirmation event.
    ///
    /// Errors returned from here happen before any order was written:
    /// * [`CheckoutError::Validation`] if the event metadata does not identify a session, or the session's cart
    ///   cannot be priced. Retrying will not help.
    /// * [`CheckoutError::NotFound`] if the session does not exist. This is the normal outcome of a redelivered event.
    /// * [`CheckoutError::Storage`] if the session store could not be reached. The provider should retry.
    ///
    /// Failures while materialising individual shop groups are reported in [`ReconcileOutcome::Processed`].
    pub async fn handle_event(&self, event: ConfirmationEvent) -> Result<ReconcileOutcome, CheckoutError> {
        if event.kind != EventKind::ChargeSucceeded {
            debug!("🧾️ Ignoring {} event {}", event.kind, event.event_id);
            return Ok(ReconcileOutcome::Ignored { kind: event.kind });
        }
        let (user_id, session_id) = event.session_ref()?;
        let session = self
            .sessions
            .get(&user_id, &session_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("Session {session_id}")))?;
        let groups = partition_by_shop(&session)?;
        self.complete_session(&user_id, &session_id).await?;

        debug!("🧾️ Session {session_id} spans {} shops", groups.len());
        let mut outcomes = Vec::with_capacity(groups.len());
        for group in groups {
            let outcome = self.materialize_group(&session, group, event.payment_reference.as_deref()).await;
            outcomes.push(outcome);
        }
        let created = outcomes.iter().filter_map(GroupOutcome::created_order).cloned().collect::<Vec<Order>>();
        if !created.is_empty() {
            self.confirm_to_buyer(&user_id, &created).await;
        }
        // Admins hear about every confirmed payment, even one whose groups were all duplicates or failures
        let total = created.iter().map(|o| o.total).sum::<Cents>();
        let message = format!(
            "Payment for session {session_id} confirmed. {} new order(s) totalling {total} were placed by user {user_id}",
            created.len()
        );
        self.notifier.notify_admins(&user_id, "New order placed", &message, "/admin/orders").await;

        if let Err(e) = self.sessions.delete(&user_id, &session_id).await {
            // The session is already completed, so it is harmless until its TTL runs out
            warn!("🧾️ Could not delete session {session_id} after reconciliation: {e}");
        }
        let orders_created = created.len();
        info!(
            "🧾️ Event {} reconciled session {session_id}. {orders_created} of {} shop orders created",
            event.event_id,
            outcomes.len()
        );
        Ok(ReconcileOutcome::Processed { orders_created, groups: outcomes })
    }

    async fn complete_session(&self, user_id: &str, session_id: &SessionId) -> Result<(), CheckoutError> {
        match self.sessions.mark_completed(user_id, session_id, self.session_ttl).await {
            Ok(_) => Ok(()),
            Err(SessionStoreError::AlreadyCompleted(_)) => {
                warn!(
                    "🧾️ Session {session_id} was already completed. Another delivery of this event is probably in \
                     flight. Continuing; the duplicate check will stop any double orders."
                );
                Ok(())
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn materialize_group(
        &self,
        session: &PaymentSession,
        group: ShopGroup,
        payment_reference: Option<&str>,
    ) -> GroupOutcome {
        let shop_id = group.shop_id.clone();
        let total = group.total();
        let key = IdempotencyKey::new(&session.user_id, &shop_id, total, Utc::now() - self.duplicate_window);
        match self.db.find_recent_duplicate(&key).await {
            Ok(Some(existing)) => {
                info!(
                    "🧾️ Order #{} already exists for user {} at shop {shop_id} ({total}). Skipping",
                    existing.id, session.user_id
                );
                return GroupOutcome::SkippedDuplicate { shop_id, existing_order_id: existing.id };
            },
            Ok(None) => {},
            Err(e) => {
                error!("🧾️ Duplicate check failed for shop {shop_id} in session {}: {e}", session.session_id);
                return GroupOutcome::Failed {
                    shop_id,
                    stage: GroupStage::DuplicateCheck,
                    reason: e.to_string(),
                    order_id: None,
                };
            },
        }

        let order = match self.db.insert_order(new_order_for_group(session, &group, payment_reference)).await {
            Ok(order) => order,
            Err(e) => {
                error!("🧾️ Could not create order for shop {shop_id} in session {}: {e}", session.session_id);
                return GroupOutcome::Failed { shop_id, stage: GroupStage::OrderInsert, reason: e.to_string(), order_id: None };
            },
        };
        debug!("🧾️ Order #{} created for shop {shop_id}", order.id);

        // Every item is attempted. Failures are collected, never short-circuited
        let mut failures = Vec::new();
        for item in &group.items {
            if let Err(e) = self.inventory.decrement(&item.product_id, item.variation_id.as_deref(), item.quantity).await {
                error!(
                    "🧾️ Inventory update failed for order #{} (shop {shop_id}, product {}): {e}. The order has been kept \
                     and needs manual follow-up",
                    order.id, item.product_id
                );
                failures.push(format!("{}: {e}", item.line_id()));
            }
        }

        self.notify_seller(session, &order, group.item_count()).await;
        self.notifier.order_created(&order).await;
        if failures.is_empty() {
            return GroupOutcome::Created { order };
        }
        let reason = failures.join("; ");
        let message = format!("Order #{} for shop {shop_id} was kept but its stock was not fully updated: {reason}", order.id);
        let link = format!("/admin/orders/{}", order.id);
        self.notifier.notify_admins(&session.user_id, "Inventory update failed", &message, &link).await;
        GroupOutcome::Failed { shop_id, stage: GroupStage::Inventory, reason, order_id: Some(order.id) }
    }

    async fn notify_seller(&self, session: &PaymentSession, order: &Order, item_count: i64) {
        let seller_id = match session.binding_for_shop(&order.shop_id) {
            Some(binding) => Some(binding.seller_id.clone()),
            None => match self.db.fetch_seller_binding(&order.shop_id).await {
                Ok(binding) => binding.map(|b| b.seller_id),
                Err(e) => {
                    warn!("🧾️ Could not look up the seller for shop {}: {e}", order.shop_id);
                    None
                },
            },
        };
        let Some(seller_id) = seller_id else {
            warn!("🧾️ Shop {} has no seller. No new order notification sent for order #{}", order.shop_id, order.id);
            return;
        };
        let message = format!("Order #{} for {item_count} item(s) totalling {}", order.id, order.total);
        let link = format!("/seller/orders/{}", order.id);
        self.notifier.notify_seller(&seller_id, &session.user_id, "New order received", &message, &link).await;
    }

    async fn confirm_to_buyer(&self, user_id: &str, orders: &[Order]) {
        match self.db.fetch_user(user_id).await {
            Ok(Some(user)) => self.notifier.send_order_confirmation(&user, orders).await,
            Ok(None) => warn!("🧾️ User {user_id} is not in the user directory. No confirmation email sent"),
            Err(e) => warn!("🧾️ Could not look up user {user_id} for the confirmation email: {e}"),
        }
    }
}

fn new_order_for_group(session: &PaymentSession, group: &ShopGroup, payment_reference: Option<&str>) -> NewOrder {
    let discount = group.discount();
    let mut order = NewOrder::paid(&session.user_id, &group.shop_id, group.total());
    order.shipping_address_id = session.shipping_address_id.clone();
    order.discount_amount = discount;
    if discount.is_positive() {
        order.coupon_code = session.coupon.as_ref().map(|c| c.code.clone());
    }
    order.payment_reference = payment_reference.map(String::from);
    order.items = group.items.iter().map(NewOrderItem::from).collect();
    order
}
