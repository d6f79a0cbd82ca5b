use std::fmt::Debug;

use checkout_common::Cents;
use log::*;
use serde_json::json;

use crate::{
    db_types::{Order, UserProfile},
    events::{EventProducers, NotificationEvent, NotificationRecipient, OrderCreatedEvent},
    traits::Mailer,
};

pub const ORDER_CONFIRMATION_TEMPLATE: &str = "order_confirmation";

/// Fans out the side effects of newly created orders: in-app notifications via the event channel and a confirmation
/// email to the buyer.
///
/// Nothing here can fail from the caller's point of view. Delivery problems are logged and swallowed.
#[derive(Clone)]
pub struct NotificationFanout<M> {
    producers: EventProducers,
    mailer: M,
}

impl<M> Debug for NotificationFanout<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationFanout ({} notification subscribers)", self.producers.notification_producer.len())
    }
}

impl<M> NotificationFanout<M> {
    pub fn new(producers: EventProducers, mailer: M) -> Self {
        Self { producers, mailer }
    }
}

impl<M> NotificationFanout<M>
where M: Mailer
{
    pub async fn notify_seller(&self, seller_id: &str, creator_id: &str, title: &str, message: &str, link: &str) {
        let event = NotificationEvent::new(NotificationRecipient::Seller(seller_id.to_string()), title, message)
            .with_creator(creator_id)
            .with_link(link);
        self.publish(event).await;
    }

    pub async fn notify_admins(&self, creator_id: &str, title: &str, message: &str, link: &str) {
        let event = NotificationEvent::new(NotificationRecipient::Admins, title, message)
            .with_creator(creator_id)
            .with_link(link);
        self.publish(event).await;
    }

    pub async fn order_created(&self, order: &Order) {
        for emitter in &self.producers.order_created_producer {
            emitter.publish_event(OrderCreatedEvent::new(order.clone())).await;
        }
    }

    async fn publish(&self, event: NotificationEvent) {
        if self.producers.notification_producer.is_empty() {
            debug!("🔔️ No notification subscribers. Dropping \"{}\" for {}", event.title, event.recipient.receiver_id());
        }
        for emitter in &self.producers.notification_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    /// Sends the buyer a single confirmation email covering every order created from their checkout.
    pub async fn send_order_confirmation(&self, user: &UserProfile, orders: &[Order]) {
        if orders.is_empty() {
            return;
        }
        let total: Cents = orders.iter().map(|o| o.total).sum();
        let data = json!({
            "name": user.name,
            "orders": orders.iter().map(|o| json!({
                "id": o.id,
                "shopId": o.shop_id,
                "total": o.total,
                "items": o.items.iter().map(|i| json!({
                    "productId": i.product_id,
                    "variationId": i.variation_id,
                    "quantity": i.quantity,
                    "price": i.price,
                })).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
            "total": total,
        });
        match self.mailer.send(ORDER_CONFIRMATION_TEMPLATE, &user.email, data).await {
            Ok(()) => debug!("📧️ Order confirmation for {} orders sent to user {}", orders.len(), user.id),
            Err(e) => warn!("📧️ Could not send order confirmation to user {}: {e}", user.id),
        }
    }
}
