use std::sync::Arc;

use checkout_engine::events::{EventHandlers, EventHooks, NotificationEvent, OrderCreatedEvent};
use futures::future::BoxFuture;
use log::*;
use reqwest::Client;
use serde::Serialize;

/// The payload that the notification bus expects for an in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusNotification {
    pub title: String,
    pub message: String,
    pub creator_id: Option<String>,
    pub receiver_id: String,
    pub redirect_link: Option<String>,
}

impl From<NotificationEvent> for BusNotification {
    fn from(ev: NotificationEvent) -> Self {
        Self {
            receiver_id: ev.recipient.receiver_id().to_string(),
            title: ev.title,
            message: ev.message,
            creator_id: ev.creator_id,
            redirect_link: ev.redirect_link,
        }
    }
}

/// Wires the engine's notification and order events to the outside world.
///
/// 1. NotificationEvent - POSTed as JSON to the notification bus, if one is configured. Otherwise the notification is
///    logged and dropped.
/// 2. OrderCreatedEvent - logged. This is the place to hook in search indexing or fulfilment systems.
pub fn create_notification_event_handlers(bus_url: Option<String>, buffer_size: usize) -> EventHandlers {
    let mut hooks = EventHooks::default();
    let client = Arc::new(Client::new());
    // --- On Notification Handler ---
    hooks.on_notification(move |ev| {
        let Some(url) = bus_url.clone() else {
            info!("🔔️ [{}] {}: {}", ev.recipient.receiver_id(), ev.title, ev.message);
            return no_op();
        };
        let client = Arc::clone(&client);
        Box::pin(async move {
            let notification = BusNotification::from(ev);
            match client.post(&url).json(&notification).send().await {
                Ok(res) if res.status().is_success() => {
                    debug!("🔔️ Notification \"{}\" delivered to {}", notification.title, notification.receiver_id)
                },
                Ok(res) => warn!(
                    "🔔️ Notification bus rejected \"{}\" for {}. Status {}",
                    notification.title,
                    notification.receiver_id,
                    res.status()
                ),
                Err(e) => error!("🔔️ Could not reach the notification bus. {e}"),
            }
        })
    });
    // --- On OrderCreated Handler ---
    hooks.on_order_created(|ev: OrderCreatedEvent| {
        let order = ev.order;
        info!(
            "🔔️ Order #{} created for shop {} (user {}, total {}, {} items)",
            order.id,
            order.shop_id,
            order.user_id,
            order.total,
            order.items.len()
        );
        no_op()
    });
    EventHandlers::new(buffer_size, hooks)
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
