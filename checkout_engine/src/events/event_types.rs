use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationRecipient {
    Seller(String),
    /// Every administrator on the platform
    Admins,
}

impl NotificationRecipient {
    /// The receiver id used on the notification bus. Admin-wide notifications go to `admin`.
    pub fn receiver_id(&self) -> &str {
        match self {
            NotificationRecipient::Seller(id) => id.as_str(),
            NotificationRecipient::Admins => "admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub title: String,
    pub message: String,
    /// The user whose action triggered the notification
    pub creator_id: Option<String>,
    pub recipient: NotificationRecipient,
    pub redirect_link: Option<String>,
}

impl NotificationEvent {
    pub fn new<S: Into<String>>(recipient: NotificationRecipient, title: S, message: S) -> Self {
        Self { title: title.into(), message: message.into(), creator_id: None, recipient, redirect_link: None }
    }

    pub fn with_creator<S: Into<String>>(mut self, creator_id: S) -> Self {
        self.creator_id = Some(creator_id.into());
        self
    }

    pub fn with_link<S: Into<String>>(mut self, link: S) -> Self {
        self.redirect_link = Some(link.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
