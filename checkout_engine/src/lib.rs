//! Checkout Engine
//!
//! The checkout engine turns a buyer's cart into paid, per-vendor orders on a multi-vendor marketplace.
//!
//! A cart is first captured as a short-lived *payment session*. The payment provider later confirms the charge
//! asynchronously via a webhook, and the engine must turn that confirmation into exactly one order per shop in the
//! cart, decrement inventory and notify everyone involved. Webhooks can arrive more than once, and sessions can
//! expire while a payment is in flight, so every step is guarded to be idempotent.
//!
//! The library is divided into these main sections:
//! 1. Backend contracts ([`mod@traits`]). The engine is provider-agnostic. Session storage, order storage,
//!    inventory, directories, payments and mail are all consumed through traits.
//! 2. Backends ([`SqliteDatabase`], [`MemorySessionStore`] and, with the `redis` feature, [`RedisSessionStore`]).
//! 3. The public API: [`CheckoutApi`] for session creation, [`PaymentIntentGateway`] for charge authorisations,
//!    [`WebhookReconciler`] for order materialisation and [`OrderReportApi`] for seller and admin reporting.
//!
//! The engine also emits events ([`mod@events`]) for notifications and new orders. Hooks can be attached to these to
//! forward notifications to a message bus or anywhere else.
mod api;
mod db;

pub mod cart;
pub mod db_types;
pub mod events;
pub mod fees;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    checkout_api::{CheckoutApi, DEFAULT_SESSION_TTL_SECS},
    errors::CheckoutError,
    inventory_api::InventoryAdjuster,
    notifications::{NotificationFanout, ORDER_CONFIRMATION_TEMPLATE},
    payment_intent_api::{IntentCreated, PaymentIntentGateway},
    reconcile_objects,
    reconciler::{WebhookReconciler, DEFAULT_DUPLICATE_WINDOW_SECS},
    report_api::{OrderReportApi, OrderWithEarnings, PlatformSummary},
    session_objects,
};
pub use db::memory_sessions::MemorySessionStore;
#[cfg(feature = "redis")]
pub use db::redis_sessions::RedisSessionStore;
#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
