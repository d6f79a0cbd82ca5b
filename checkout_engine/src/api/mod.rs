//! The engine's public API.
//!
//! Each API struct is generic over the backend traits it needs, so the same logic runs against SQLite, Redis or the
//! in-memory stores used in tests.
pub mod checkout_api;
pub mod errors;
pub mod inventory_api;
pub mod notifications;
pub mod payment_intent_api;
pub mod reconcile_objects;
pub mod reconciler;
pub mod report_api;
pub mod session_objects;
