//! Adapters between the checkout engine's backend traits and the outside world.
pub mod mail_service;
pub mod notification_bus;
pub mod stripe;
