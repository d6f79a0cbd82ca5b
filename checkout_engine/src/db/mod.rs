//! Storage backends.
//!
//! * [`sqlite`] holds orders, inventory and the shop and user directories.
//! * [`memory_sessions`] and [`redis_sessions`] are the two [`crate::traits::SessionStore`] implementations.
pub mod memory_sessions;

#[cfg(feature = "redis")]
pub mod redis_sessions;

#[cfg(feature = "sqlite")]
pub mod sqlite;
