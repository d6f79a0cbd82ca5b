//! # Backend contracts
//!
//! The engine never talks to a database, cache, payment provider or mail service directly. Instead, it is generic
//! over the traits in this module, and concrete backends implement them.
//!
//! * [`SessionStore`] holds pending checkout sessions with a per-entry TTL.
//! * [`OrderRepository`] is durable order storage, including the idempotency lookup used by the reconciler.
//! * [`InventoryManagement`] performs conditional stock decrements and purchase analytics.
//! * [`ShopDirectory`] and [`UserDirectory`] are read-only lookups owned by other parts of the marketplace.
//! * [`PaymentProvider`] creates charge authorisations.
//! * [`Mailer`] sends templated email.
//!
//! [`CheckoutDatabase`] bundles the traits that a single durable backend (e.g. `SqliteDatabase`) provides.
mod checkout_database;
mod directories;
mod inventory_management;
mod mailer;
mod order_repository;
mod payment_provider;
mod session_store;

pub use checkout_database::CheckoutDatabase;
pub use directories::{DirectoryError, ShopDirectory, UserDirectory};
pub use inventory_management::{InventoryError, InventoryManagement, StockUpdate};
pub use mailer::{Mailer, MailerError};
pub use order_repository::{IdempotencyKey, OrderQueryFilter, OrderRepository, OrderRepositoryError};
pub use payment_provider::{IntentMetadata, PaymentIntent, PaymentIntentRequest, PaymentProvider, PaymentProviderError};
pub use session_store::{session_key, user_key_pattern, user_key_prefix, SessionStore, SessionStoreError};
