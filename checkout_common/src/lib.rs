//! Types shared between the checkout engine and the checkout server.
//!
//! * [`Cents`] is the only money type used in the system. All amounts are integer minor units.
//! * [`FeeRate`] is a fractional rate (e.g. `0.05` for 5%) that can be applied to a [`Cents`] amount.
//! * [`Secret`] hides sensitive configuration values from `Debug` and `Display` output.
mod cents;
mod fee_rate;
mod secret;

pub mod helpers;
pub mod op;

pub use cents::{Cents, CentsConversionError, DEFAULT_CURRENCY_CODE};
pub use fee_rate::{FeeRate, FeeRateError};
pub use secret::Secret;
