use thiserror::Error;

use crate::{
    cart::CartError,
    traits::{
        DirectoryError,
        InventoryError,
        OrderRepositoryError,
        PaymentProviderError,
        SessionStoreError,
    },
};

/// The error type returned by every engine API.
///
/// The variants map one-to-one onto how a caller should react: fix the request (`Validation`), stop asking
/// (`NotFound`), use different credentials (`Auth`), or retry later (`Storage`, `PaymentProvider`).
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not authorized: {0}")]
    Auth(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Payment provider error: {0}")]
    PaymentProvider(String),
}

impl CheckoutError {
    /// `true` if repeating the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CheckoutError::Storage(_) | CheckoutError::PaymentProvider(_))
    }
}

impl From<CartError> for CheckoutError {
    fn from(e: CartError) -> Self {
        CheckoutError::Validation(e.to_string())
    }
}

impl From<SessionStoreError> for CheckoutError {
    fn from(e: SessionStoreError) -> Self {
        match e {
            SessionStoreError::NotFound(id) => CheckoutError::NotFound(format!("Session {id}")),
            SessionStoreError::AlreadyCompleted(id) => {
                CheckoutError::Validation(format!("Session {id} has already been completed"))
            },
            // A stored session that cannot be read now never will be
            SessionStoreError::Serialization(s) => CheckoutError::Validation(format!("Corrupt session: {s}")),
            SessionStoreError::Unreachable(s) => CheckoutError::Storage(s),
        }
    }
}

impl From<OrderRepositoryError> for CheckoutError {
    fn from(e: OrderRepositoryError) -> Self {
        match e {
            OrderRepositoryError::OrderNotFound(id) => CheckoutError::NotFound(format!("Order #{id}")),
            OrderRepositoryError::InvalidOrder(s) => CheckoutError::Validation(s),
            e => CheckoutError::Storage(e.to_string()),
        }
    }
}

impl From<InventoryError> for CheckoutError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::DatabaseError(s) => CheckoutError::Storage(s),
            e => CheckoutError::Validation(e.to_string()),
        }
    }
}

impl From<DirectoryError> for CheckoutError {
    fn from(e: DirectoryError) -> Self {
        CheckoutError::Storage(e.to_string())
    }
}

impl From<PaymentProviderError> for CheckoutError {
    fn from(e: PaymentProviderError) -> Self {
        CheckoutError::PaymentProvider(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::SessionId;

    #[test]
    fn session_store_errors() {
        let id = SessionId::random();
        let err = CheckoutError::from(SessionStoreError::Serialization("expected value at line 1".into()));
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert!(!err.is_transient());
        let err = CheckoutError::from(SessionStoreError::Unreachable("connection refused".into()));
        assert!(matches!(err, CheckoutError::Storage(_)));
        assert!(err.is_transient());
        assert!(matches!(CheckoutError::from(SessionStoreError::NotFound(id)), CheckoutError::NotFound(_)));
        let err = CheckoutError::from(SessionStoreError::AlreadyCompleted(id));
        assert!(matches!(err, CheckoutError::Validation(_)));
    }
}
