use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    api::{
        errors::CheckoutError,
        session_objects::{CheckoutRequest, SessionHandle, SessionSummary},
    },
    cart::{cart_total, normalize_cart, validate_cart},
    db_types::{PaymentSession, SessionId, SessionStatus},
    traits::{SessionStore, ShopDirectory},
};

pub const DEFAULT_SESSION_TTL_SECS: i64 = 1800;

/// `CheckoutApi` turns a buyer's cart into a pending payment session.
///
/// Re-submitting the same cart (in any item order) returns the existing pending session rather than creating a new
/// one, so a buyer who bounces between the cart and the payment page never accumulates parallel sessions. Pending
/// sessions for a *different* cart are stale and are deleted when a new cart is submitted.
pub struct CheckoutApi<S, B> {
    sessions: S,
    db: B,
    session_ttl: Duration,
}

impl<S, B> Debug for CheckoutApi<S, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi (ttl: {}s)", self.session_ttl.num_seconds())
    }
}

impl<S, B> CheckoutApi<S, B> {
    pub fn new(sessions: S, db: B) -> Self {
        Self { sessions, db, session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS) }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }
}

impl<S, B> CheckoutApi<S, B>
where
    S: SessionStore,
    B: ShopDirectory,
{
    pub async fn submit_cart(&self, user_id: &str, request: CheckoutRequest) -> Result<SessionHandle, CheckoutError> {
        if user_id.trim().is_empty() {
            return Err(CheckoutError::Auth("No user id was provided".into()));
        }
        validate_cart(&request.cart, request.coupon.as_ref())?;
        let normalized = normalize_cart(&request.cart);
        let total_amount = cart_total(&request.cart, request.coupon.as_ref())?;
        let mut shop_ids: Vec<String> = Vec::new();
        for item in &request.cart {
            if !shop_ids.contains(&item.shop_id) {
                shop_ids.push(item.shop_id.clone());
            }
        }
        let seller_bindings = self.db.fetch_seller_bindings(&shop_ids).await?;
        if let Some(missing) = shop_ids.iter().find(|id| !seller_bindings.iter().any(|b| &b.shop_id == *id)) {
            return Err(CheckoutError::Validation(format!("Shop {missing} is not registered with a seller")));
        }

        let mut reused = None;
        for session in self.sessions.list_by_user(user_id).await? {
            if !session.is_pending() {
                continue;
            }
            if reused.is_none() && normalize_cart(&session.cart) == normalized {
                reused = Some(session);
            } else {
                debug!("🛒️ Removing stale pending session {} for user {user_id}", session.session_id);
                self.sessions.delete(user_id, &session.session_id).await?;
            }
        }
        if let Some(session) = reused {
            info!("🛒️ Reusing pending session {} for user {user_id} (cart {})", session.session_id, normalized.fingerprint());
            return Ok(SessionHandle { session_id: session.session_id, reused: true, total_amount: session.total_amount });
        }

        let session = PaymentSession {
            session_id: SessionId::random(),
            user_id: user_id.to_string(),
            cart: request.cart,
            shipping_address_id: request.shipping_address_id,
            seller_bindings,
            total_amount,
            coupon: request.coupon,
            status: SessionStatus::Pending,
            created_at: Utc::now(),
        };
        self.sessions.put(user_id, &session.session_id, &session, self.session_ttl).await?;
        info!(
            "🛒️ Created session {} for user {user_id}. Total {total_amount} across {} shops (cart {})",
            session.session_id,
            shop_ids.len(),
            normalized.fingerprint()
        );
        Ok(SessionHandle { session_id: session.session_id, reused: false, total_amount })
    }

    /// Fetches one of the caller's sessions, mapping a missing or expired session to [`CheckoutError::NotFound`].
    pub async fn fetch_session(&self, user_id: &str, session_id: &SessionId) -> Result<PaymentSession, CheckoutError> {
        self.sessions
            .get(user_id, session_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("Session {session_id}")))
    }

    /// Confirms that a session is still waiting for payment and summarises it for the buyer.
    pub async fn verify_session(&self, user_id: &str, session_id: &SessionId) -> Result<SessionSummary, CheckoutError> {
        let session = self.fetch_session(user_id, session_id).await?;
        if !session.is_pending() {
            return Err(CheckoutError::Validation(format!("Session {session_id} has already been completed")));
        }
        Ok(SessionSummary::from(&session))
    }
}

#[cfg(test)]
mod test {
    use checkout_common::Cents;

    use super::*;
    use crate::{
        db_types::CartLineItem,
        test_utils::{
            fixtures::seed_marketplace,
            prepare_env::{prepare_test_env, random_db_path, tear_down},
        },
        MemorySessionStore,
        SqliteDatabase,
    };

    async fn setup() -> (CheckoutApi<MemorySessionStore, SqliteDatabase>, MemorySessionStore, SqliteDatabase) {
        let db = prepare_test_env(&random_db_path()).await;
        seed_marketplace(&db).await;
        let sessions = MemorySessionStore::new();
        (CheckoutApi::new(sessions.clone(), db.clone()), sessions, db)
    }

    fn item(product: &str, qty: i64, price: i64, shop: &str) -> CartLineItem {
        CartLineItem {
            product_id: product.into(),
            variation_id: None,
            quantity: qty,
            unit_price: Cents::from(price),
            shop_id: shop.into(),
            selected_options: vec![],
        }
    }

    fn request(cart: Vec<CartLineItem>) -> CheckoutRequest {
        CheckoutRequest { cart, shipping_address_id: None, coupon: None }
    }

    #[tokio::test]
    async fn identical_cart_reuses_the_session() {
        let (api, sessions, db) = setup().await;
        let first = api.submit_cart("u1", request(vec![item("a1", 1, 500, "shopA"), item("b1", 2, 300, "shopB")])).await;
        let first = first.unwrap();
        assert!(!first.reused);
        assert_eq!(first.total_amount, Cents::from(1100));
        let second = api.submit_cart("u1", request(vec![item("b1", 2, 300, "shopB"), item("a1", 1, 500, "shopA")])).await;
        let second = second.unwrap();
        assert!(second.reused);
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(sessions.list_by_user("u1").await.unwrap().len(), 1);

        let stored = sessions.get("u1", &first.session_id).await.unwrap().unwrap();
        assert_eq!(stored.seller_bindings.len(), 2);
        assert_eq!(stored.binding_for_shop("shopB").unwrap().provider_account_id, "acct_B");
        tear_down(db).await;
    }

    #[tokio::test]
    async fn changed_cart_replaces_stale_sessions() {
        let (api, sessions, db) = setup().await;
        let first = api.submit_cart("u1", request(vec![item("a1", 1, 500, "shopA")])).await.unwrap();
        let second = api.submit_cart("u1", request(vec![item("a1", 2, 500, "shopA")])).await.unwrap();
        assert!(!second.reused);
        assert_ne!(first.session_id, second.session_id);
        assert!(sessions.get("u1", &first.session_id).await.unwrap().is_none());
        let live = sessions.list_by_user("u1").await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].session_id, second.session_id);
        tear_down(db).await;
    }

    #[tokio::test]
    async fn invalid_carts_are_rejected() {
        let (api, sessions, db) = setup().await;
        let err = api.submit_cart("u1", request(vec![])).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        let err = api.submit_cart("u1", request(vec![item("z1", 1, 100, "shopZ")])).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        let err = api.submit_cart("", request(vec![item("a1", 1, 100, "shopA")])).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Auth(_)));
        assert!(sessions.is_empty().await);
        tear_down(db).await;
    }

    #[tokio::test]
    async fn oversized_quantities_are_rejected() {
        let (api, sessions, db) = setup().await;
        let err = api.submit_cart("u1", request(vec![item("a1", i64::MAX / 2, 3, "shopA")])).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        let cart = vec![item("a1", 1, i64::MAX / 2 + 1, "shopA"), item("b1", 1, i64::MAX / 2 + 1, "shopB")];
        let err = api.submit_cart("u1", request(cart)).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert!(sessions.is_empty().await);
        tear_down(db).await;
    }

    #[tokio::test]
    async fn sessions_of_a_prefixed_user_id_are_never_reused() {
        let (api, sessions, db) = setup().await;
        let cart = vec![item("a1", 1, 500, "shopA")];
        let other = api.submit_cart("u1:x", request(cart.clone())).await.unwrap();
        let mine = api.submit_cart("u1", request(cart)).await.unwrap();
        assert!(!mine.reused);
        assert_ne!(mine.session_id, other.session_id);
        // The other user's pending session was not treated as stale either
        assert!(sessions.get("u1:x", &other.session_id).await.unwrap().is_some());
        let starred = api.submit_cart("*", request(vec![item("a1", 2, 500, "shopA")])).await.unwrap();
        assert!(!starred.reused);
        assert_eq!(sessions.list_by_user("u1").await.unwrap().len(), 1);
        assert_eq!(sessions.list_by_user("u1:x").await.unwrap().len(), 1);
        tear_down(db).await;
    }

    #[tokio::test]
    async fn verify_session() {
        let (api, sessions, db) = setup().await;
        let handle = api.submit_cart("u1", request(vec![item("a1", 3, 500, "shopA")])).await.unwrap();
        let summary = api.verify_session("u1", &handle.session_id).await.unwrap();
        assert_eq!(summary.total_amount, Cents::from(1500));
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.shop_count, 1);
        assert_eq!(summary.status, SessionStatus::Pending);

        let err = api.verify_session("someone-else", &handle.session_id).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NotFound(_)));

        sessions.mark_completed("u1", &handle.session_id, api.session_ttl()).await.unwrap();
        let err = api.verify_session("u1", &handle.session_id).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        tear_down(db).await;
    }

    #[tokio::test]
    async fn expired_sessions_are_not_reused() {
        let (api, _sessions, db) = setup().await;
        let api = api.with_session_ttl(Duration::milliseconds(50));
        let cart = vec![item("a1", 1, 500, "shopA")];
        let first = api.submit_cart("u1", request(cart.clone())).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;
        let second = api.submit_cart("u1", request(cart)).await.unwrap();
        assert!(!second.reused);
        assert_ne!(first.session_id, second.session_id);
        let err = api.verify_session("u1", &first.session_id).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NotFound(_)));
        tear_down(db).await;
    }
}
