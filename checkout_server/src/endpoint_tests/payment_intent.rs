use actix_web::{http::StatusCode, test::TestRequest, web};
use checkout_common::Cents;
use checkout_engine::{
    db_types::SessionId,
    fees::FeeSchedule,
    session_objects::CheckoutRequest,
    traits::{PaymentIntent, PaymentProviderError},
    CheckoutApi,
    MemorySessionStore,
    PaymentIntentGateway,
};
use serde_json::{json, Value};

use super::{
    helpers::{bindings_for, call, line},
    mocks::{MockProvider, MockShops},
};
use crate::{auth::USER_ID_HEADER, routes::CreatePaymentIntentRoute};

fn shops() -> MockShops {
    let mut shops = MockShops::new();
    shops.expect_fetch_seller_bindings().returning(|ids| Ok(bindings_for(ids)));
    shops
}

/// Creates a pending 3000c session for u1 across shopA and shopB
async fn pending_session(store: &MemorySessionStore) -> SessionId {
    let api = CheckoutApi::new(store.clone(), shops());
    let request = CheckoutRequest {
        cart: vec![line("a1", 2, 1000, "shopA"), line("b1", 1, 1000, "shopB")],
        shipping_address_id: None,
        coupon: None,
    };
    api.submit_cart("u1", request).await.unwrap().session_id
}

fn configure(store: MemorySessionStore, provider: MockProvider) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let checkout = CheckoutApi::new(store, shops());
        let gateway = PaymentIntentGateway::new(provider, FeeSchedule::default());
        cfg.service(CreatePaymentIntentRoute::<MemorySessionStore, MockShops, MockProvider>::new())
            .app_data(web::Data::new(checkout))
            .app_data(web::Data::new(gateway));
    }
}

fn intent_request(body: Value) -> TestRequest {
    TestRequest::post().uri("/payment-intent").insert_header((USER_ID_HEADER, "u1")).set_json(body)
}

fn unused_provider() -> MockProvider {
    let mut provider = MockProvider::new();
    provider.expect_create_payment_intent().times(0);
    provider
}

#[actix_web::test]
async fn create_intent() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let session_id = pending_session(&store).await;
    let expected_session = session_id.to_string();
    let mut provider = MockProvider::new();
    provider
        .expect_create_payment_intent()
        .withf(move |req| {
            req.amount == Cents::from(3000) &&
                req.application_fee == Cents::from(150) &&
                req.destination_account_id == "acct_A" &&
                req.metadata.session_id == expected_session &&
                req.metadata.user_id == "u1"
        })
        .times(1)
        .returning(|_| Ok(PaymentIntent { id: "pi_123".into(), client_secret: "pi_123_secret_abc".into() }));
    let body = json!({"amount": 3000, "sellerStripeAccountId": "acct_A", "sessionId": session_id.to_string()});
    let (status, body) = call(intent_request(body), configure(store, provider)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"clientSecret":"pi_123_secret_abc"}"#);
}

#[actix_web::test]
async fn amount_must_match_the_session() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let session_id = pending_session(&store).await;
    let body = json!({"amount": 2999, "sellerStripeAccountId": "acct_A", "sessionId": session_id.to_string()});
    let (status, body) = call(intent_request(body), configure(store, unused_provider())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("does not match"));
}

#[actix_web::test]
async fn destination_must_belong_to_the_session() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let session_id = pending_session(&store).await;
    let body = json!({"amount": 3000, "sellerStripeAccountId": "acct_Z", "sessionId": session_id.to_string()});
    let (status, body) = call(intent_request(body), configure(store, unused_provider())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("acct_Z"));
}

#[actix_web::test]
async fn session_id_is_required() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let body = json!({"amount": 3000, "sellerStripeAccountId": "acct_A"});
    let (status, _) = call(intent_request(body), configure(store.clone(), unused_provider())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = json!({"amount": 3000, "sellerStripeAccountId": "acct_A", "sessionId": "  "});
    let (status, _) = call(intent_request(body), configure(store, unused_provider())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_session() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let body = json!({"amount": 3000, "sellerStripeAccountId": "acct_A", "sessionId": SessionId::random().to_string()});
    let (status, _) = call(intent_request(body), configure(store, unused_provider())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn provider_rejects_the_intent() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let session_id = pending_session(&store).await;
    let mut provider = MockProvider::new();
    provider
        .expect_create_payment_intent()
        .times(1)
        .returning(|_| Err(PaymentProviderError::Rejected("No such destination: 'acct_A'".into())));
    let body = json!({"amount": 3000, "sellerStripeAccountId": "acct_A", "sessionId": session_id.to_string()});
    let (status, body) = call(intent_request(body), configure(store, provider)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("No such destination"));
}

#[actix_web::test]
async fn intent_requires_a_buyer() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let req = TestRequest::post().uri("/payment-intent").set_json(json!({"amount": 3000, "sessionId": "x"}));
    let (status, _) = call(req, configure(store, unused_provider())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
