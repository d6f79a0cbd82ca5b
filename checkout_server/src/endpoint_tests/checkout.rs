use actix_web::{http::StatusCode, test::TestRequest, web};
use checkout_engine::{session_objects::SessionHandle, CheckoutApi, MemorySessionStore};
use serde_json::{json, Value};

use super::{
    helpers::{bindings_for, call},
    mocks::MockShops,
};
use crate::{
    auth::USER_ID_HEADER,
    routes::{CreatePaymentSessionRoute, VerifyPaymentSessionRoute},
};

fn shops() -> MockShops {
    let mut shops = MockShops::new();
    shops.expect_fetch_seller_bindings().returning(|ids| Ok(bindings_for(ids)));
    shops
}

fn configure(store: MemorySessionStore) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let api = CheckoutApi::new(store, shops());
        cfg.service(CreatePaymentSessionRoute::<MemorySessionStore, MockShops>::new())
            .service(VerifyPaymentSessionRoute::<MemorySessionStore, MockShops>::new())
            .app_data(web::Data::new(api));
    }
}

fn cart_body(reversed: bool) -> Value {
    let mut cart = vec![
        json!({"productId": "a1", "quantity": 2, "unitPrice": 1000, "shopId": "shopA"}),
        json!({"productId": "b1", "quantity": 1, "unitPrice": 1000, "shopId": "shopB"}),
    ];
    if reversed {
        cart.reverse();
    }
    json!({ "cart": cart, "selectedAddressId": "addr-1" })
}

async fn submit(store: &MemorySessionStore, user: &str, body: Value) -> (StatusCode, String) {
    let req = TestRequest::post().uri("/payment-session").insert_header((USER_ID_HEADER, user)).set_json(body);
    call(req, configure(store.clone())).await
}

#[actix_web::test]
async fn submit_cart() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let (status, body) = submit(&store, "u1", cart_body(false)).await;
    assert_eq!(status, StatusCode::OK);
    let handle: SessionHandle = serde_json::from_str(&body).unwrap();
    assert!(!handle.reused);
    assert_eq!(handle.total_amount.value(), 3000);
}

#[actix_web::test]
async fn resubmitting_the_same_cart_reuses_the_session() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let (_, body) = submit(&store, "u1", cart_body(false)).await;
    let first: SessionHandle = serde_json::from_str(&body).unwrap();
    let (status, body) = submit(&store, "u1", cart_body(true)).await;
    assert_eq!(status, StatusCode::OK);
    let second: SessionHandle = serde_json::from_str(&body).unwrap();
    assert!(second.reused);
    assert_eq!(first.session_id, second.session_id);
}

#[actix_web::test]
async fn submit_without_user() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let req = TestRequest::post().uri("/payment-session").set_json(cart_body(false));
    let (status, body) = call(req, configure(store)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("X-User-Id"));
}

#[actix_web::test]
async fn submit_empty_cart() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let (status, body) = submit(&store, "u1", json!({ "cart": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("{\"error\":"));
}

#[actix_web::test]
async fn submit_cart_for_unknown_shop() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let body = json!({ "cart": [{"productId": "x1", "quantity": 1, "unitPrice": 100, "shopId": "nowhere"}] });
    let (status, _) = submit(&store, "u1", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn verify_session() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let (_, body) = submit(&store, "u1", cart_body(false)).await;
    let handle: SessionHandle = serde_json::from_str(&body).unwrap();
    let uri = format!("/payment-session/{}/verify", handle.session_id);

    let req = TestRequest::get().uri(&uri).insert_header((USER_ID_HEADER, "u1"));
    let (status, body) = call(req, configure(store.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(summary["totalAmount"], 3000);
    assert_eq!(summary["itemCount"], 3);
    assert_eq!(summary["shopCount"], 2);
    assert_eq!(summary["status"], "pending");

    // Sessions are scoped to their owner
    let req = TestRequest::get().uri(&uri).insert_header((USER_ID_HEADER, "u2"));
    let (status, _) = call(req, configure(store.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn verify_bad_session_ids() {
    let _ = env_logger::try_init();
    let store = MemorySessionStore::new();
    let req = TestRequest::get().uri("/payment-session/not-a-uuid/verify").insert_header((USER_ID_HEADER, "u1"));
    let (status, _) = call(req, configure(store.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let req = TestRequest::get()
        .uri("/payment-session/6f1c1f1e-7d8a-4b59-9d0e-0b9a3c5e2f11/verify")
        .insert_header((USER_ID_HEADER, "u1"));
    let (status, _) = call(req, configure(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
