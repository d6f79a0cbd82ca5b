use actix_web::{http::StatusCode, test::TestRequest, web};
use checkout_common::Secret;
use checkout_engine::{
    db_types::SessionId,
    events::EventProducers,
    session_objects::CheckoutRequest,
    test_utils::{
        fixtures::{product_stock, seed_marketplace, RecordingMailer},
        prepare_env::{prepare_test_env, random_db_path, tear_down},
    },
    traits::OrderRepository,
    CheckoutApi,
    MemorySessionStore,
    NotificationFanout,
    SqliteDatabase,
    WebhookReconciler,
};
use chrono::{Duration, Utc};
use serde_json::json;

use super::helpers::{call, line};
use crate::{
    helpers::{calculate_signature, STRIPE_SIGNATURE_HEADER},
    middleware::StripeSignatureMiddlewareFactory,
    routes::WebhookRoute,
};

const SECRET: &str = "whsec_test";

struct WebhookEnv {
    db: SqliteDatabase,
    sessions: MemorySessionStore,
    mailer: RecordingMailer,
}

impl WebhookEnv {
    async fn new() -> Self {
        let db = prepare_test_env(&random_db_path()).await;
        seed_marketplace(&db).await;
        Self { db, sessions: MemorySessionStore::new(), mailer: RecordingMailer::default() }
    }

    async fn checkout(&self) -> SessionId {
        let api = CheckoutApi::new(self.sessions.clone(), self.db.clone());
        let request = CheckoutRequest {
            cart: vec![line("a1", 2, 1000, "shopA"), line("b1", 1, 1000, "shopB")],
            shipping_address_id: Some("addr-1".into()),
            coupon: None,
        };
        api.submit_cart("u1", request).await.unwrap().session_id
    }

    fn configure(&self) -> impl FnOnce(&mut web::ServiceConfig) {
        let sessions = self.sessions.clone();
        let db = self.db.clone();
        let mailer = self.mailer.clone();
        move |cfg| {
            let notifier = NotificationFanout::new(EventProducers::default(), mailer);
            let reconciler = WebhookReconciler::new(sessions, db, notifier);
            let scope = web::scope("/webhook")
                .wrap(StripeSignatureMiddlewareFactory::new(
                    Secret::new(SECRET.to_string()),
                    Duration::seconds(300),
                    true,
                ))
                .service(WebhookRoute::<MemorySessionStore, SqliteDatabase, RecordingMailer>::new());
            cfg.service(scope).app_data(web::Data::new(reconciler));
        }
    }
}

fn succeeded_event(session_id: &SessionId) -> String {
    json!({
        "id": "evt_1",
        "object": "event",
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": "pi_1",
            "object": "payment_intent",
            "amount": 3000,
            "metadata": { "sessionId": session_id.to_string(), "userId": "u1" }
        }}
    })
    .to_string()
}

fn signed(body: &str) -> TestRequest {
    let t = Utc::now().timestamp();
    let header = format!("t={t},v1={}", calculate_signature(SECRET, t, body.as_bytes()));
    TestRequest::post()
        .uri("/webhook")
        .insert_header((STRIPE_SIGNATURE_HEADER, header))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
}

#[actix_web::test]
async fn unsigned_deliveries_are_rejected() {
    let _ = env_logger::try_init();
    let env = WebhookEnv::new().await;
    let session_id = env.checkout().await;
    let body = succeeded_event(&session_id);

    let req = TestRequest::post().uri("/webhook").set_payload(body.clone());
    let (status, _) = call(req, env.configure()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let t = Utc::now().timestamp();
    let forged = format!("t={t},v1={}", calculate_signature("whsec_wrong", t, body.as_bytes()));
    let req =
        TestRequest::post().uri("/webhook").insert_header((STRIPE_SIGNATURE_HEADER, forged)).set_payload(body.clone());
    let (status, _) = call(req, env.configure()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let extreme = "t=-9223372036854775808,v1=aa";
    let req = TestRequest::post().uri("/webhook").insert_header((STRIPE_SIGNATURE_HEADER, extreme)).set_payload(body);
    let (status, _) = call(req, env.configure()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was written and the session is still waiting for payment
    assert!(env.db.fetch_orders_for_user("u1").await.unwrap().is_empty());
    assert_eq!(product_stock(&env.db, "a1").await, 10);
    tear_down(env.db).await;
}

#[actix_web::test]
async fn payment_succeeded_creates_one_order_per_shop() {
    let _ = env_logger::try_init();
    let env = WebhookEnv::new().await;
    let session_id = env.checkout().await;
    let body = succeeded_event(&session_id);

    let (status, response) = call(signed(&body), env.configure()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, r#"{"received":true,"ordersCreated":2}"#);

    let orders = env.db.fetch_orders_for_user("u1").await.unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o.payment_reference.as_deref() == Some("pi_1")));
    assert_eq!(product_stock(&env.db, "a1").await, 8);
    assert_eq!(product_stock(&env.db, "b1").await, 9);
    assert_eq!(env.mailer.sent().len(), 1);

    // Redelivery finds no session and is acknowledged without side effects
    let (status, response) = call(signed(&body), env.configure()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, r#"{"received":true}"#);
    assert_eq!(env.db.fetch_orders_for_user("u1").await.unwrap().len(), 2);
    assert_eq!(product_stock(&env.db, "a1").await, 8);
    assert_eq!(env.mailer.sent().len(), 1);
    tear_down(env.db).await;
}

#[actix_web::test]
async fn other_event_types_are_acknowledged() {
    let _ = env_logger::try_init();
    let env = WebhookEnv::new().await;
    let session_id = env.checkout().await;
    let body = json!({
        "id": "evt_2",
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": "pi_2", "metadata": { "sessionId": session_id.to_string(), "userId": "u1" } } }
    })
    .to_string();
    let (status, response) = call(signed(&body), env.configure()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, r#"{"received":true}"#);
    assert!(env.db.fetch_orders_for_user("u1").await.unwrap().is_empty());
    tear_down(env.db).await;
}

#[actix_web::test]
async fn missing_metadata_is_acknowledged() {
    let _ = env_logger::try_init();
    let env = WebhookEnv::new().await;
    let body = json!({
        "id": "evt_3",
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_3", "metadata": {} } }
    })
    .to_string();
    let (status, response) = call(signed(&body), env.configure()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, r#"{"received":true}"#);
    tear_down(env.db).await;
}

#[actix_web::test]
async fn signed_garbage_is_a_bad_request() {
    let _ = env_logger::try_init();
    let env = WebhookEnv::new().await;
    let (status, body) = call(signed("{not json"), env.configure()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("deserialization"));
    tear_down(env.db).await;
}

#[actix_web::test]
async fn corrupt_sessions_are_acknowledged() {
    let _ = env_logger::try_init();
    let env = WebhookEnv::new().await;
    let session_id = SessionId::random();
    env.sessions.put_raw("u1", &session_id, r#"{"sessionId":"#, Duration::seconds(60)).await;
    let (status, response) = call(signed(&succeeded_event(&session_id)), env.configure()).await;
    // Retrying can never fix the stored JSON, so the provider must not be asked to
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, r#"{"received":true}"#);
    assert!(env.db.fetch_orders_for_user("u1").await.unwrap().is_empty());
    tear_down(env.db).await;
}
