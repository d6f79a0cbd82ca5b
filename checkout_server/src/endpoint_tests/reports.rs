use actix_web::{http::StatusCode, test::TestRequest, web};
use checkout_common::Cents;
use checkout_engine::{
    db_types::{DeliveryStatus, Order, OrderStatusType},
    fees::FeeSchedule,
    OrderReportApi,
    PlatformSummary,
};
use chrono::Utc;
use serde_json::Value;

use super::{
    helpers::{bindings_for, call},
    mocks::MockReportBackend,
};
use crate::{
    auth::{ROLE_HEADER, SELLER_ID_HEADER},
    routes::{PlatformSummaryRoute, SellerOrderRoute, ShopOrdersRoute},
};

fn order(id: i64, shop_id: &str, total: i64) -> Order {
    Order {
        id,
        user_id: "u1".into(),
        shop_id: shop_id.into(),
        total: Cents::from(total),
        status: OrderStatusType::Paid,
        delivery_status: DeliveryStatus::Ordered,
        shipping_address_id: None,
        coupon_code: None,
        discount_amount: Cents::default(),
        payment_reference: Some("pi_1".into()),
        created_at: Utc::now(),
        items: vec![],
    }
}

/// A backend that knows shopA and shopB and has one 10000c order in shopA and one 5000c order in shopB
fn backend() -> MockReportBackend {
    let mut backend = MockReportBackend::new();
    backend.expect_fetch_seller_bindings().returning(|ids| Ok(bindings_for(ids)));
    backend.expect_search_orders().returning(|filter| {
        let orders = vec![order(1, "shopA", 10_000), order(2, "shopB", 5_000)];
        Ok(orders.into_iter().filter(|o| filter.shop_id.as_ref().map(|s| s == &o.shop_id).unwrap_or(true)).collect())
    });
    backend.expect_fetch_order().returning(|id| Ok((id == 1).then(|| order(1, "shopA", 10_000))));
    backend
}

fn configure(backend: MockReportBackend) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let api = OrderReportApi::new(backend, FeeSchedule::default());
        cfg.service(ShopOrdersRoute::<MockReportBackend>::new())
            .service(SellerOrderRoute::<MockReportBackend>::new())
            .service(PlatformSummaryRoute::<MockReportBackend>::new())
            .app_data(web::Data::new(api));
    }
}

fn seller_request(uri: &str, seller: &str) -> TestRequest {
    TestRequest::get().uri(uri).insert_header((SELLER_ID_HEADER, seller)).insert_header((ROLE_HEADER, "seller"))
}

#[actix_web::test]
async fn seller_reads_own_shop() {
    let _ = env_logger::try_init();
    let (status, body) = call(seller_request("/seller/shops/shopA/orders", "sellerA"), configure(backend())).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["shopId"], "shopA");
    assert_eq!(orders[0]["total"], 10_000);
    assert_eq!(orders[0]["earnings"]["adminFee"], 1_000);
    assert_eq!(orders[0]["earnings"]["sellerEarnings"], 9_000);
}

#[actix_web::test]
async fn seller_cannot_read_another_shop() {
    let _ = env_logger::try_init();
    let (status, _) = call(seller_request("/seller/shops/shopA/orders", "sellerB"), configure(backend())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(seller_request("/seller/shops/shopZ/orders", "sellerA"), configure(backend())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn seller_routes_need_the_seller_role() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/seller/shops/shopA/orders").insert_header((SELLER_ID_HEADER, "sellerA"));
    let (status, _) = call(req, configure(MockReportBackend::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::get().uri("/seller/shops/shopA/orders").insert_header((ROLE_HEADER, "seller"));
    let (status, _) = call(req, configure(MockReportBackend::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn seller_reads_single_order() {
    let _ = env_logger::try_init();
    let (status, body) = call(seller_request("/seller/orders/1", "sellerA"), configure(backend())).await;
    assert_eq!(status, StatusCode::OK);
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["id"], 1);
    assert_eq!(order["earnings"]["sellerEarnings"], 9_000);

    let (status, _) = call(seller_request("/seller/orders/1", "sellerB"), configure(backend())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(seller_request("/seller/orders/99", "sellerA"), configure(backend())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(seller_request("/seller/orders/abc", "sellerA"), configure(backend())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn admin_summary() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/admin/orders/summary").insert_header((ROLE_HEADER, "admin"));
    let (status, body) = call(req, configure(backend())).await;
    assert_eq!(status, StatusCode::OK);
    let summary: PlatformSummary = serde_json::from_str(&body).unwrap();
    assert_eq!(summary, PlatformSummary {
        order_count: 2,
        total_order_value: Cents::from(15_000),
        total_admin_fees: Cents::from(1_500),
        total_seller_earnings: Cents::from(13_500),
    });

    let req = TestRequest::get().uri("/admin/orders/summary").insert_header((ROLE_HEADER, "seller"));
    let (status, _) = call(req, configure(MockReportBackend::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
