use actix_web::{body, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use checkout_common::Cents;
use checkout_engine::db_types::{CartLineItem, SellerBinding};
use log::debug;

/// Calls a freshly configured app and returns the status and body, including for errors raised by middleware.
pub async fn call<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    debug!("Making request");
    match test::try_call_service(&app, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = body::to_bytes(res.into_body())
                .await
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default();
            (status, body)
        },
    }
}

pub fn line(product: &str, qty: i64, price: i64, shop: &str) -> CartLineItem {
    CartLineItem {
        product_id: product.into(),
        variation_id: None,
        quantity: qty,
        unit_price: Cents::from(price),
        shop_id: shop.into(),
        selected_options: vec![],
    }
}

pub fn binding(shop: &str) -> SellerBinding {
    let suffix = shop.trim_start_matches("shop");
    SellerBinding {
        shop_id: shop.into(),
        seller_id: format!("seller{suffix}"),
        provider_account_id: format!("acct_{suffix}"),
    }
}

/// Bindings for every shop that was asked for, the way the shop directory would return them
pub fn bindings_for(shop_ids: &[String]) -> Vec<SellerBinding> {
    shop_ids.iter().filter(|s| s.starts_with("shop")).map(|s| binding(s)).collect()
}
