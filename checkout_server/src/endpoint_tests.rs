mod helpers;
mod mocks;

mod misc {
    use actix_web::{http::StatusCode, test::TestRequest};

    use super::helpers::call;
    use crate::routes::health;

    #[actix_web::test]
    async fn health_endpoint() {
        let (status, body) = call(TestRequest::get().uri("/health"), |cfg| {
            cfg.service(health);
        })
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "👍️\n");
    }
}

mod checkout;
mod payment_intent;
mod reports;
mod webhook;
