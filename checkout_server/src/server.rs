use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use checkout_engine::{
    events::EventProducers,
    CheckoutApi,
    NotificationFanout,
    OrderReportApi,
    PaymentIntentGateway,
    SqliteDatabase,
    WebhookReconciler,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{
        mail_service::MailServiceClient,
        notification_bus::create_notification_event_handlers,
        stripe::StripeClient,
    },
    middleware::StripeSignatureMiddlewareFactory,
    routes::{
        health,
        CreatePaymentIntentRoute,
        CreatePaymentSessionRoute,
        PlatformSummaryRoute,
        SellerOrderRoute,
        ShopOrdersRoute,
        VerifyPaymentSessionRoute,
        WebhookRoute,
    },
    session_backend::SessionBackend,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let sessions = SessionBackend::from_config(&config).await?;
    let _reaper = sessions.start_reaper();
    let handlers = create_notification_event_handlers(config.notification_bus_url.clone(), config.event_buffer_size);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let stripe = StripeClient::new(&config.stripe).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mailer = MailServiceClient::new(config.mail_service_url.clone());
    let srv = create_server_instance(config, db, sessions, stripe, mailer, producers)?;
    srv.await?;
    Ok(())
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    sessions: SessionBackend,
    stripe: StripeClient,
    mailer: MailServiceClient,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    if config.webhook.secret.is_empty() && config.webhook.signature_checks {
        warn!("🚨️ No webhook secret is configured. Every webhook delivery will be rejected.");
    }
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(sessions.clone(), db.clone()).with_session_ttl(config.session_ttl);
        let gateway = PaymentIntentGateway::new(stripe.clone(), config.fees).with_currency(config.currency.clone());
        let notifier = NotificationFanout::new(producers.clone(), mailer.clone());
        let reconciler = WebhookReconciler::new(sessions.clone(), db.clone(), notifier)
            .with_session_ttl(config.session_ttl)
            .with_duplicate_window(config.duplicate_window);
        let report_api = OrderReportApi::new(db.clone(), config.fees);
        let webhook_scope = web::scope("/webhook")
            .wrap(StripeSignatureMiddlewareFactory::new(
                config.webhook.secret.clone(),
                config.webhook.tolerance,
                config.webhook.signature_checks,
            ))
            .service(WebhookRoute::<SessionBackend, SqliteDatabase, MailServiceClient>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("checkout::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(gateway))
            .app_data(web::Data::new(reconciler))
            .app_data(web::Data::new(report_api))
            .service(health)
            .service(CreatePaymentSessionRoute::<SessionBackend, SqliteDatabase>::new())
            .service(VerifyPaymentSessionRoute::<SessionBackend, SqliteDatabase>::new())
            .service(CreatePaymentIntentRoute::<SessionBackend, SqliteDatabase, StripeClient>::new())
            .service(ShopOrdersRoute::<SqliteDatabase>::new())
            .service(SellerOrderRoute::<SqliteDatabase>::new())
            .service(PlatformSummaryRoute::<SqliteDatabase>::new())
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
