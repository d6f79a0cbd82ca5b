//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (e.g. I/O, database operations,
//! calls to the payment provider) must be expressed as futures or asynchronous functions.
use actix_web::{get, web, HttpResponse, Responder};
use checkout_engine::{
    db_types::SessionId,
    reconcile_objects::{ConfirmationEvent, GroupOutcome, ReconcileOutcome},
    session_objects::CheckoutRequest,
    traits::{CheckoutDatabase, Mailer, OrderRepository, PaymentProvider, SessionStore, ShopDirectory},
    CheckoutApi,
    OrderReportApi,
    PaymentIntentGateway,
    WebhookReconciler,
};
use log::*;

use crate::{
    auth::{BuyerId, Role, SellerId},
    data_objects::{PaymentIntentParams, PaymentIntentResponse, WebhookAck},
    errors::ServerError,
    integrations::stripe::StripeEvent,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_payment_session => Post "/payment-session" impl SessionStore, ShopDirectory);
/// Route handler for checkout submission.
///
/// The buyer's cart is validated and turned into a pending payment session. Submitting the same cart again returns
/// the existing session with `reused: true`.
pub async fn create_payment_session<S, B>(
    buyer: BuyerId,
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<S, B>>,
) -> Result<HttpResponse, ServerError>
where
    S: SessionStore,
    B: ShopDirectory,
{
    trace!("💻️ Received checkout submission from {}", buyer.as_str());
    let handle = api.submit_cart(buyer.as_str(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(handle))
}

route!(verify_payment_session => Get "/payment-session/{session_id}/verify" impl SessionStore, ShopDirectory);
pub async fn verify_payment_session<S, B>(
    buyer: BuyerId,
    path: web::Path<String>,
    api: web::Data<CheckoutApi<S, B>>,
) -> Result<HttpResponse, ServerError>
where
    S: SessionStore,
    B: ShopDirectory,
{
    let session_id = parse_session_id(&path.into_inner())?;
    trace!("💻️ Verifying session {session_id} for {}", buyer.as_str());
    let summary = api.verify_session(buyer.as_str(), &session_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(create_payment_intent => Post "/payment-intent" impl SessionStore, ShopDirectory, PaymentProvider);
/// Route handler for creating a payment intent.
///
/// The amount must match the total of the buyer's pending session, and the destination account must belong to one of
/// the session's sellers. The intent carries the session id and user id in its metadata so that the webhook can find
/// the session again.
pub async fn create_payment_intent<S, B, P>(
    buyer: BuyerId,
    body: web::Json<PaymentIntentParams>,
    checkout: web::Data<CheckoutApi<S, B>>,
    gateway: web::Data<PaymentIntentGateway<P>>,
) -> Result<HttpResponse, ServerError>
where
    S: SessionStore,
    B: ShopDirectory,
    P: PaymentProvider,
{
    let params = body.into_inner();
    let raw_session_id = params
        .session_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ServerError::InvalidRequestBody("A session id is required".into()))?;
    let session_id = parse_session_id(raw_session_id)?;
    let session = checkout.fetch_session(buyer.as_str(), &session_id).await?;
    if !session.is_pending() {
        return Err(ServerError::InvalidRequestBody(format!("Session {session_id} has already been paid")));
    }
    if session.total_amount != params.amount {
        warn!(
            "💻️ Payment intent for session {session_id} requested {} but the session total is {}",
            params.amount, session.total_amount
        );
        return Err(ServerError::InvalidRequestBody("The amount does not match the session total".into()));
    }
    if let Some(destination) = params.seller_stripe_account_id.as_deref() {
        if !session.seller_bindings.iter().any(|b| b.provider_account_id == destination) {
            return Err(ServerError::InvalidRequestBody(format!(
                "Account {destination} is not a seller in session {session_id}"
            )));
        }
    }
    let intent = gateway
        .create_intent(params.amount, params.seller_stripe_account_id.as_deref(), Some(raw_session_id), buyer.as_str())
        .await?;
    Ok(HttpResponse::Ok().json(PaymentIntentResponse { client_secret: intent.client_secret }))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(webhook => Post "" impl SessionStore, CheckoutDatabase, Mailer);
/// Route handler for payment provider webhooks. Mount it under `/webhook` behind the signature middleware.
///
/// The provider only learns whether to retry. Malformed payloads get a 400. Anything that a retry cannot fix (an
/// irrelevant event type, a session that is already gone, bad metadata) is logged and acknowledged with a 200. Only
/// transient failures, like an unreachable session store, produce an error status so that the provider tries again.
pub async fn webhook<S, B, M>(
    body: web::Bytes,
    api: web::Data<WebhookReconciler<S, B, M>>,
) -> Result<HttpResponse, ServerError>
where
    S: SessionStore,
    B: CheckoutDatabase,
    M: Mailer,
{
    let event = serde_json::from_slice::<StripeEvent>(&body).map_err(|e| {
        warn!("💻️ Could not deserialize webhook payload. {e}");
        ServerError::CouldNotDeserializePayload(e.to_string())
    })?;
    let event = ConfirmationEvent::from(event);
    let event_id = event.event_id.clone();
    match api.handle_event(event).await {
        Ok(ReconcileOutcome::Ignored { kind }) => {
            debug!("💻️ Webhook event {event_id} ({kind}) acknowledged");
            Ok(HttpResponse::Ok().json(WebhookAck::received()))
        },
        Ok(ReconcileOutcome::Processed { orders_created, groups }) => {
            for group in &groups {
                if let GroupOutcome::Failed { shop_id, stage, reason, order_id } = group {
                    error!(
                        "💻️ Event {event_id}: shop {shop_id} failed at the {stage} stage. {reason}. Order: {}",
                        order_id.map(|id| format!("#{id}")).unwrap_or_else(|| "none".into())
                    );
                }
            }
            info!("💻️ Webhook event {event_id} reconciled. {orders_created} orders created");
            Ok(HttpResponse::Ok().json(WebhookAck::processed(orders_created)))
        },
        Err(e) if e.is_transient() => {
            error!("💻️ Webhook event {event_id} could not be processed and should be retried. {e}");
            Err(e.into())
        },
        Err(e) => {
            warn!("💻️ Webhook event {event_id} acknowledged without processing. {e}");
            Ok(HttpResponse::Ok().json(WebhookAck::received()))
        },
    }
}

//----------------------------------------------   Reporting  ----------------------------------------------------
route!(shop_orders => Get "/seller/shops/{shop_id}/orders" impl OrderRepository, ShopDirectory where requires [Role::Seller]);
pub async fn shop_orders<B>(
    seller: SellerId,
    path: web::Path<String>,
    api: web::Data<OrderReportApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderRepository + ShopDirectory,
{
    let shop_id = path.into_inner();
    trace!("💻️ Seller {} requested orders for shop {shop_id}", seller.as_str());
    let orders = api.orders_for_shop(seller.as_str(), &shop_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(seller_order => Get "/seller/orders/{order_id}" impl OrderRepository, ShopDirectory where requires [Role::Seller]);
pub async fn seller_order<B>(
    seller: SellerId,
    path: web::Path<i64>,
    api: web::Data<OrderReportApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderRepository + ShopDirectory,
{
    let order_id = path.into_inner();
    trace!("💻️ Seller {} requested order #{order_id}", seller.as_str());
    let order = api.order_for_seller(seller.as_str(), order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(platform_summary => Get "/admin/orders/summary" impl OrderRepository, ShopDirectory where requires [Role::Admin]);
pub async fn platform_summary<B>(api: web::Data<OrderReportApi<B>>) -> Result<HttpResponse, ServerError>
where B: OrderRepository + ShopDirectory {
    trace!("💻️ Admin requested the platform summary");
    let summary = api.platform_summary().await?;
    Ok(HttpResponse::Ok().json(summary))
}

fn parse_session_id(s: &str) -> Result<SessionId, ServerError> {
    s.parse::<SessionId>().map_err(|e| ServerError::InvalidRequestPath(format!("Invalid session id. {e}")))
}
