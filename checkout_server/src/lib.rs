//! # Checkout server
//! This crate hosts the HTTP surface of the marketplace checkout engine. It is responsible for:
//! * Capturing buyers' carts as pending payment sessions.
//! * Creating payment intents for those sessions with Stripe, with the platform fee split out.
//! * Receiving Stripe's signed webhooks and handing confirmed payments to the reconciler, which creates the orders.
//! * Order reporting for sellers and admins.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /payment-session`: Submit a cart and get a payment session id back.
//! * `GET /payment-session/{id}/verify`: Check that a session is still awaiting payment.
//! * `POST /payment-intent`: Create a Stripe payment intent for a session.
//! * `POST /webhook`: The Stripe webhook.
//! * `GET /seller/shops/{id}/orders`, `GET /seller/orders/{id}`: Seller order reports.
//! * `GET /admin/orders/summary`: Platform-wide totals for admins.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod session_backend;

#[cfg(test)]
mod endpoint_tests;
