//! Caller identity.
//!
//! Authentication happens upstream. The gateway in front of this server validates the caller's session and injects
//! their identity into the request headers:
//! * `X-User-Id` - the buyer's user id. Required on all buyer routes.
//! * `X-Seller-Id` - the seller id, for seller reporting routes.
//! * `X-Role` - a comma-separated list of roles, e.g. `seller,admin`.
//!
//! The extractors in this module read those headers and reject the request if the required identity is missing.
use std::{
    fmt::Display,
    future::{ready, Ready},
    str::FromStr,
};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use log::*;
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const SELLER_ID_HEADER: &str = "X-Seller-Id";
pub const ROLE_HEADER: &str = "X-Role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buyer" | "user" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Buyer => write!(f, "buyer"),
            Role::Seller => write!(f, "seller"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Parses the roles in the `X-Role` header. Unknown roles are ignored.
pub fn roles_from_headers(headers: &HeaderMap) -> Vec<Role> {
    headers
        .get(ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| {
            s.split(',')
                .filter_map(|r| r.parse::<Role>().map_err(|e| debug!("🔐️ Ignoring role in {ROLE_HEADER}. {e}")).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn identity_header(req: &HttpRequest, name: &str) -> Result<String, ServerError> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| {
            debug!("🔐️ Request to {} has no {name} header", req.path());
            ServerError::Unauthenticated(format!("The {name} header is missing"))
        })
}

/// The authenticated buyer making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyerId(pub String);

impl BuyerId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromRequest for BuyerId {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identity_header(req, USER_ID_HEADER).map(BuyerId))
    }
}

/// The authenticated seller making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerId(pub String);

impl SellerId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromRequest for SellerId {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identity_header(req, SELLER_ID_HEADER).map(SellerId))
    }
}
