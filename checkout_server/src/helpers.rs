//! Stripe webhook signature verification.
//!
//! Stripe signs each delivery with a `Stripe-Signature` header of the form `t=<unix secs>,v1=<hex>[,v1=<hex>...]`.
//! The signature is the hex-encoded HMAC-SHA256 of `"{t}.{body}"`, keyed with the endpoint's signing secret. More than
//! one `v1` entry appears while a secret is being rolled.
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";
pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No signature header was provided")]
    MissingHeader,
    #[error("The signature header is malformed. {0}")]
    MalformedHeader(String),
    #[error("The signature timestamp is outside the allowed tolerance")]
    TimestampOutOfTolerance,
    #[error("No signature in the header matches the payload")]
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

pub fn parse_signature_header(header: &str) -> Result<SignatureHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => {
                let t = v.parse::<i64>().map_err(|e| SignatureError::MalformedHeader(format!("Bad timestamp. {e}")))?;
                timestamp = Some(t);
            },
            Some(("v1", v)) if !v.is_empty() => signatures.push(v.to_string()),
            // Other schemes (e.g. v0) are ignored
            Some(_) => {},
            None => return Err(SignatureError::MalformedHeader(format!("Unexpected element '{part}'"))),
        }
    }
    let timestamp = timestamp.ok_or_else(|| SignatureError::MalformedHeader("No timestamp".into()))?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader("No v1 signature".into()));
    }
    Ok(SignatureHeader { timestamp, signatures })
}

fn signed_payload_mac(secret: &str, timestamp: i64, body: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Calculates the `v1` signature for `body` as Stripe would.
pub fn calculate_signature(secret: &str, timestamp: i64, body: &[u8]) -> String {
    match signed_payload_mac(secret, timestamp, body) {
        Ok(mac) => hex::encode(mac.finalize().into_bytes()),
        Err(_) => String::default(),
    }
}

pub fn verify_signature(
    header: &str,
    body: &[u8],
    secret: &str,
    tolerance: Duration,
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let header = parse_signature_header(header)?;
    // `t` is untrusted. The age must not overflow
    let age = now.timestamp().checked_sub(header.timestamp).map(i64::unsigned_abs);
    let max_age = tolerance.num_seconds().unsigned_abs();
    if age.map_or(true, |age| age > max_age) {
        return Err(SignatureError::TimestampOutOfTolerance);
    }
    let mac = signed_payload_mac(secret, header.timestamp, body)?;
    let matched = header
        .signatures
        .iter()
        .filter_map(|s| hex::decode(s).ok())
        .any(|sig| mac.clone().verify_slice(&sig).is_ok());
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
