use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::common::response::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_SHARED_SECRET: &str = "x-webhook-secret";
pub const HEADER_SIGNATURE: &str = "x-signature-256";

/// Webhook bodies are small JSON documents.
pub const MAX_WEBHOOK_BODY: usize = 256 * 1024;

#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),
    #[error("shared secret mismatch")]
    SecretMismatch,
    #[error("invalid signature")]
    InvalidSignature,
}

/// One check an inbound delivery must pass before it reaches the handler.
pub trait WebhookAuthenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthError>;
}

/// Compares the `x-webhook-secret` header against a configured secret.
pub struct SharedSecret {
    secret: Vec<u8>,
}

impl SharedSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }
}

impl WebhookAuthenticator for SharedSecret {
    fn authenticate(&self, headers: &HeaderMap, _body: &[u8]) -> Result<(), AuthError> {
        let provided = headers
            .get(HEADER_SHARED_SECRET)
            .ok_or(AuthError::MissingHeader(HEADER_SHARED_SECRET))?;

        if constant_time_eq(provided.as_bytes(), &self.secret) {
            Ok(())
        } else {
            Err(AuthError::SecretMismatch)
        }
    }
}

/// Verifies `x-signature-256: sha256=<hex>`, an HMAC-SHA256 of the raw body.
pub struct HmacSignature {
    secret: Vec<u8>,
}

impl HmacSignature {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }
}

impl WebhookAuthenticator for HmacSignature {
    fn authenticate(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthError> {
        let header = headers
            .get(HEADER_SIGNATURE)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingHeader(HEADER_SIGNATURE))?;

        let expected = header
            .strip_prefix("sha256=")
            .and_then(|hex_sig| hex::decode(hex_sig).ok())
            .ok_or(AuthError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| AuthError::InvalidSignature)?;
        mac.update(body);
        mac.verify_slice(&expected).map_err(|_| AuthError::InvalidSignature)
    }
}

/// Every configured check must pass. An empty chain accepts everything.
#[derive(Clone, Default)]
pub struct AuthChain {
    checks: Vec<Arc<dyn WebhookAuthenticator>>,
}

impl AuthChain {
    pub fn with(mut self, check: impl WebhookAuthenticator + 'static) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn authenticate(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthError> {
        self.checks
            .iter()
            .try_for_each(|check| check.authenticate(headers, body))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn webhook_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.webhook_auth.is_empty() {
        return Ok(next.run(req).await);
    }

    // Signatures cover the raw bytes, so buffer the body and hand the same
    // bytes on to the handler.
    let (parts, body) = req.into_parts();
    let bytes: Bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY)
        .await
        .map_err(|_| ApiError::new("PayloadTooLarge", "Request body too large", StatusCode::PAYLOAD_TOO_LARGE))?;

    state
        .webhook_auth
        .authenticate(&parts.headers, &bytes)
        .map_err(|e| {
            tracing::warn!("Rejected webhook delivery: {}", e);
            ApiError::new("Unauthorized", format!("Unauthorized: {}", e), StatusCode::UNAUTHORIZED)
        })?;

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
