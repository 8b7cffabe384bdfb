use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use ideaboard_shared::constants::API_KEY_HEADER;

use crate::config::ServerConfig;
use crate::error::ServerError;

/// Reject `/api` requests that don't carry the configured key.
///
/// With no key configured the API is open and every request passes.
pub async fn require_api_key(
    State(config): State<Arc<ServerConfig>>,
    req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if let Some(expected) = config.api_key.as_deref() {
        let provided = req
            .headers()
            .get(API_KEY_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();

        if provided.is_empty() {
            warn!(path = %req.uri().path(), "request without API key");
            return Err(ServerError::Unauthorized("API key is required"));
        }
        if !keys_match(provided, expected.as_bytes()) {
            warn!(path = %req.uri().path(), "request with invalid API key");
            return Err(ServerError::Unauthorized("Invalid API key"));
        }
    }

    Ok(next.run(req).await)
}

/// Constant-time comparison to prevent timing attacks on the key.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    provided.len() == expected.len() && provided.ct_eq(expected).unwrap_u8() == 1
}
