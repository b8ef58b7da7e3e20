//! Inbound authentication middleware (C10, §4.10.1).
//!
//! Accepts either a static API key (hashed with `sha2::Sha256`, compared in
//! constant time) or an OAuth 2.1 access token issued by the embedded
//! authorization server in [`crate::api::oauth`]. `ENVIRONMENT=local`
//! bypasses auth entirely — the existing codebase's `api_token_hash:
//! Option<Vec<u8>>` "`None` = dev bypass" convention, generalized here to
//! an explicit environment flag since this service has two credential
//! kinds instead of one.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

/// Axum middleware enforcing bearer authentication on protected routes.
/// Attach via `axum::middleware::from_fn_with_state`.
pub async fn require_bearer(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    if state.config.server.environment.allows_auth_bypass() {
        return next.run(req).await;
    }

    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    if provided.is_empty() {
        return unauthorized();
    }

    if state.oauth.validate_access_token(provided).is_some() {
        return next.run(req).await;
    }

    let provided_hash = Sha256::digest(provided.as_bytes());
    let matches_api_key = state
        .api_key_hashes
        .iter()
        .any(|expected| bool::from(provided_hash.ct_eq(expected.as_slice())));

    if matches_api_key {
        return next.run(req).await;
    }

    unauthorized()
}

fn unauthorized() -> Response {
    (
        axum::http::StatusCode::UNAUTHORIZED,
        axum::Json(serde_json::json!({
            "error": "invalid_token",
            "error_description": "missing, invalid, or expired bearer credential",
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use sha2::{Digest, Sha256};
    use subtle::ConstantTimeEq;

    #[test]
    fn hash_comparison_matches_identical_tokens() {
        let hash = Sha256::digest(b"my-key");
        let same = Sha256::digest(b"my-key");
        assert!(bool::from(hash.ct_eq(&same)));
    }

    #[test]
    fn hash_comparison_rejects_different_tokens() {
        let hash = Sha256::digest(b"my-key");
        let other = Sha256::digest(b"not-my-key");
        assert!(!bool::from(hash.ct_eq(&other)));
    }
}
