//! Embedded OAuth 2.1 authorization server (C10, §4.10.1).
//!
//! This is the *inbound* half of the service's auth story: callers obtain an
//! access token here before calling any protected ControlSurface endpoint.
//! It is unrelated to the upstream device-grant flow the LLM gateway's own
//! `cf_providers::oauth` (if any) would use to reach a provider — this AS
//! only issues tokens that this service itself accepts. Token-lifecycle
//! idioms (`expires_at` as a Unix timestamp, single-use code consumption,
//! constant-time secret comparison) are grounded in the same conventions
//! the rest of the gateway uses for inbound bearer auth.
//!
//! Supported: dynamic client registration, authorization-code grant with
//! mandatory PKCE (`S256`), a minimal HTML consent step, and introspection.
//! No refresh tokens — access tokens are short-lived (§6.1: 1 hour) and a
//! client simply re-runs the authorization flow.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect};
use axum::routing::{get, post};
use axum::{Form, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use cf_domain::config::OAuthConfig;

use crate::state::AppState;

// ── Stored records ──────────────────────────────────────────────────────

struct RegisteredClient {
    client_secret_hash: [u8; 32],
    redirect_uris: Vec<String>,
    client_id_issued_at: i64,
    client_secret_expires_at: i64,
}

struct PendingAuthorization {
    client_id: String,
    redirect_uri: String,
    scope: String,
    state: Option<String>,
    code_challenge: String,
}

struct AuthorizationCode {
    client_id: String,
    redirect_uri: String,
    scope: String,
    code_challenge: String,
    expires_at: i64,
    consumed: bool,
}

struct AccessToken {
    client_id: String,
    scope: String,
    expires_at: i64,
}

/// Holds every client registration, in-flight consent, authorization code,
/// and issued access token for the life of the process. Single global
/// instance, mirroring `StatusStore`'s in-process-cache-plus-lock shape.
pub struct OAuthState {
    config: OAuthConfig,
    clients: Mutex<HashMap<String, RegisteredClient>>,
    pending: Mutex<HashMap<String, PendingAuthorization>>,
    codes: Mutex<HashMap<String, AuthorizationCode>>,
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl OAuthState {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            codes: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Validates a bearer token presented by a caller. Returns the granted
    /// scope on success; `None` on missing, unknown, or expired tokens.
    pub fn validate_access_token(&self, token: &str) -> Option<String> {
        let tokens = self.tokens.lock();
        let record = tokens.get(token)?;
        if record.expires_at < Utc::now().timestamp() {
            return None;
        }
        Some(record.scope.clone())
    }
}

fn hash_secret(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

fn new_token(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

// ── Wire shapes ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    redirect_uris: Vec<String>,
    #[serde(default)]
    #[allow(dead_code)]
    client_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    client_id: String,
    client_secret: String,
    client_id_issued_at: i64,
    client_secret_expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct AuthorizeQuery {
    response_type: String,
    client_id: String,
    redirect_uri: String,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    state: Option<String>,
    code_challenge: String,
    code_challenge_method: String,
}

#[derive(Debug, Deserialize)]
struct ConsentForm {
    consent_id: String,
    approve: bool,
}

#[derive(Debug, Deserialize)]
struct TokenForm {
    grant_type: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    code_verifier: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: i64,
    scope: String,
}

#[derive(Debug, Serialize)]
struct OAuthErrorBody {
    error: &'static str,
    error_description: String,
}

fn oauth_error(status: StatusCode, error: &'static str, description: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(OAuthErrorBody {
            error,
            error_description: description.into(),
        }),
    )
        .into_response()
}

// ── Router ────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/.well-known/oauth-authorization-server", get(discovery))
        .route("/register", post(register))
        .route("/authorize", get(authorize))
        .route("/consent", post(consent))
        .route("/token", post(token))
        .route("/introspect", post(introspect))
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// `/.well-known/oauth-authorization-server` discovery document (§4.10.1).
async fn discovery(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "authorization_endpoint": "/authorize",
        "token_endpoint": "/token",
        "introspection_endpoint": "/introspect",
        "registration_endpoint": "/register",
        "scopes_supported": state.oauth.config.scopes,
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code"],
        "code_challenge_methods_supported": ["S256"],
        "token_endpoint_auth_methods_supported": ["none"],
    }))
}

/// Dynamic client registration (§4.10.1).
async fn register(State(state): State<AppState>, Json(body): Json<RegisterRequest>) -> impl IntoResponse {
    if body.redirect_uris.is_empty() {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_client_metadata", "redirect_uris must not be empty");
    }

    let client_id = new_token("client");
    let client_secret = new_token("secret");
    let now = Utc::now().timestamp();
    let client_secret_expires_at = now + state.oauth.config.client_secret_ttl_secs;

    state.oauth.clients.lock().insert(
        client_id.clone(),
        RegisteredClient {
            client_secret_hash: hash_secret(&client_secret),
            redirect_uris: body.redirect_uris,
            client_id_issued_at: now,
            client_secret_expires_at,
        },
    );

    Json(RegisterResponse {
        client_id,
        client_secret,
        client_id_issued_at: now,
        client_secret_expires_at,
    })
    .into_response()
}

/// `GET /authorize` — validates the request and renders a minimal consent
/// page rather than auto-granting, so a human operator always has a chance
/// to refuse a client before a code is ever minted.
async fn authorize(State(state): State<AppState>, Query(q): Query<AuthorizeQuery>) -> impl IntoResponse {
    if q.response_type != "code" {
        return oauth_error(StatusCode::BAD_REQUEST, "unsupported_response_type", "only response_type=code is supported");
    }
    if q.code_challenge_method != "S256" {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_request", "code_challenge_method must be S256");
    }

    let clients = state.oauth.clients.lock();
    let Some(client) = clients.get(&q.client_id) else {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_client", "unknown client_id");
    };

    let trusted = state
        .oauth
        .config
        .trust_redirect_uri_allowlist
        .iter()
        .any(|id| id == &q.client_id);
    if !trusted && !client.redirect_uris.iter().any(|u| u == &q.redirect_uri) {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_request", "redirect_uri is not registered for this client");
    }
    drop(clients);

    let consent_id = new_token("consent");
    let scope = q.scope.clone().unwrap_or_else(|| state.oauth.config.scopes.join(" "));
    state.oauth.pending.lock().insert(
        consent_id.clone(),
        PendingAuthorization {
            client_id: q.client_id.clone(),
            redirect_uri: q.redirect_uri.clone(),
            scope: scope.clone(),
            state: q.state.clone(),
            code_challenge: q.code_challenge.clone(),
        },
    );

    Html(format!(
        "<html><body>\
         <h1>Authorize access</h1>\
         <p>Client <code>{}</code> is requesting scope <code>{}</code>.</p>\
         <form method=\"post\" action=\"/consent\">\
         <input type=\"hidden\" name=\"consent_id\" value=\"{}\">\
         <button type=\"submit\" name=\"approve\" value=\"true\">Approve</button>\
         <button type=\"submit\" name=\"approve\" value=\"false\">Deny</button>\
         </form></body></html>",
        q.client_id, scope, consent_id,
    ))
    .into_response()
}

/// `POST /consent` — finalizes (or rejects) a pending authorization and
/// redirects back to the client's `redirect_uri`.
async fn consent(State(state): State<AppState>, Form(body): Form<ConsentForm>) -> impl IntoResponse {
    let Some(pending) = state.oauth.pending.lock().remove(&body.consent_id) else {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_request", "unknown or expired consent_id");
    };

    if !body.approve {
        let mut url = format!("{}?error=access_denied", pending.redirect_uri);
        if let Some(s) = pending.state {
            url.push_str(&format!("&state={s}"));
        }
        return Redirect::to(&url).into_response();
    }

    let code = new_token("code");
    let expires_at = Utc::now().timestamp() + state.oauth.config.auth_code_ttl_secs;
    state.oauth.codes.lock().insert(
        code.clone(),
        AuthorizationCode {
            client_id: pending.client_id,
            redirect_uri: pending.redirect_uri.clone(),
            scope: pending.scope,
            code_challenge: pending.code_challenge,
            expires_at,
            consumed: false,
        },
    );

    let mut url = format!("{}?code={code}", pending.redirect_uri);
    if let Some(s) = pending.state {
        url.push_str(&format!("&state={s}"));
    }
    Redirect::to(&url).into_response()
}

/// `POST /token` — authorization-code exchange with mandatory PKCE (§4.10.1).
async fn token(State(state): State<AppState>, Form(body): Form<TokenForm>) -> impl IntoResponse {
    if body.grant_type != "authorization_code" {
        return oauth_error(StatusCode::BAD_REQUEST, "unsupported_grant_type", "only authorization_code is supported");
    }
    let (Some(code), Some(redirect_uri), Some(client_id), Some(verifier)) =
        (body.code, body.redirect_uri, body.client_id, body.code_verifier)
    else {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_request", "code, redirect_uri, client_id, code_verifier are required");
    };

    // Atomically consume the code: a second exchange attempt must fail.
    let record = {
        let mut codes = state.oauth.codes.lock();
        match codes.remove(&code) {
            Some(r) => r,
            None => return oauth_error(StatusCode::BAD_REQUEST, "invalid_grant", "unknown, expired, or already-used code"),
        }
    };

    if record.consumed || record.expires_at < Utc::now().timestamp() {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_grant", "authorization code has expired");
    }
    if record.client_id != client_id || record.redirect_uri != redirect_uri {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_grant", "client_id or redirect_uri mismatch");
    }

    let computed = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
    if !bool::from(computed.as_bytes().ct_eq(record.code_challenge.as_bytes())) {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_grant", "code_verifier does not match code_challenge");
    }

    let access_token = new_token("at");
    let expires_in = state.oauth.config.access_token_ttl_secs;
    state.oauth.tokens.lock().insert(
        access_token.clone(),
        AccessToken {
            client_id: record.client_id,
            scope: record.scope.clone(),
            expires_at: Utc::now().timestamp() + expires_in,
        },
    );

    Json(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in,
        scope: record.scope,
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
struct IntrospectForm {
    token: String,
}

/// `POST /introspect` (RFC 7662), used by resource servers to validate a
/// token out-of-band; this gateway validates tokens itself via
/// [`OAuthState::validate_access_token`], but the endpoint is exposed since
/// the discovery document advertises it.
async fn introspect(State(state): State<AppState>, Form(body): Form<IntrospectForm>) -> impl IntoResponse {
    let tokens = state.oauth.tokens.lock();
    match tokens.get(&body.token) {
        Some(t) if t.expires_at >= Utc::now().timestamp() => Json(serde_json::json!({
            "active": true,
            "scope": t.scope,
            "client_id": t.client_id,
            "exp": t.expires_at,
        })),
        _ => Json(serde_json::json!({ "active": false })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> OAuthState {
        OAuthState::new(OAuthConfig::default())
    }

    #[test]
    fn registered_client_secret_hash_matches() {
        let secret = "topsecret";
        let hash = hash_secret(secret);
        assert_eq!(hash, hash_secret(secret));
        assert_ne!(hash, hash_secret("other"));
    }

    #[test]
    fn access_token_validates_before_expiry() {
        let s = state();
        s.tokens.lock().insert(
            "tok".into(),
            AccessToken {
                client_id: "c1".into(),
                scope: "mcp.read".into(),
                expires_at: Utc::now().timestamp() + 60,
            },
        );
        assert_eq!(s.validate_access_token("tok"), Some("mcp.read".into()));
    }

    #[test]
    fn access_token_rejected_after_expiry() {
        let s = state();
        s.tokens.lock().insert(
            "tok".into(),
            AccessToken {
                client_id: "c1".into(),
                scope: "mcp.read".into(),
                expires_at: Utc::now().timestamp() - 1,
            },
        );
        assert!(s.validate_access_token("tok").is_none());
    }

    #[test]
    fn unknown_token_is_rejected() {
        let s = state();
        assert!(s.validate_access_token("ghost").is_none());
    }

    #[test]
    fn pkce_s256_challenge_matches_verifier() {
        let verifier = "a-valid-code-verifier-string-of-sufficient-length";
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        let recomputed = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        assert_eq!(challenge, recomputed);
    }
}
