// Request id + bearer-token middleware
//
// Bearer tokens are tried in order: the internal-call bypass, a JWT from
// /api/auth/login (when JWT_SECRET is set), then the static API tokens.

use super::{jwt, AppState};
use crate::config::{AuthConfig, UserAccount};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use crate::context::{RequestContext, SYSTEM_USER};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const INTERNAL_CALL_HEADER: &str = "x-internal-call";
pub const SYSTEM_TOKEN: &str = "SYSTEM_INTERNAL_CALL";

/// Request id assigned by the outermost middleware
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

/// Reuse a well-formed incoming X-Request-ID, otherwise mint one; echo it on
/// every response.
pub async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .unwrap_or_else(Uuid::new_v4);

    request.extensions_mut().insert(RequestId(id));
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    System,
    User(String),
    Missing,
    Invalid,
}

/// Decide who is calling from the request headers
pub fn authenticate(config: &AuthConfig, headers: &HeaderMap) -> AuthOutcome {
    let Some(authorization) = headers.get("authorization").and_then(|v| v.to_str().ok()) else {
        return AuthOutcome::Missing;
    };
    let Some(token) = authorization.strip_prefix("Bearer ").map(str::trim) else {
        return AuthOutcome::Invalid;
    };
    if token.is_empty() {
        return AuthOutcome::Missing;
    }

    if token == SYSTEM_TOKEN {
        let internal = headers
            .get(INTERNAL_CALL_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        return if config.allow_internal_bypass && internal {
            AuthOutcome::System
        } else {
            AuthOutcome::Invalid
        };
    }

    if let Some(secret) = config.jwt_secret() {
        match jwt::verify(secret, token) {
            Ok(claims) => return AuthOutcome::User(claims.sub),
            Err(e) => debug!(error = %e, "bearer token is not a valid JWT"),
        }
    }

    match config.api_tokens.iter().position(|t| t == token) {
        Some(index) => AuthOutcome::User(format!("api-client-{}", index + 1)),
        None => AuthOutcome::Invalid,
    }
}

/// Look up `username` and check `password` against its argon2 hash.
///
/// Unknown users and wrong passwords are indistinguishable to the caller.
pub fn verify_credentials<'a>(config: &'a AuthConfig, username: &str, password: &str) -> Option<&'a UserAccount> {
    let user = config.find_user(username)?;
    let hash = match PasswordHash::new(&user.password_hash) {
        Ok(hash) => hash,
        Err(e) => {
            warn!(username = %username, error = %e, "stored password hash is malformed");
            return None;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .ok()
        .map(|_| user)
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}

/// Reject unauthenticated requests; attach a RequestContext to the rest
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let user_id = match authenticate(&state.auth, request.headers()) {
        AuthOutcome::System => SYSTEM_USER.to_string(),
        AuthOutcome::User(id) => id,
        AuthOutcome::Missing => {
            debug!(path = %request.uri().path(), "request without token");
            return unauthorized("Access token required");
        }
        AuthOutcome::Invalid => {
            warn!(path = %request.uri().path(), "request with invalid token");
            return unauthorized("Invalid or expired token");
        }
    };

    let mut ctx = RequestContext::new(user_id);
    if let Some(RequestId(id)) = request.extensions().get::<RequestId>().copied() {
        ctx = ctx.with_request_id(id);
    }
    request.extensions_mut().insert(ctx);

    next.run(request).await
}

/// Argon2 PHC hash of `password` with a fixed salt, for test fixtures
#[cfg(test)]
pub(crate) fn hash_for_tests(password: &str) -> String {
    use argon2::password_hash::{PasswordHasher, SaltString};

    let salt = SaltString::from_b64("c29tZXNhbHQ").unwrap();
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}
