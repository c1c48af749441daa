use account_source::mask_api_key;
use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::AppState;

/// Hash a token with SHA-256 so comparisons run over fixed-length digests.
pub(crate) fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod auth_tests;

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Shared-token gate for the monitoring endpoints.
///
/// The token travels in the `token` query parameter. A mismatch answers with
/// the failure envelope before the handler runs, so nothing is fetched,
/// written or sent.
pub async fn token_middleware(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    check_token(&state, query.token.as_deref(), request.uri().path())?;
    Ok(next.run(request).await)
}

/// Same gate for the market quote endpoint, which keeps its older error body.
pub async fn legacy_token_middleware(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    check_token(&state, query.token.as_deref(), request.uri().path())
        .map_err(|_| AuthError::LegacyTokenMismatch)?;
    Ok(next.run(request).await)
}

fn check_token(state: &AppState, provided: Option<&str>, path: &str) -> Result<(), AuthError> {
    let provided = provided.unwrap_or_default();
    if hash_key(provided) != state.token_hash.as_str() {
        tracing::warn!(
            "Rejected {}: token {} does not match",
            path,
            mask_api_key(provided)
        );
        return Err(AuthError::TokenMismatch);
    }
    Ok(())
}

/// Authentication errors
#[derive(Debug, PartialEq)]
pub enum AuthError {
    TokenMismatch,
    LegacyTokenMismatch,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "token not match")
    }
}

impl std::error::Error for AuthError {}

/// Callers are schedulers that only inspect the body, so rejections keep
/// status 200.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = match self {
            AuthError::TokenMismatch => json!({
                "status": "failed",
                "data": self.to_string(),
            }),
            AuthError::LegacyTokenMismatch => json!({
                "ok": "false",
                "error_code": 0,
                "description": self.to_string(),
            }),
        };

        (StatusCode::OK, Json(body)).into_response()
    }
}
