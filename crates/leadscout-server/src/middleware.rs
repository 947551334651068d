use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// API key auth settings used by middleware.
///
/// Keys are held as SHA-256 digests and compared in constant time, so
/// neither the process memory nor the comparison leaks key material.
#[derive(Debug, Clone)]
pub struct AuthState {
    key_hashes: Arc<HashSet<[u8; 32]>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from `LEADSCOUT_API_KEYS` (comma-separated bearer
    /// tokens).
    ///
    /// In development, empty/missing keys disable auth for local iteration.
    /// In non-development envs, empty/missing keys fail startup.
    ///
    /// # Errors
    ///
    /// Returns an error outside development when no keys are configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("LEADSCOUT_API_KEYS").unwrap_or_default();
        let key_hashes: HashSet<[u8; 32]> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(hash_key)
            .collect();

        if key_hashes.is_empty() {
            if is_development {
                tracing::warn!(
                    "LEADSCOUT_API_KEYS not set; bearer auth disabled in development environment"
                );
                return Ok(Self {
                    key_hashes: Arc::new(HashSet::new()),
                    enabled: false,
                });
            }

            anyhow::bail!(
                "LEADSCOUT_API_KEYS is required outside development; provide comma-separated bearer tokens"
            );
        }

        Ok(Self {
            key_hashes: Arc::new(key_hashes),
            enabled: true,
        })
    }

    fn allows(&self, token: &str) -> bool {
        let candidate = hash_key(token);
        self.key_hashes
            .iter()
            .any(|known| bool::from(known.ct_eq(&candidate)))
    }
}

fn hash_key(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for MiddlewareErrorBody {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", value);
    }
    res
}

/// Axum middleware enforcing bearer-token auth on protected routes.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => MiddlewareErrorBody {
            error: MiddlewareError {
                code: "unauthorized",
                message: "missing or invalid bearer token",
            },
        }
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_with_keys(keys: &[&str]) -> AuthState {
        AuthState {
            key_hashes: Arc::new(keys.iter().map(|k| hash_key(k)).collect()),
            enabled: true,
        }
    }

    #[test]
    fn allows_known_key() {
        let auth = auth_with_keys(&["secret-key"]);
        assert!(auth.allows("secret-key"));
    }

    #[test]
    fn rejects_unknown_key() {
        let auth = auth_with_keys(&["secret-key"]);
        assert!(!auth.allows("other-key"));
        assert!(!auth.allows(""));
    }

    #[test]
    fn hash_key_is_stable() {
        assert_eq!(hash_key("abc"), hash_key("abc"));
        assert_ne!(hash_key("abc"), hash_key("abd"));
    }
}
