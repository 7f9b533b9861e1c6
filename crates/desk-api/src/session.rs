//! # Operator Sessions
//!
//! Cookie-based session auth for the terminal. Tokens are opaque: a random
//! session id plus an HMAC over it, so a forged cookie fails the signature
//! check before it ever touches the session map. Sessions idle out after a
//! configurable TTL.

use crate::handlers::ErrorResponse;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Cookie the session token travels in
pub const SESSION_COOKIE: &str = "desk_session";

#[derive(Debug, Clone)]
struct Session {
    expires_at: DateTime<Utc>,
}

/// In-memory session registry with HMAC-signed tokens
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    signing_key: String,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(signing_key: impl Into<String>, ttl_minutes: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            signing_key: signing_key.into(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Issue a new session token ("{id}.{signature}")
    pub fn issue(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let signature = compute_hmac_sha256(&self.signing_key, &id);

        let mut sessions = self.sessions.write().expect("session lock poisoned");
        sessions.insert(
            id.clone(),
            Session {
                expires_at: Utc::now() + self.ttl,
            },
        );

        format!("{}.{}", id, signature)
    }

    /// Verify a token and slide its expiry. Expired entries are dropped.
    pub fn authenticate(&self, token: &str) -> bool {
        let Some((id, signature)) = token.split_once('.') else {
            return false;
        };

        let expected = compute_hmac_sha256(&self.signing_key, id);
        if !constant_time_compare(signature, &expected) {
            return false;
        }

        let mut sessions = self.sessions.write().expect("session lock poisoned");
        match sessions.get_mut(id) {
            Some(session) if session.expires_at > Utc::now() => {
                session.expires_at = Utc::now() + self.ttl;
                true
            }
            Some(_) => {
                sessions.remove(id);
                false
            }
            None => false,
        }
    }

    /// Drop a session (logout)
    pub fn revoke(&self, token: &str) {
        if let Some((id, _)) = token.split_once('.') {
            let mut sessions = self.sessions.write().expect("session lock poisoned");
            sessions.remove(id);
        }
    }

    /// Number of live sessions (expired entries may linger until touched)
    pub fn len(&self) -> usize {
        self.sessions.read().expect("session lock poisoned").len()
    }
}

/// One-shot nonces for the OAuth `state` parameter (CSRF guard)
#[derive(Clone, Default)]
pub struct StateNonces {
    inner: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

/// How long an OAuth authorize redirect may stay pending
const NONCE_TTL_MINUTES: i64 = 10;

impl StateNonces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a nonce for an authorize redirect
    pub fn issue(&self) -> String {
        let nonce = Uuid::new_v4().to_string();
        let mut inner = self.inner.write().expect("nonce lock poisoned");
        inner.insert(nonce.clone(), Utc::now() + Duration::minutes(NONCE_TTL_MINUTES));
        nonce
    }

    /// Consume a nonce. Valid exactly once, and only while fresh.
    pub fn take(&self, nonce: &str) -> bool {
        let mut inner = self.inner.write().expect("nonce lock poisoned");
        match inner.remove(nonce) {
            Some(expires_at) => expires_at > Utc::now(),
            None => false,
        }
    }
}

/// Pull the session token out of the Cookie header
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Middleware guarding the operator API
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let authorized = session_cookie(request.headers())
        .map(|token| state.sessions.authenticate(&token))
        .unwrap_or(false);

    if !authorized {
        debug!("Rejected request without a valid session");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Not logged in", 401)),
        ));
    }

    Ok(next.run(request).await)
}

pub(crate) fn compute_hmac_sha256(secret: &str, message: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}

pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_authenticate() {
        let manager = SessionManager::new("test_key", 60);
        let token = manager.issue();

        assert!(manager.authenticate(&token));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_forged_signature_rejected() {
        let manager = SessionManager::new("test_key", 60);
        let token = manager.issue();
        let (id, _) = token.split_once('.').unwrap();

        let forged = format!("{}.{}", id, "0".repeat(64));
        assert!(!manager.authenticate(&forged));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let issuing = SessionManager::new("key_a", 60);
        let verifying = SessionManager::new("key_b", 60);

        let token = issuing.issue();
        assert!(!verifying.authenticate(&token));
    }

    #[test]
    fn test_expired_session_dropped() {
        let manager = SessionManager::new("test_key", -1);
        let token = manager.issue();

        assert!(!manager.authenticate(&token));
        // The expired entry is gone after the failed check
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_revoke() {
        let manager = SessionManager::new("test_key", 60);
        let token = manager.issue();

        manager.revoke(&token);
        assert!(!manager.authenticate(&token));
    }

    #[test]
    fn test_nonce_single_use() {
        let nonces = StateNonces::new();
        let nonce = nonces.issue();

        assert!(nonces.take(&nonce));
        assert!(!nonces.take(&nonce));
        assert!(!nonces.take("never-issued"));
    }

    #[test]
    fn test_session_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            "theme=dark; desk_session=abc.def; lang=en".parse().unwrap(),
        );

        assert_eq!(session_cookie(&headers).as_deref(), Some("abc.def"));

        let mut empty = HeaderMap::new();
        empty.insert("cookie", "theme=dark".parse().unwrap());
        assert_eq!(session_cookie(&empty), None);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
