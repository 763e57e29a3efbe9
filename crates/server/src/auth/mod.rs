//! Administrator sessions.
//!
//! A single shared admin identity is configured at startup. Login mints an
//! in-memory session; the bearer token handed back is either the raw
//! session id, or, when a signing secret is configured, a signed
//! time-limited credential embedding that id. Validation always requires
//! the session to still be registered, so revocation takes effect before a
//! signed credential expires.

pub mod middleware;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use sha2::Sha256;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of a signed credential. Plain tokens never expire.
const SIGNED_TOKEN_TTL_HOURS: i64 = 12;

#[derive(Debug, Clone)]
pub struct AdminSession {
    pub id: Uuid,
    pub issued_at: DateTime<Utc>,
}

enum PasswordCheck {
    /// bcrypt hash from `ADMIN_PASSWORD_HASH`.
    Bcrypt(String),
    /// Plaintext fallback for dev setups.
    Plain(String),
}

pub struct SessionRegistry {
    username: String,
    password: PasswordCheck,
    signing_key: Option<Vec<u8>>,
    sessions: RwLock<HashMap<Uuid, AdminSession>>,
}

impl SessionRegistry {
    pub fn new(config: &ServerConfig) -> Self {
        let password = match &config.admin_password_hash {
            Some(hash) => PasswordCheck::Bcrypt(hash.clone()),
            None => PasswordCheck::Plain(config.admin_password.clone()),
        };
        Self {
            username: config.admin_username.clone(),
            password,
            signing_key: config
                .session_secret
                .as_ref()
                .map(|s| s.as_bytes().to_vec()),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Check the shared admin credential and mint a new session token.
    pub fn login(&self, username: &str, password: &str) -> ApiResult<String> {
        if username != self.username || !self.check_password(password) {
            warn!("Failed admin login attempt for {:?}", username);
            return Err(ApiError::InvalidCredentials);
        }

        let session = AdminSession {
            id: Uuid::new_v4(),
            issued_at: Utc::now(),
        };
        let token = self.encode_token(&session);
        info!("Admin session {} opened", session.id);
        self.sessions.write().insert(session.id, session);
        Ok(token)
    }

    /// Resolve a bearer token to a live session.
    ///
    /// Registry membership is required in both modes; in signed mode the
    /// signature and expiry are checked first.
    pub fn validate(&self, token: &str) -> ApiResult<Uuid> {
        let session_id = self.decode_token(token)?;
        if self.sessions.read().contains_key(&session_id) {
            Ok(session_id)
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    /// Drop the session behind a token. Unknown tokens are a no-op.
    pub fn revoke(&self, token: &str) {
        if let Ok(session_id) = self.decode_token(token) {
            if let Some(session) = self.sessions.write().remove(&session_id) {
                info!("Admin session revoked (issued {})", session.issued_at);
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    fn check_password(&self, password: &str) -> bool {
        match &self.password {
            PasswordCheck::Bcrypt(hash) => bcrypt::verify(password, hash).unwrap_or(false),
            PasswordCheck::Plain(expected) => password == expected,
        }
    }

    fn encode_token(&self, session: &AdminSession) -> String {
        match &self.signing_key {
            None => session.id.to_string(),
            Some(key) => {
                let expires_at =
                    (Utc::now() + Duration::hours(SIGNED_TOKEN_TTL_HOURS)).timestamp();
                let payload = format!("{}.{}", session.id, expires_at);
                let sig = sign(key, &payload);
                format!("{payload}.{sig}")
            }
        }
    }

    fn decode_token(&self, token: &str) -> ApiResult<Uuid> {
        match &self.signing_key {
            None => token.parse().map_err(|_| ApiError::Unauthorized),
            Some(key) => {
                let (payload, sig) = token.rsplit_once('.').ok_or(ApiError::Unauthorized)?;
                if !verify_sig(key, payload, sig) {
                    return Err(ApiError::Unauthorized);
                }
                let (id_str, exp_str) = payload.split_once('.').ok_or(ApiError::Unauthorized)?;
                let expires_at: i64 = exp_str.parse().map_err(|_| ApiError::Unauthorized)?;
                if Utc::now().timestamp() > expires_at {
                    return Err(ApiError::Unauthorized);
                }
                id_str.parse().map_err(|_| ApiError::Unauthorized)
            }
        }
    }
}

fn sign(key: &[u8], payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

fn verify_sig(key: &[u8], payload: &str, sig: &str) -> bool {
    let Ok(raw) = URL_SAFE_NO_PAD.decode(sig) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    mac.verify_slice(&raw).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(secret: Option<&str>) -> SessionRegistry {
        let config = ServerConfig {
            admin_username: "admin".to_string(),
            admin_password: "hunter2".to_string(),
            admin_password_hash: None,
            session_secret: secret.map(str::to_string),
            ..ServerConfig::default()
        };
        SessionRegistry::new(&config)
    }

    #[test]
    fn login_with_valid_credentials_mints_token() {
        let registry = registry(None);
        let token = registry.login("admin", "hunter2").unwrap();
        assert_eq!(registry.session_count(), 1);
        registry.validate(&token).unwrap();
    }

    #[test]
    fn login_with_wrong_password_mints_nothing() {
        let registry = registry(None);
        assert!(matches!(
            registry.login("admin", "wrong"),
            Err(ApiError::InvalidCredentials)
        ));
        assert!(matches!(
            registry.login("root", "hunter2"),
            Err(ApiError::InvalidCredentials)
        ));
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let registry = registry(None);
        assert!(registry.validate(&Uuid::new_v4().to_string()).is_err());
        assert!(registry.validate("not-even-a-uuid").is_err());
    }

    #[test]
    fn revoked_token_stops_validating() {
        let registry = registry(None);
        let token = registry.login("admin", "hunter2").unwrap();
        registry.revoke(&token);
        assert!(registry.validate(&token).is_err());
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn signed_tokens_round_trip() {
        let registry = registry(Some("top-secret"));
        let token = registry.login("admin", "hunter2").unwrap();
        assert_eq!(token.split('.').count(), 3);
        registry.validate(&token).unwrap();
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let registry = registry(Some("top-secret"));
        let token = registry.login("admin", "hunter2").unwrap();
        let (payload, _) = token.rsplit_once('.').unwrap();
        let forged = format!("{payload}.{}", URL_SAFE_NO_PAD.encode(b"garbage"));
        assert!(registry.validate(&forged).is_err());
    }

    #[test]
    fn expired_signed_token_is_rejected() {
        let registry = registry(Some("top-secret"));
        let token = registry.login("admin", "hunter2").unwrap();
        let session_id = token.split('.').next().unwrap();

        // Forge a credential with a past expiry using the same key; the
        // signature is valid but the deadline has passed.
        let stale_payload = format!("{}.{}", session_id, Utc::now().timestamp() - 60);
        let stale = format!(
            "{stale_payload}.{}",
            sign(b"top-secret", &stale_payload)
        );
        assert!(registry.validate(&stale).is_err());
    }

    #[test]
    fn revocation_beats_unexpired_signature() {
        let registry = registry(Some("top-secret"));
        let token = registry.login("admin", "hunter2").unwrap();
        registry.revoke(&token);
        // Signature and expiry are still fine, but the session is gone.
        assert!(registry.validate(&token).is_err());
    }

    #[test]
    fn bcrypt_hash_is_honored_when_configured() {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        let config = ServerConfig {
            admin_username: "admin".to_string(),
            admin_password: "ignored".to_string(),
            admin_password_hash: Some(hash),
            session_secret: None,
            ..ServerConfig::default()
        };
        let registry = SessionRegistry::new(&config);
        assert!(registry.login("admin", "hunter2").is_ok());
        assert!(registry.login("admin", "ignored").is_err());
    }
}
