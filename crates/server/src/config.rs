//! Server configuration and shared state.

use std::env;
use std::sync::Arc;

use crate::ai::ReplyGenerator;
use crate::auth::SessionRegistry;
use crate::hub::Hub;
use crate::maintenance::{EvictionPolicy, MaintenanceManager};
use crate::store::QuestionStore;

/// Placeholder credential for local development only.
pub const DEFAULT_ADMIN_PASSWORD: &str = "change-me";

/// Configuration for the board server, read from the environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub admin_username: String,
    /// Plaintext credential, used only when no hash is configured.
    pub admin_password: String,
    /// bcrypt hash; takes precedence over `admin_password`.
    pub admin_password_hash: Option<String>,
    /// When set, session tokens become signed time-limited credentials.
    pub session_secret: Option<String>,
    pub eviction: EvictionPolicy,
    pub ai_model: String,
    pub ai_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            admin_username: "admin".to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            admin_password_hash: None,
            session_secret: None,
            eviction: EvictionPolicy::Hard,
            ai_model: "deepseek-chat".to_string(),
            ai_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the environment, falling back to the dev
    /// defaults above.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or(defaults.admin_username),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            admin_password_hash: env::var("ADMIN_PASSWORD_HASH").ok(),
            session_secret: env::var("SESSION_SECRET").ok(),
            eviction: env::var("MAINTENANCE_EVICTION")
                .map(|v| EvictionPolicy::parse(&v))
                .unwrap_or(defaults.eviction),
            ai_model: env::var("AI_MODEL").unwrap_or(defaults.ai_model),
            ai_enabled: env::var("DISABLE_AI").is_err(),
        }
    }
}

/// App state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<QuestionStore>,
    pub sessions: Arc<SessionRegistry>,
    pub maintenance: Arc<MaintenanceManager>,
    pub hub: Arc<Hub>,
    pub ai: Arc<dyn ReplyGenerator>,
}
