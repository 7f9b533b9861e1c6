//! # Application State
//!
//! Shared state for the Axum application: the profile store behind a
//! lock, the session registry, the persistence backend, and config.

use crate::persist::{EnvVarPersistence, HostedEnvPersistence};
use crate::session::{SessionManager, StateNonces};
use desk_core::{
    BoxedStorePersistence, DeskError, Environment, Profile, ProfileStore,
};
use desk_square::{OAuthConfig, SquareConfig};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Environment variable the serialized store is stashed in
pub const DEFAULT_STORE_VAR: &str = "DESK_PROFILE_STORE";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for callbacks
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Operator password for session login
    pub admin_password: String,
    /// HMAC key for session tokens
    pub session_key: String,
    /// Session idle timeout in minutes
    pub session_ttl_minutes: i64,
    /// Env var name the store is persisted under
    pub store_var: String,
    /// Hosting provider env-var API endpoint (optional)
    pub hosted_env_api_url: Option<String>,
    /// Hosting provider API token (optional)
    pub hosted_env_api_token: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, DeskError> {
        dotenvy::dotenv().ok();

        let admin_password = std::env::var("DESK_ADMIN_PASSWORD").map_err(|_| {
            DeskError::Configuration("DESK_ADMIN_PASSWORD not set".to_string())
        })?;

        // Without a fixed key, sessions simply don't survive a restart
        let session_key = std::env::var("DESK_SESSION_KEY")
            .unwrap_or_else(|_| Uuid::new_v4().to_string());

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            admin_password,
            session_key,
            session_ttl_minutes: std::env::var("DESK_SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(720),
            store_var: std::env::var("DESK_STORE_VAR")
                .unwrap_or_else(|_| DEFAULT_STORE_VAR.to_string()),
            hosted_env_api_url: std::env::var("HOSTED_ENV_API_URL").ok(),
            hosted_env_api_token: std::env::var("HOSTED_ENV_API_TOKEN").ok(),
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, DeskError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| {
                DeskError::Configuration(format!(
                    "Invalid bind address {}:{}",
                    self.host, self.port
                ))
            })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Merchant profiles plus the active pointer
    pub store: Arc<RwLock<ProfileStore>>,
    /// Operator sessions
    pub sessions: SessionManager,
    /// Pending OAuth state nonces
    pub oauth_states: StateNonces,
    /// OAuth app credentials, when onboarding is configured
    pub oauth: Option<OAuthConfig>,
    /// Store persistence backend
    pub persistence: BoxedStorePersistence,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create the AppState: pick a persistence backend, restore or seed
    /// the profile store, and wire up sessions.
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let persistence = build_persistence(&config)?;
        tracing::info!("Store persistence backend: {}", persistence.backend_name());

        let store = load_profile_store(&persistence).await?;
        tracing::info!(
            "Profile store ready: {} profile(s), active: {}",
            store.len(),
            store.active().name
        );

        let oauth = match OAuthConfig::from_env() {
            Ok(oauth) => Some(oauth),
            Err(e) => {
                tracing::info!("OAuth onboarding disabled: {}", e);
                None
            }
        };

        let sessions = SessionManager::new(&config.session_key, config.session_ttl_minutes);

        Ok(Self {
            store: Arc::new(RwLock::new(store)),
            sessions,
            oauth_states: StateNonces::new(),
            oauth,
            persistence,
            config,
        })
    }

    /// Build state from parts (for tests)
    pub fn with_store(
        store: ProfileStore,
        persistence: BoxedStorePersistence,
        config: AppConfig,
    ) -> Self {
        let sessions = SessionManager::new(&config.session_key, config.session_ttl_minutes);
        Self {
            store: Arc::new(RwLock::new(store)),
            sessions,
            oauth_states: StateNonces::new(),
            oauth: None,
            persistence,
            config,
        }
    }

    /// Stash the current store through the persistence backend.
    /// Best-effort: failures are logged, never surfaced to the request.
    pub async fn persist_store(&self) {
        let payload = {
            let store = self.store.read().await;
            store.to_json()
        };

        match payload {
            Ok(payload) => {
                if let Err(e) = self.persistence.save(&payload).await {
                    tracing::warn!(
                        "Store persistence ({}) failed: {}",
                        self.persistence.backend_name(),
                        e
                    );
                }
            }
            Err(e) => tracing::warn!("Store serialization failed: {}", e),
        }
    }
}

fn build_persistence(config: &AppConfig) -> Result<BoxedStorePersistence, DeskError> {
    match (&config.hosted_env_api_url, &config.hosted_env_api_token) {
        (Some(url), Some(token)) => Ok(Arc::new(HostedEnvPersistence::new(
            url.clone(),
            token.clone(),
            config.store_var.clone(),
        )?)),
        _ => Ok(Arc::new(EnvVarPersistence::new(config.store_var.clone()))),
    }
}

/// Restore the store, trying in order: persisted payload, seed file,
/// profile derived from `SQUARE_*` env vars. The store must end up with
/// at least one profile; startup fails otherwise.
async fn load_profile_store(
    persistence: &BoxedStorePersistence,
) -> anyhow::Result<ProfileStore> {
    if let Some(payload) = persistence.load().await? {
        match ProfileStore::from_json(&payload) {
            Ok(store) => {
                tracing::info!("Restored profile store from persisted payload");
                return Ok(store);
            }
            Err(e) => {
                tracing::warn!("Persisted store payload unusable, falling back: {}", e);
            }
        }
    }

    if let Some(store) = load_seed_profiles() {
        return Ok(store);
    }

    if let Ok(square) = SquareConfig::from_env() {
        tracing::info!("Seeding profile store from SQUARE_* environment");
        let profile = Profile::new(
            "Default",
            square.access_token,
            square.application_id,
            square.location_id,
            square.environment,
        );
        return Ok(ProfileStore::new(profile));
    }

    anyhow::bail!(
        "No profiles available: provide a persisted store, config/profiles.toml, or SQUARE_* env vars"
    )
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    profiles: Vec<SeedProfile>,
}

#[derive(Debug, Deserialize)]
struct SeedProfile {
    name: String,
    access_token: String,
    application_id: String,
    location_id: String,
    #[serde(default)]
    environment: Environment,
    #[serde(default)]
    max_amount: Option<i64>,
}

impl SeedProfile {
    fn into_profile(self) -> Profile {
        let mut profile = Profile::new(
            self.name,
            self.access_token,
            self.application_id,
            self.location_id,
            self.environment,
        );
        profile.max_amount = self.max_amount;
        profile
    }
}

/// Load seed profiles from a config file
fn load_seed_profiles() -> Option<ProfileStore> {
    let config_paths = [
        "config/profiles.toml",
        "../config/profiles.toml",
        "../../config/profiles.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let seed: SeedFile = match toml::from_str(&content) {
                Ok(seed) => seed,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path, e);
                    continue;
                }
            };

            let mut profiles = seed.profiles.into_iter().map(SeedProfile::into_profile);
            let first = profiles.next()?;
            let mut store = ProfileStore::new(first);
            for profile in profiles {
                store.add(profile);
            }

            tracing::info!("Loaded {} seed profile(s) from {}", store.len(), path);
            return Some(store);
        }
    }

    None
}
