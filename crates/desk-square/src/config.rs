//! # Square Configuration
//!
//! Configuration management for the Square integration.
//! Secrets come from environment variables or from a stored profile.

use desk_core::{DeskError, Environment, Profile};
use std::env;

/// Square API version sent with every request
pub const SQUARE_API_VERSION: &str = "2025-01-23";

/// Base URL for production credentials
pub const PRODUCTION_BASE_URL: &str = "https://connect.squareup.com";

/// Base URL for sandbox credentials
pub const SANDBOX_BASE_URL: &str = "https://connect.squareupsandbox.com";

/// Square API configuration for one set of credentials
#[derive(Debug, Clone)]
pub struct SquareConfig {
    /// Access token (EAAA...)
    pub access_token: String,

    /// Application ID (sq0idp-... or sandbox-sq0idb-...)
    pub application_id: String,

    /// Location payments are taken at
    pub location_id: String,

    /// Sandbox or production
    pub environment: Environment,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,
}

impl SquareConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `SQUARE_ACCESS_TOKEN`
    /// - `SQUARE_APPLICATION_ID`
    /// - `SQUARE_LOCATION_ID`
    ///
    /// Optional:
    /// - `SQUARE_ENVIRONMENT` (`sandbox` | `production`, default `sandbox`)
    pub fn from_env() -> Result<Self, DeskError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let access_token = env::var("SQUARE_ACCESS_TOKEN").map_err(|_| {
            DeskError::Configuration("SQUARE_ACCESS_TOKEN not set".to_string())
        })?;

        let application_id = env::var("SQUARE_APPLICATION_ID").map_err(|_| {
            DeskError::Configuration("SQUARE_APPLICATION_ID not set".to_string())
        })?;

        let location_id = env::var("SQUARE_LOCATION_ID").map_err(|_| {
            DeskError::Configuration("SQUARE_LOCATION_ID not set".to_string())
        })?;

        let environment = match env::var("SQUARE_ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            Ok("sandbox") | Err(_) => Environment::Sandbox,
            Ok(other) => {
                return Err(DeskError::Configuration(format!(
                    "SQUARE_ENVIRONMENT must be 'sandbox' or 'production', got '{}'",
                    other
                )))
            }
        };

        // Validate that the application ID matches the environment
        match environment {
            Environment::Sandbox if !application_id.starts_with("sandbox-") => {
                return Err(DeskError::Configuration(
                    "SQUARE_APPLICATION_ID must start with sandbox- in sandbox mode".to_string(),
                ));
            }
            Environment::Production if application_id.starts_with("sandbox-") => {
                return Err(DeskError::Configuration(
                    "Sandbox SQUARE_APPLICATION_ID used with production environment".to_string(),
                ));
            }
            _ => {}
        }

        Ok(Self::new(access_token, application_id, location_id, environment))
    }

    /// Create config with explicit values
    pub fn new(
        access_token: impl Into<String>,
        application_id: impl Into<String>,
        location_id: impl Into<String>,
        environment: Environment,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            application_id: application_id.into(),
            location_id: location_id.into(),
            environment,
            api_base_url: base_url_for(environment).to_string(),
            api_version: SQUARE_API_VERSION.to_string(),
        }
    }

    /// Build config from a stored merchant profile
    pub fn from_profile(profile: &Profile) -> Self {
        Self::new(
            profile.access_token.clone(),
            profile.application_id.clone(),
            profile.location_id.clone(),
            profile.environment,
        )
    }

    /// Check if using sandbox credentials
    pub fn is_sandbox(&self) -> bool {
        self.environment == Environment::Sandbox
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Map an environment to its Square connect host
pub fn base_url_for(environment: Environment) -> &'static str {
    match environment {
        Environment::Sandbox => SANDBOX_BASE_URL,
        Environment::Production => PRODUCTION_BASE_URL,
    }
}
