//! # Square OAuth Onboarding
//!
//! Authorization-code flow for onboarding a merchant without hand-copying
//! credentials: the operator is sent to Square's consent page, Square
//! redirects back with a code, and the code is exchanged for an access
//! token. Two follow-up GETs (merchant, locations) turn the token into a
//! ready-to-use profile.

use crate::client::SquareClient;
use crate::config::{base_url_for, SquareConfig};
use desk_core::{DeskError, DeskResult, Environment, Profile};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument};

/// Scopes requested during authorization
pub const OAUTH_SCOPES: &[&str] = &[
    "MERCHANT_PROFILE_READ",
    "PAYMENTS_READ",
    "PAYMENTS_WRITE",
    "ORDERS_WRITE",
];

/// OAuth application credentials
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Application ID (doubles as the OAuth client id)
    pub application_id: String,

    /// Application secret (sq0csp-...)
    pub application_secret: String,

    /// Redirect URL registered with the Square application
    pub redirect_url: String,

    /// Sandbox or production
    pub environment: Environment,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl OAuthConfig {
    /// Load OAuth configuration from environment variables.
    ///
    /// Required env vars:
    /// - `SQUARE_APPLICATION_ID`
    /// - `SQUARE_APPLICATION_SECRET`
    /// - `OAUTH_REDIRECT_URL`
    pub fn from_env() -> DeskResult<Self> {
        dotenvy::dotenv().ok();

        let application_id = std::env::var("SQUARE_APPLICATION_ID").map_err(|_| {
            DeskError::Configuration("SQUARE_APPLICATION_ID not set".to_string())
        })?;

        let application_secret = std::env::var("SQUARE_APPLICATION_SECRET").map_err(|_| {
            DeskError::Configuration("SQUARE_APPLICATION_SECRET not set".to_string())
        })?;

        let redirect_url = std::env::var("OAUTH_REDIRECT_URL").map_err(|_| {
            DeskError::Configuration("OAUTH_REDIRECT_URL not set".to_string())
        })?;

        if !application_secret.starts_with("sq0csp-") {
            return Err(DeskError::Configuration(
                "SQUARE_APPLICATION_SECRET must start with sq0csp-".to_string(),
            ));
        }

        let environment = if application_id.starts_with("sandbox-") {
            Environment::Sandbox
        } else {
            Environment::Production
        };

        Ok(Self {
            application_id,
            application_secret,
            redirect_url,
            environment,
            api_base_url: base_url_for(environment).to_string(),
        })
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// The consent page URL the operator is redirected to.
    ///
    /// `state` is an opaque nonce echoed back on the callback; the caller
    /// verifies it before exchanging the code.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/oauth2/authorize?client_id={}&scope={}&session=false&state={}",
            self.api_base_url,
            self.application_id,
            OAUTH_SCOPES.join("+"),
            state
        )
    }
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub merchant_id: String,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Everything needed to build a profile for a freshly onboarded merchant
#[derive(Debug, Clone)]
pub struct OnboardedMerchant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub merchant_id: String,
    pub business_name: String,
    pub location_id: String,
    pub environment: Environment,
}

impl OnboardedMerchant {
    /// Turn the onboarding result into a store profile
    pub fn into_profile(self, application_id: impl Into<String>) -> Profile {
        Profile::new(
            self.business_name,
            self.access_token,
            application_id,
            self.location_id,
            self.environment,
        )
    }
}

/// Exchange an authorization code for an access token.
#[instrument(skip(config, code))]
pub async fn obtain_token(config: &OAuthConfig, code: &str) -> DeskResult<TokenResponse> {
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| DeskError::Internal(format!("Failed to create HTTP client: {}", e)))?;

    let url = format!("{}/oauth2/token", config.api_base_url);

    let body = json!({
        "client_id": config.application_id,
        "client_secret": config.application_secret,
        "code": code,
        "grant_type": "authorization_code",
        "redirect_uri": config.redirect_url,
    });

    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| DeskError::NetworkError(e.to_string()))?;

    let status = response.status();
    let payload = response
        .text()
        .await
        .map_err(|e| DeskError::NetworkError(e.to_string()))?;

    if !status.is_success() {
        error!("OAuth token exchange failed: status={}", status);
        return Err(DeskError::OAuthExchangeFailed(format!(
            "HTTP {}: {}",
            status, payload
        )));
    }

    let token: TokenResponse = serde_json::from_str(&payload).map_err(|e| {
        DeskError::OAuthExchangeFailed(format!("Invalid token response: {}", e))
    })?;

    info!("OAuth exchange complete for merchant {}", token.merchant_id);

    Ok(token)
}

/// Run the full onboarding sequence: exchange the code, then fetch the
/// merchant record and location list with the new token.
#[instrument(skip(config, code))]
pub async fn complete_onboarding(
    config: &OAuthConfig,
    code: &str,
) -> DeskResult<OnboardedMerchant> {
    let token = obtain_token(config, code).await?;

    // The follow-up GETs run with the merchant's token, not ours
    let merchant_config = SquareConfig::new(
        token.access_token.clone(),
        config.application_id.clone(),
        String::new(),
        config.environment,
    )
    .with_api_base_url(config.api_base_url.clone());
    let client = SquareClient::new(merchant_config)?;

    let merchant = client.retrieve_merchant(&token.merchant_id).await?;
    let locations = client.list_locations().await?;

    let location = locations
        .iter()
        .find(|l| l.is_active())
        .or_else(|| locations.first())
        .ok_or_else(|| {
            DeskError::OAuthExchangeFailed("Merchant has no locations".to_string())
        })?;

    debug!(
        "Onboarding resolved merchant={} location={}",
        merchant.id, location.id
    );

    Ok(OnboardedMerchant {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        merchant_id: merchant.id,
        business_name: merchant
            .business_name
            .unwrap_or_else(|| token.merchant_id.clone()),
        location_id: location.id.clone(),
        environment: config.environment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_oauth_config(base_url: &str) -> OAuthConfig {
        OAuthConfig {
            application_id: "sandbox-sq0idb-app".to_string(),
            application_secret: "sq0csp-secret".to_string(),
            redirect_url: "http://localhost:8080/oauth/callback".to_string(),
            environment: Environment::Sandbox,
            api_base_url: base_url.to_string(),
        }
    }

    #[test]
    fn test_authorize_url() {
        let config = test_oauth_config("https://connect.squareupsandbox.com");
        let url = config.authorize_url("nonce123");

        assert!(url.starts_with("https://connect.squareupsandbox.com/oauth2/authorize?"));
        assert!(url.contains("client_id=sandbox-sq0idb-app"));
        assert!(url.contains("scope=MERCHANT_PROFILE_READ+PAYMENTS_READ+PAYMENTS_WRITE+ORDERS_WRITE"));
        assert!(url.contains("state=nonce123"));
        assert!(url.contains("session=false"));
    }

    #[test]
    fn test_token_response_parse() {
        let payload = r#"{
            "access_token": "EAAAnew_merchant_token",
            "token_type": "bearer",
            "expires_at": "2026-09-06T00:00:00Z",
            "merchant_id": "MERCHANT_1",
            "refresh_token": "EQAArefresh"
        }"#;

        let token: TokenResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(token.access_token, "EAAAnew_merchant_token");
        assert_eq!(token.merchant_id, "MERCHANT_1");
        assert_eq!(token.refresh_token.as_deref(), Some("EQAArefresh"));
    }

    #[tokio::test]
    async fn test_complete_onboarding_sequence() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_partial_json(json!({
                "grant_type": "authorization_code",
                "code": "auth_code_1",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"access_token":"EAAAmerchant","token_type":"bearer","merchant_id":"M1"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/merchants/M1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"merchant":{"id":"M1","business_name":"Corner Bakery","status":"ACTIVE"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/locations"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"locations":[{"id":"L_INACTIVE","status":"INACTIVE"},{"id":"L_MAIN","name":"Main","status":"ACTIVE"}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let config = test_oauth_config(&server.uri());
        let onboarded = complete_onboarding(&config, "auth_code_1").await.unwrap();

        assert_eq!(onboarded.merchant_id, "M1");
        assert_eq!(onboarded.business_name, "Corner Bakery");
        // First ACTIVE location wins
        assert_eq!(onboarded.location_id, "L_MAIN");

        let profile = onboarded.into_profile("sandbox-sq0idb-app");
        assert_eq!(profile.name, "Corner Bakery");
        assert_eq!(profile.access_token, "EAAAmerchant");
    }

    #[tokio::test]
    async fn test_obtain_token_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(401).set_body_raw(
                r#"{"message":"Authorization code not found"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let config = test_oauth_config(&server.uri());
        let err = obtain_token(&config, "bad_code").await.unwrap_err();

        assert!(matches!(err, DeskError::OAuthExchangeFailed(_)));
    }
}
