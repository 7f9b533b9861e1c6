//! # Square API Client
//!
//! Thin client over the Square REST endpoints the terminal uses:
//! payments, payment links, merchants, and locations.
//!
//! Every call sends the `Square-Version` header and parses the standard
//! Square error envelope (`errors[].category/code/detail`) on failure.

use crate::config::SquareConfig;
use chrono::{DateTime, Utc};
use desk_core::{DeskError, DeskResult, Money};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Client for one set of Square credentials
pub struct SquareClient {
    config: SquareConfig,
    client: Client,
}

impl SquareClient {
    /// Create a new client
    pub fn new(config: SquareConfig) -> DeskResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| DeskError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> DeskResult<Self> {
        let config = SquareConfig::from_env()?;
        Self::new(config)
    }

    /// Take a manual card payment.
    ///
    /// `source_id` is the tokenized card from the Web Payments SDK (or a
    /// sandbox test nonce). A fresh idempotency key is generated per call.
    #[instrument(skip(self, request), fields(amount = request.amount.amount))]
    pub async fn create_payment(&self, request: &CreatePayment) -> DeskResult<Payment> {
        let url = format!("{}/v2/payments", self.config.api_base_url);

        let mut body = json!({
            "source_id": request.source_id,
            "idempotency_key": Uuid::new_v4().to_string(),
            "amount_money": {
                "amount": request.amount.amount,
                "currency": request.amount.currency.as_str(),
            },
            "location_id": self.config.location_id,
            "autocomplete": true,
        });

        if let Some(ref note) = request.note {
            body["note"] = json!(note);
        }
        if let Some(ref reference_id) = request.reference_id {
            body["reference_id"] = json!(reference_id);
        }

        debug!(
            "Creating Square payment: {} at location {}",
            request.amount.display(),
            self.config.location_id
        );

        let payload = self.post(&url, &body).await?;

        let response: PaymentResponse = serde_json::from_str(&payload).map_err(|e| {
            DeskError::Serialization(format!("Failed to parse payment response: {}", e))
        })?;

        info!(
            "Created Square payment: id={}, status={}",
            response.payment.id, response.payment.status
        );

        Ok(response.payment)
    }

    /// Create a shareable payment link for a fixed amount.
    #[instrument(skip(self, request), fields(amount = request.amount.amount))]
    pub async fn create_payment_link(&self, request: &CreateLink) -> DeskResult<PaymentLink> {
        let url = format!("{}/v2/online-checkout/payment-links", self.config.api_base_url);

        let mut body = json!({
            "idempotency_key": Uuid::new_v4().to_string(),
            "quick_pay": {
                "name": request.name,
                "price_money": {
                    "amount": request.amount.amount,
                    "currency": request.amount.currency.as_str(),
                },
                "location_id": self.config.location_id,
            },
        });

        if let Some(ref description) = request.description {
            body["description"] = json!(description);
        }

        let payload = self.post(&url, &body).await?;

        let response: PaymentLinkResponse = serde_json::from_str(&payload).map_err(|e| {
            DeskError::Serialization(format!("Failed to parse payment link response: {}", e))
        })?;

        info!(
            "Created Square payment link: id={}, url={}",
            response.payment_link.id, response.payment_link.url
        );

        Ok(response.payment_link)
    }

    /// Retrieve a merchant by ID (`me` resolves to the token's merchant)
    #[instrument(skip(self))]
    pub async fn retrieve_merchant(&self, merchant_id: &str) -> DeskResult<Merchant> {
        let url = format!("{}/v2/merchants/{}", self.config.api_base_url, merchant_id);
        let payload = self.get(&url).await?;

        let response: MerchantResponse = serde_json::from_str(&payload).map_err(|e| {
            DeskError::Serialization(format!("Failed to parse merchant response: {}", e))
        })?;

        Ok(response.merchant)
    }

    /// List the merchant's locations
    #[instrument(skip(self))]
    pub async fn list_locations(&self) -> DeskResult<Vec<Location>> {
        let url = format!("{}/v2/locations", self.config.api_base_url);
        let payload = self.get(&url).await?;

        let response: LocationsResponse = serde_json::from_str(&payload).map_err(|e| {
            DeskError::Serialization(format!("Failed to parse locations response: {}", e))
        })?;

        Ok(response.locations)
    }

    async fn post(&self, url: &str, body: &serde_json::Value) -> DeskResult<String> {
        let response = self
            .client
            .post(url)
            .header("Authorization", self.config.auth_header())
            .header("Square-Version", &self.config.api_version)
            .json(body)
            .send()
            .await
            .map_err(|e| DeskError::NetworkError(e.to_string()))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|e| DeskError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Square API error: url={}, status={}", url, status);
            return Err(parse_square_error(status.as_u16(), &payload));
        }

        Ok(payload)
    }

    async fn get(&self, url: &str) -> DeskResult<String> {
        let response = self
            .client
            .get(url)
            .header("Authorization", self.config.auth_header())
            .header("Square-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| DeskError::NetworkError(e.to_string()))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|e| DeskError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Square API error: status={}", status);
            return Err(parse_square_error(status.as_u16(), &payload));
        }

        Ok(payload)
    }
}

/// Map a non-2xx Square response into a typed error
pub(crate) fn parse_square_error(status: u16, body: &str) -> DeskError {
    if let Ok(envelope) = serde_json::from_str::<SquareErrorResponse>(body) {
        if let Some(first) = envelope.errors.into_iter().next() {
            return DeskError::ProviderError {
                code: first.code,
                detail: first
                    .detail
                    .unwrap_or_else(|| first.category.clone()),
            };
        }
    }

    DeskError::ProviderError {
        code: format!("HTTP_{}", status),
        detail: body.to_string(),
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Manual card payment request
#[derive(Debug, Clone)]
pub struct CreatePayment {
    /// Tokenized card (Web Payments SDK nonce)
    pub source_id: String,
    /// Amount to charge
    pub amount: Money,
    /// Free-text note shown on the merchant dashboard
    pub note: Option<String>,
    /// Operator reference (invoice number etc.)
    pub reference_id: Option<String>,
}

/// Payment link request
#[derive(Debug, Clone)]
pub struct CreateLink {
    /// Name shown on the checkout page
    pub name: String,
    /// Fixed price
    pub amount: Money,
    /// Optional description
    pub description: Option<String>,
}

// =============================================================================
// Square API Types
// =============================================================================

/// A payment as returned by Square
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Square reports COMPLETED once the charge settles
    pub fn is_completed(&self) -> bool {
        self.status == "COMPLETED"
    }
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    payment: Payment,
}

/// A payment link as returned by Square
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PaymentLinkResponse {
    payment_link: PaymentLink,
}

/// Merchant record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    pub id: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MerchantResponse {
    merchant: Merchant,
}

/// Merchant location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Location {
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("ACTIVE")
    }
}

#[derive(Debug, Deserialize)]
struct LocationsResponse {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct SquareErrorResponse {
    errors: Vec<SquareApiError>,
}

#[derive(Debug, Deserialize)]
struct SquareApiError {
    category: String,
    code: String,
    #[serde(default)]
    detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SQUARE_API_VERSION;
    use desk_core::{Currency, Environment};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> SquareConfig {
        SquareConfig::new(
            "EAAAtest_token",
            "sandbox-sq0idb-app",
            "L_TEST",
            Environment::Sandbox,
        )
        .with_api_base_url(base_url)
    }

    #[test]
    fn test_parse_square_error_envelope() {
        let body = r#"{"errors":[{"category":"PAYMENT_METHOD_ERROR","code":"CARD_DECLINED","detail":"Card declined."}]}"#;
        let err = parse_square_error(402, body);

        match err {
            DeskError::ProviderError { code, detail } => {
                assert_eq!(code, "CARD_DECLINED");
                assert_eq!(detail, "Card declined.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_square_error_fallback() {
        let err = parse_square_error(500, "not json");
        match err {
            DeskError::ProviderError { code, .. } => assert_eq!(code, "HTTP_500"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_payment_status() {
        let payment = Payment {
            id: "pay_1".to_string(),
            status: "COMPLETED".to_string(),
            receipt_url: None,
            created_at: None,
        };
        assert!(payment.is_completed());
    }

    #[tokio::test]
    async fn test_create_payment() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/payments"))
            .and(header("Square-Version", SQUARE_API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"payment":{"id":"pay_abc","status":"COMPLETED","receipt_url":"https://squareup.com/receipt/pay_abc"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = SquareClient::new(test_config(&server.uri())).unwrap();
        let payment = client
            .create_payment(&CreatePayment {
                source_id: "cnon:card-nonce-ok".to_string(),
                amount: Money::from_cents(2500, Currency::USD),
                note: Some("walk-in".to_string()),
                reference_id: None,
            })
            .await
            .unwrap();

        assert_eq!(payment.id, "pay_abc");
        assert!(payment.is_completed());
        assert_eq!(
            payment.receipt_url.as_deref(),
            Some("https://squareup.com/receipt/pay_abc")
        );
    }

    #[tokio::test]
    async fn test_create_payment_declined() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/payments"))
            .respond_with(ResponseTemplate::new(402).set_body_raw(
                r#"{"errors":[{"category":"PAYMENT_METHOD_ERROR","code":"CARD_DECLINED","detail":"Card declined."}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = SquareClient::new(test_config(&server.uri())).unwrap();
        let err = client
            .create_payment(&CreatePayment {
                source_id: "cnon:card-nonce-declined".to_string(),
                amount: Money::from_cents(2500, Currency::USD),
                note: None,
                reference_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DeskError::ProviderError { ref code, .. } if code == "CARD_DECLINED"));
    }

    #[tokio::test]
    async fn test_list_locations() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/locations"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"locations":[{"id":"L1","name":"Main","status":"ACTIVE"},{"id":"L2","name":"Old","status":"INACTIVE"}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = SquareClient::new(test_config(&server.uri())).unwrap();
        let locations = client.list_locations().await.unwrap();

        assert_eq!(locations.len(), 2);
        assert!(locations[0].is_active());
        assert!(!locations[1].is_active());
    }
}
