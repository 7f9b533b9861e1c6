//! # Request Handlers
//!
//! Axum request handlers for the terminal API: operator login, profile
//! CRUD, manual charges, payment links, and OAuth onboarding.
//!
//! Every mutation persists the store through the configured backend
//! before the response goes out; persistence failures are logged, not
//! surfaced.

use crate::session::{constant_time_compare, session_cookie, SESSION_COOKIE};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use desk_core::{
    Currency, DeskError, Environment, Money, Profile, ProfileUpdate, ProfileView, Transaction,
    TransactionKind,
};
use desk_square::{complete_onboarding, CreateLink, CreatePayment, SquareClient, SquareConfig};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Operator login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// Create profile request
#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub name: String,
    pub access_token: String,
    pub application_id: String,
    pub location_id: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub max_amount: Option<i64>,
}

/// Manual card charge request
#[derive(Debug, Deserialize)]
pub struct ChargeRequest {
    /// Tokenized card from the Web Payments SDK
    pub source_id: String,
    /// Amount in smallest currency unit
    pub amount: i64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
}

/// Charge response
#[derive(Debug, Serialize)]
pub struct ChargeResponse {
    pub transaction_id: String,
    pub payment_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    pub amount: i64,
    pub currency: Currency,
}

/// Payment link request
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    /// Name shown on the checkout page
    pub name: String,
    /// Amount in smallest currency unit
    pub amount: i64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub description: Option<String>,
}

/// Payment link response
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub transaction_id: String,
    pub link_id: String,
    pub url: String,
    pub amount: i64,
    pub currency: Currency,
}

/// OAuth callback query parameters
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub(crate) fn desk_error_to_response(err: DeskError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

type HandlerResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

// =============================================================================
// Health & Auth
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "charge-desk",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Operator login: password in, session cookie out
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> HandlerResult<impl IntoResponse> {
    if !constant_time_compare(&request.password, &state.config.admin_password) {
        warn!("Rejected login attempt");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid password", 401)),
        ));
    }

    let token = state.sessions.issue();
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token
    );

    info!("Operator logged in");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "ok": true })),
    ))
}

/// Drop the current session and clear the cookie
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = session_cookie(&headers) {
        state.sessions.revoke(&token);
    }

    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE);

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "ok": true })),
    )
}

// =============================================================================
// Profile CRUD
// =============================================================================

/// List all profiles (tokens masked)
pub async fn list_profiles(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.read().await;
    let profiles: Vec<ProfileView> = store.iter().map(ProfileView::from).collect();

    Json(serde_json::json!({
        "profiles": profiles,
        "active_id": store.active_id,
        "count": profiles.len()
    }))
}

/// Add a profile
#[instrument(skip(state, request), fields(name = %request.name))]
pub async fn create_profile(
    State(state): State<AppState>,
    Json(request): Json<CreateProfileRequest>,
) -> HandlerResult<impl IntoResponse> {
    for (field, value) in [
        ("name", &request.name),
        ("access_token", &request.access_token),
        ("application_id", &request.application_id),
        ("location_id", &request.location_id),
    ] {
        if value.trim().is_empty() {
            return Err(desk_error_to_response(DeskError::InvalidRequest(format!(
                "{} must not be empty",
                field
            ))));
        }
    }

    let mut profile = Profile::new(
        request.name,
        request.access_token,
        request.application_id,
        request.location_id,
        request.environment,
    );
    profile.max_amount = request.max_amount;

    let view = ProfileView::from(&profile);
    {
        let mut store = state.store.write().await;
        store.add(profile);
    }
    state.persist_store().await;

    info!("Created profile {}", view.id);

    Ok((StatusCode::CREATED, Json(view)))
}

/// Partially update a profile
#[instrument(skip(state, update), fields(profile_id = %profile_id))]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> HandlerResult<Json<ProfileView>> {
    let view = {
        let mut store = state.store.write().await;
        let profile = store
            .update(&profile_id, update)
            .map_err(desk_error_to_response)?;
        ProfileView::from(profile)
    };
    state.persist_store().await;

    Ok(Json(view))
}

/// Delete a profile. The last profile cannot be deleted.
#[instrument(skip(state), fields(profile_id = %profile_id))]
pub async fn delete_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> HandlerResult<impl IntoResponse> {
    let active_id = {
        let mut store = state.store.write().await;
        store.remove(&profile_id).map_err(desk_error_to_response)?;
        store.active_id.clone()
    };
    state.persist_store().await;

    info!("Deleted profile {}", profile_id);

    Ok(Json(serde_json::json!({
        "deleted": profile_id,
        "active_id": active_id
    })))
}

/// Switch the active profile
#[instrument(skip(state), fields(profile_id = %profile_id))]
pub async fn activate_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> HandlerResult<impl IntoResponse> {
    {
        let mut store = state.store.write().await;
        store.activate(&profile_id).map_err(desk_error_to_response)?;
    }
    state.persist_store().await;

    Ok(Json(serde_json::json!({ "active_id": profile_id })))
}

/// The active profile's transaction log (bounded, most recent first)
pub async fn list_transactions(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.read().await;
    let profile = store.active();

    Json(serde_json::json!({
        "profile_id": profile.id,
        "transactions": profile.transactions,
        "count": profile.transactions.len()
    }))
}

// =============================================================================
// Payments
// =============================================================================

/// Take a manual card payment against the active profile
#[instrument(skip(state, request), fields(amount = request.amount))]
pub async fn charge(
    State(state): State<AppState>,
    Json(request): Json<ChargeRequest>,
) -> HandlerResult<Json<ChargeResponse>> {
    if request.source_id.trim().is_empty() {
        return Err(desk_error_to_response(DeskError::InvalidRequest(
            "source_id must not be empty".to_string(),
        )));
    }

    let amount = Money::from_cents(request.amount, request.currency);

    // Snapshot the active profile; the processor call must not hold the lock
    let (profile_id, square_config) = {
        let store = state.store.read().await;
        let profile = store.active();
        profile
            .charge_allowed(request.amount)
            .map_err(desk_error_to_response)?;
        (profile.id.clone(), SquareConfig::from_profile(profile))
    };

    let client = SquareClient::new(square_config).map_err(desk_error_to_response)?;

    let result = client
        .create_payment(&CreatePayment {
            source_id: request.source_id,
            amount,
            note: request.note,
            reference_id: request.reference_id,
        })
        .await;

    match result {
        Ok(payment) => {
            let tx = Transaction::charge(
                amount.amount,
                amount.currency,
                payment.id.clone(),
                payment.receipt_url.clone(),
            );
            let transaction_id = tx.id.clone();

            record_and_persist(&state, &profile_id, tx).await;

            info!("Charged {} (payment {})", amount.display(), payment.id);

            Ok(Json(ChargeResponse {
                transaction_id,
                payment_id: payment.id,
                status: payment.status,
                receipt_url: payment.receipt_url,
                amount: amount.amount,
                currency: amount.currency,
            }))
        }
        Err(e @ DeskError::ProviderError { .. }) => {
            // The processor said no: that is still history worth keeping
            let tx = Transaction::failed(
                TransactionKind::Charge,
                amount.amount,
                amount.currency,
                e.to_string(),
            );
            record_and_persist(&state, &profile_id, tx).await;

            error!("Charge failed: {}", e);
            Err(desk_error_to_response(e))
        }
        Err(e) => {
            error!("Charge failed: {}", e);
            Err(desk_error_to_response(e))
        }
    }
}

/// Create a shareable payment link on the active profile
#[instrument(skip(state, request), fields(amount = request.amount))]
pub async fn create_link(
    State(state): State<AppState>,
    Json(request): Json<LinkRequest>,
) -> HandlerResult<Json<LinkResponse>> {
    if request.name.trim().is_empty() {
        return Err(desk_error_to_response(DeskError::InvalidRequest(
            "name must not be empty".to_string(),
        )));
    }

    let amount = Money::from_cents(request.amount, request.currency);

    let (profile_id, square_config) = {
        let store = state.store.read().await;
        let profile = store.active();
        // The profile ceiling applies to links the same as charges
        profile
            .charge_allowed(request.amount)
            .map_err(desk_error_to_response)?;
        (profile.id.clone(), SquareConfig::from_profile(profile))
    };

    let client = SquareClient::new(square_config).map_err(desk_error_to_response)?;

    let result = client
        .create_payment_link(&CreateLink {
            name: request.name,
            amount,
            description: request.description,
        })
        .await;

    match result {
        Ok(link) => {
            let tx = Transaction::link(
                amount.amount,
                amount.currency,
                link.id.clone(),
                link.url.clone(),
            );
            let transaction_id = tx.id.clone();

            record_and_persist(&state, &profile_id, tx).await;

            info!("Created payment link {} for {}", link.id, amount.display());

            Ok(Json(LinkResponse {
                transaction_id,
                link_id: link.id,
                url: link.url,
                amount: amount.amount,
                currency: amount.currency,
            }))
        }
        Err(e @ DeskError::ProviderError { .. }) => {
            let tx = Transaction::failed(
                TransactionKind::Link,
                amount.amount,
                amount.currency,
                e.to_string(),
            );
            record_and_persist(&state, &profile_id, tx).await;

            error!("Payment link failed: {}", e);
            Err(desk_error_to_response(e))
        }
        Err(e) => {
            error!("Payment link failed: {}", e);
            Err(desk_error_to_response(e))
        }
    }
}

async fn record_and_persist(state: &AppState, profile_id: &str, tx: Transaction) {
    {
        let mut store = state.store.write().await;
        if let Err(e) = store.record_transaction(profile_id, tx) {
            // Profile deleted mid-flight; the payment still went through
            warn!("Could not record transaction: {}", e);
        }
    }
    state.persist_store().await;
}

// =============================================================================
// OAuth Onboarding
// =============================================================================

/// Send the operator to Square's consent page
pub async fn oauth_authorize(
    State(state): State<AppState>,
) -> HandlerResult<Redirect> {
    let oauth = state.oauth.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("OAuth onboarding is not configured", 503)),
        )
    })?;

    let nonce = state.oauth_states.issue();
    Ok(Redirect::to(&oauth.authorize_url(&nonce)))
}

/// Square redirects back here with the authorization code
#[instrument(skip(state, params))]
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallbackParams>,
) -> HandlerResult<Redirect> {
    let oauth = state.oauth.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("OAuth onboarding is not configured", 503)),
        )
    })?;

    if let Some(denied) = params.error {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(
                ErrorResponse::new("Authorization was denied", 400).with_details(denied),
            ),
        ));
    }

    let code = params.code.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Missing authorization code", 400)),
        )
    })?;

    let nonce = params.state.unwrap_or_default();
    if !state.oauth_states.take(&nonce) {
        return Err(desk_error_to_response(DeskError::OAuthStateMismatch));
    }

    let onboarded = complete_onboarding(oauth, &code).await.map_err(|e| {
        error!("OAuth onboarding failed: {}", e);
        desk_error_to_response(e)
    })?;

    let profile = onboarded.into_profile(oauth.application_id.clone());
    let profile_id = profile.id.clone();

    {
        let mut store = state.store.write().await;
        store.add(profile);
        store
            .activate(&profile_id)
            .map_err(desk_error_to_response)?;
    }
    state.persist_store().await;

    info!("Onboarded merchant profile {}", profile_id);

    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400);
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);

        let err = err.with_details("more context");
        assert_eq!(err.details.as_deref(), Some("more context"));
    }

    #[test]
    fn test_desk_error_conversion() {
        let err = DeskError::InvalidRequest("Bad data".to_string());
        let (status, _json) = desk_error_to_response(err);
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _json) = desk_error_to_response(DeskError::LastProfile);
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_charge_request_defaults() {
        let request: ChargeRequest =
            serde_json::from_str(r#"{"source_id":"cnon:ok","amount":2500}"#).unwrap();

        assert_eq!(request.currency, Currency::USD);
        assert!(request.note.is_none());
        assert!(request.reference_id.is_none());
    }

    #[test]
    fn test_create_profile_request_defaults() {
        let request: CreateProfileRequest = serde_json::from_str(
            r#"{"name":"Cart","access_token":"EAAAx","application_id":"sandbox-sq0idb-a","location_id":"L1"}"#,
        )
        .unwrap();

        assert_eq!(request.environment, Environment::Sandbox);
        assert!(request.max_amount.is_none());
    }

    #[test]
    fn test_oauth_callback_params() {
        let params: OAuthCallbackParams =
            serde_json::from_str(r#"{"code":"c1","state":"n1"}"#).unwrap();
        assert_eq!(params.code.as_deref(), Some("c1"));
        assert!(params.error.is_none());
    }
}
