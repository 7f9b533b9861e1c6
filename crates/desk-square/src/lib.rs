//! # desk-square
//!
//! Square API client for charge-desk-rs.
//!
//! This crate provides:
//!
//! 1. **SquareClient** - Payments, payment links, merchants, locations
//!    - Manual card payments (`POST /v2/payments`)
//!    - Shareable payment links (`POST /v2/online-checkout/payment-links`)
//!    - Merchant and location lookups
//!
//! 2. **OAuth onboarding** - Authorization-code exchange plus the
//!    follow-up lookups that turn a consent grant into a usable profile.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use desk_square::{CreatePayment, SquareClient, SquareConfig};
//! use desk_core::{Currency, Money};
//!
//! // Client for the active profile's credentials
//! let client = SquareClient::new(SquareConfig::from_profile(&profile))?;
//!
//! // Take a manual card payment
//! let payment = client.create_payment(&CreatePayment {
//!     source_id: nonce,
//!     amount: Money::from_cents(2500, Currency::USD),
//!     note: Some("walk-in".into()),
//!     reference_id: None,
//! }).await?;
//!
//! // Hand payment.receipt_url to the operator
//! ```
//!
//! ## OAuth Onboarding
//!
//! ```rust,ignore
//! use desk_square::{complete_onboarding, OAuthConfig};
//!
//! let oauth = OAuthConfig::from_env()?;
//!
//! // 1. Redirect the operator to oauth.authorize_url(&state)
//! // 2. On the callback, exchange the code:
//! let onboarded = complete_onboarding(&oauth, &code).await?;
//! let profile = onboarded.into_profile(&oauth.application_id);
//! ```

pub mod client;
pub mod config;
pub mod oauth;

// Re-exports
pub use client::{
    CreateLink, CreatePayment, Location, Merchant, Payment, PaymentLink, SquareClient,
};
pub use config::{base_url_for, SquareConfig, SQUARE_API_VERSION};
pub use oauth::{
    complete_onboarding, obtain_token, OAuthConfig, OnboardedMerchant, TokenResponse,
    OAUTH_SCOPES,
};
