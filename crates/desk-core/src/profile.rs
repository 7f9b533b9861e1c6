//! # Merchant Profiles
//!
//! A profile is one set of Square credentials the operator can charge
//! against. The terminal holds several and switches between them; the
//! access token is a secret and is masked on every read path.

use crate::error::{DeskError, DeskResult};
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction log entries kept per profile, oldest evicted first
pub const TRANSACTION_LOG_CAP: usize = 50;

/// Which Square environment a profile's credentials belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Sandbox
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One set of merchant credentials plus its transaction history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Opaque profile ID (generated)
    pub id: String,

    /// Display name (usually the business name)
    pub name: String,

    /// Square access token. Secret: only ever exposed masked.
    pub access_token: String,

    /// Square application ID
    pub application_id: String,

    /// Square location the payments are taken at
    pub location_id: String,

    /// Sandbox or production credentials
    #[serde(default)]
    pub environment: Environment,

    /// Optional charge ceiling in smallest currency unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<i64>,

    /// Bounded log, most-recent-first
    #[serde(default)]
    pub transactions: Vec<Transaction>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Create a new profile with a generated ID
    pub fn new(
        name: impl Into<String>,
        access_token: impl Into<String>,
        application_id: impl Into<String>,
        location_id: impl Into<String>,
        environment: Environment,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            access_token: access_token.into(),
            application_id: application_id.into(),
            location_id: location_id.into(),
            environment,
            max_amount: None,
            transactions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Builder: set the charge ceiling
    pub fn with_max_amount(mut self, max_amount: i64) -> Self {
        self.max_amount = Some(max_amount);
        self
    }

    /// The access token in masked form (first 4 + last 4 visible)
    pub fn masked_token(&self) -> String {
        mask_secret(&self.access_token)
    }

    /// Check a charge amount against the profile ceiling
    pub fn charge_allowed(&self, amount: i64) -> DeskResult<()> {
        if amount <= 0 {
            return Err(DeskError::InvalidRequest(
                "Amount must be positive".to_string(),
            ));
        }
        if let Some(limit) = self.max_amount {
            if amount > limit {
                return Err(DeskError::AmountLimitExceeded { amount, limit });
            }
        }
        Ok(())
    }

    /// Prepend a transaction, evicting the oldest past the cap
    pub fn record(&mut self, tx: Transaction) {
        self.transactions.insert(0, tx);
        self.transactions.truncate(TRANSACTION_LOG_CAP);
    }
}

/// Mask a secret for read paths: first 4 and last 4 characters visible.
/// Short secrets are masked entirely.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let prefix: String = chars.iter().take(4).collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", prefix, suffix)
}

/// What the API returns for a profile: everything except the raw token
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: String,
    pub name: String,
    pub access_token: String,
    pub application_id: String,
    pub location_id: String,
    pub environment: Environment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<i64>,
    pub transaction_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            access_token: profile.masked_token(),
            application_id: profile.application_id.clone(),
            location_id: profile.location_id.clone(),
            environment: profile.environment,
            max_amount: profile.max_amount,
            transaction_count: profile.transactions.len(),
            created_at: profile.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use crate::transaction::TransactionKind;

    fn test_profile() -> Profile {
        Profile::new(
            "Coffee Cart",
            "EAAAl1234567890abcdef",
            "sq0idp-abc123",
            "L1234567",
            Environment::Production,
        )
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("EAAAl1234567890abcdef"), "EAAA****cdef");
        assert_eq!(mask_secret("short"), "********");
        assert_eq!(mask_secret(""), "********");
    }

    #[test]
    fn test_view_never_exposes_raw_token() {
        let profile = test_profile();
        let view = ProfileView::from(&profile);

        assert_eq!(view.access_token, "EAAA****cdef");
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("EAAAl1234567890abcdef"));
    }

    #[test]
    fn test_charge_allowed() {
        let profile = test_profile().with_max_amount(5_000);

        assert!(profile.charge_allowed(5_000).is_ok());
        assert!(matches!(
            profile.charge_allowed(5_001),
            Err(DeskError::AmountLimitExceeded {
                amount: 5_001,
                limit: 5_000
            })
        ));
        assert!(matches!(
            profile.charge_allowed(0),
            Err(DeskError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_no_ceiling_allows_any_positive_amount() {
        let profile = test_profile();
        assert!(profile.charge_allowed(10_000_000).is_ok());
    }

    #[test]
    fn test_log_cap_evicts_oldest() {
        let mut profile = test_profile();

        for i in 0..60 {
            profile.record(Transaction::failed(
                TransactionKind::Charge,
                100 + i,
                Currency::USD,
                "CARD_DECLINED",
            ));
        }

        assert_eq!(profile.transactions.len(), TRANSACTION_LOG_CAP);
        // Most recent first; the first ten recorded fell off the end
        assert_eq!(profile.transactions[0].amount, 159);
        assert_eq!(profile.transactions.last().unwrap().amount, 110);
    }
}
