//! # Transaction Log Types
//!
//! Per-profile record of charges and payment links taken through the
//! terminal. The log is display history, not an accounting ledger; the
//! processor remains the source of truth.

use crate::money::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of payment produced this entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Manual card charge keyed in by the operator
    Charge,
    /// Shareable payment link
    Link,
}

/// Outcome of the processor call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Processor accepted and completed the payment
    Completed,
    /// Created but not yet paid (payment links)
    Pending,
    /// Processor rejected the request
    Failed,
}

/// A single entry in a profile's transaction log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Internal entry ID (generated)
    pub id: String,

    /// Charge or link
    pub kind: TransactionKind,

    /// Amount in smallest currency unit
    pub amount: i64,

    /// Currency
    pub currency: Currency,

    /// Outcome
    pub status: TransactionStatus,

    /// Processor's payment or link ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_id: Option<String>,

    /// Receipt URL (charges)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,

    /// Checkout URL (payment links)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,

    /// Processor error detail (failed entries)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    fn base(kind: TransactionKind, amount: i64, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            amount,
            currency,
            status: TransactionStatus::Pending,
            processor_id: None,
            receipt_url: None,
            checkout_url: None,
            error_detail: None,
            created_at: Utc::now(),
        }
    }

    /// Record a completed card charge
    pub fn charge(
        amount: i64,
        currency: Currency,
        processor_id: impl Into<String>,
        receipt_url: Option<String>,
    ) -> Self {
        let mut tx = Self::base(TransactionKind::Charge, amount, currency);
        tx.status = TransactionStatus::Completed;
        tx.processor_id = Some(processor_id.into());
        tx.receipt_url = receipt_url;
        tx
    }

    /// Record a created payment link (pending until paid)
    pub fn link(
        amount: i64,
        currency: Currency,
        processor_id: impl Into<String>,
        checkout_url: impl Into<String>,
    ) -> Self {
        let mut tx = Self::base(TransactionKind::Link, amount, currency);
        tx.processor_id = Some(processor_id.into());
        tx.checkout_url = Some(checkout_url.into());
        tx
    }

    /// Record a processor rejection
    pub fn failed(
        kind: TransactionKind,
        amount: i64,
        currency: Currency,
        detail: impl Into<String>,
    ) -> Self {
        let mut tx = Self::base(kind, amount, currency);
        tx.status = TransactionStatus::Failed;
        tx.error_detail = Some(detail.into());
        tx
    }

    /// Check if the processor accepted this payment
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}
