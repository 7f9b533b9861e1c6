//! # desk-core
//!
//! Core types and traits for the charge-desk-rs virtual terminal.
//!
//! This crate provides:
//! - `Profile` and `ProfileStore` for the multi-profile credential store
//! - `Transaction` for the bounded per-profile payment log
//! - `StorePersistence` trait for stashing the store across restarts
//! - `Money` and `Currency` for amounts in smallest-unit form
//! - `DeskError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use desk_core::{Environment, Profile, ProfileStore, Transaction, Currency};
//!
//! // Seed the store with its first profile
//! let profile = Profile::new("Coffee Cart", token, app_id, location_id, Environment::Production)
//!     .with_max_amount(50_000);
//! let mut store = ProfileStore::new(profile);
//!
//! // Record a charge against the active profile
//! let active_id = store.active_id.clone();
//! store.record_transaction(&active_id, Transaction::charge(2500, Currency::USD, "pay_1", None))?;
//!
//! // Stash the whole store
//! persistence.save(&store.to_json()?).await?;
//! ```

pub mod error;
pub mod money;
pub mod persist;
pub mod profile;
pub mod store;
pub mod transaction;

// Re-exports for convenience
pub use error::{DeskError, DeskResult};
pub use money::{Currency, Money};
pub use persist::{BoxedStorePersistence, NullPersistence, StorePersistence};
pub use profile::{mask_secret, Environment, Profile, ProfileView, TRANSACTION_LOG_CAP};
pub use store::{ProfileStore, ProfileUpdate};
pub use transaction::{Transaction, TransactionKind, TransactionStatus};
