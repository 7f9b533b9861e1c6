//! # Store Persistence Trait
//!
//! The profile store survives restarts by being serialized whole and
//! stashed somewhere a fresh process can read it back. Where exactly is a
//! deployment concern, so it sits behind a trait.
//!
//! Implementations: process environment variable, hosting provider
//! environment-variable API.
//!
//! This is best-effort persistence. There is no transaction log, no
//! durability guarantee, and no conflict resolution for concurrent
//! writers; the last save wins.

use crate::error::DeskResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Backend that stashes and restores the serialized profile store
#[async_trait]
pub trait StorePersistence: Send + Sync {
    /// Stash the serialized store.
    ///
    /// # Arguments
    /// * `payload` - The whole store as a JSON string
    async fn save(&self, payload: &str) -> DeskResult<()>;

    /// Read back the last stashed payload, if any
    async fn load(&self) -> DeskResult<Option<String>>;

    /// Get the backend name (for logging)
    fn backend_name(&self) -> &'static str;
}

/// Type alias for a boxed persistence backend (dynamic dispatch)
pub type BoxedStorePersistence = Arc<dyn StorePersistence>;

/// Backend that persists nothing. Used in tests and when no store
/// environment variable is configured.
pub struct NullPersistence;

#[async_trait]
impl StorePersistence for NullPersistence {
    async fn save(&self, _payload: &str) -> DeskResult<()> {
        Ok(())
    }

    async fn load(&self) -> DeskResult<Option<String>> {
        Ok(None)
    }

    fn backend_name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_persistence() {
        let backend = NullPersistence;

        backend.save("{}").await.unwrap();
        assert_eq!(backend.load().await.unwrap(), None);
        assert_eq!(backend.backend_name(), "null");
    }
}
