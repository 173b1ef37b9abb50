//! Key/value store trait the runner persists its workload through.

use async_trait::async_trait;

use crate::error::StoreError;

/// Durable string key/value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if any.
    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set_value(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
