//! Persistence layer: a string key/value store with JSON helpers.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;

/// Load and decode the JSON value under `key`, or `default` if unset.
pub async fn get_json<T>(
    store: &dyn KeyValueStore,
    key: &str,
    default: T,
) -> Result<T, StoreError>
where
    T: DeserializeOwned,
{
    match store.get_value(key).await? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(default),
    }
}

/// Encode `value` as JSON and store it under `key`.
pub async fn set_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized + Sync,
{
    let raw = serde_json::to_string(value)?;
    store.set_value(key, &raw).await
}
