//! Session store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SessionError;

/// Storage for JSON records that live as long as the client session.
pub trait SessionStore: Send + Sync {
  fn get(&self, key: &str) -> Option<serde_json::Value>;

  fn set(&self, key: &str, value: serde_json::Value);
}

/// Typed access on top of any `SessionStore`.
pub trait SessionStoreExt: SessionStore {
  /// Read and deserialize a record. A missing record is `Ok(None)`.
  fn get_object<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
    self
      .get(key)
      .map(|value| {
        serde_json::from_value(value).map_err(|source| SessionError::Serialization {
          key: key.to_string(),
          source,
        })
      })
      .transpose()
  }

  fn set_object<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SessionError> {
    let value = serde_json::to_value(value).map_err(|source| SessionError::Serialization {
      key: key.to_string(),
      source,
    })?;
    self.set(key, value);
    Ok(())
  }
}

impl<S: SessionStore + ?Sized> SessionStoreExt for S {}

/// A session store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
  records: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemorySessionStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl SessionStore for MemorySessionStore {
  fn get(&self, key: &str) -> Option<serde_json::Value> {
    let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
    records.get(key).cloned()
  }

  fn set(&self, key: &str, value: serde_json::Value) {
    let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
    records.insert(key.to_string(), value);
  }
}
