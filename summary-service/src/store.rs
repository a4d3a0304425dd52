//! Persistence boundary for drafts, extracted records, and training state.
//!
//! The service only ever needs string key-value semantics, so the trait is
//! deliberately small. JSON helpers are tolerant on read: a missing or
//! corrupt value falls back to the type's default rather than failing the
//! pipeline that is about to overwrite it anyway.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Stored note draft, written on every processing run.
pub const NOTE_DRAFT_KEY: &str = "noteDraft";
/// Most recently extracted record.
pub const LAST_RECORD_KEY: &str = "lastRecord";
/// Accumulated training state.
pub const TRAINING_STATE_KEY: &str = "trainingData";
/// External provider credentials.
pub const API_CREDENTIALS_KEY: &str = "apiCredentials";

/// String key-value storage used by the summary service.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-memory store, the default backend and the test double.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.values.lock() {
            Ok(values) => values.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    fn set(&self, key: &str, value: String) {
        match self.values.lock() {
            Ok(mut values) => {
                values.insert(key.to_string(), value);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(key.to_string(), value);
            }
        }
    }

    fn remove(&self, key: &str) {
        match self.values.lock() {
            Ok(mut values) => {
                values.remove(key);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(key);
            }
        }
    }
}

/// Read a JSON value, falling back to `T::default()` when the key is
/// missing or the stored text no longer parses.
pub fn load_json<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match store.get(key) {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(error) => {
                warn!(key, %error, "stored value failed to parse, using default");
                T::default()
            }
        },
        None => T::default(),
    }
}

/// Write a JSON value. Last write wins; serialization failure is logged,
/// not propagated, because persistence is advisory for this service.
pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, raw),
        Err(error) => warn!(key, %error, "failed to serialize value for storage"),
    }
}
