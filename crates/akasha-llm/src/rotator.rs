//! Rotating API key pool.

use akasha_core::error::AkashaError;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

/// Circular API key manager shared by the provider adapters.
///
/// Cycles through multiple keys to distribute load and ride out quota
/// errors. HTTP clients are cached per key. Locks guard plain map and
/// cursor access and are never held across awaits; a lost rotation
/// under contention is harmless.
#[derive(Debug)]
pub struct KeyRotator {
    keys: Vec<String>,
    cursor: Mutex<usize>,
    clients: Mutex<HashMap<String, reqwest::Client>>,
}

impl KeyRotator {
    /// Build a rotator. Blank entries are dropped; an empty pool is a
    /// configuration error.
    pub fn new(keys: Vec<String>) -> Result<Self, AkashaError> {
        let keys: Vec<String> = keys
            .into_iter()
            .filter(|k| !k.trim().is_empty())
            .collect();
        if keys.is_empty() {
            return Err(AkashaError::Config("no API keys configured".to_string()));
        }
        info!("key rotator initialized with {} key(s)", keys.len());
        Ok(Self {
            keys,
            cursor: Mutex::new(0),
            clients: Mutex::new(HashMap::new()),
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key the next request should use.
    pub fn current(&self) -> String {
        let cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        self.keys[*cursor % self.keys.len()].clone()
    }

    /// Advance to the next key (circular) and return it.
    pub fn rotate(&self) -> String {
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let old = *cursor;
        *cursor = (*cursor + 1) % self.keys.len();
        debug!("rotated API key from index {old} to {}", *cursor);
        self.keys[*cursor].clone()
    }

    /// HTTP client for a key, created on first use and cached.
    pub fn client_for(&self, key: &str) -> reqwest::Client {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients
            .entry(key.to_string())
            .or_insert_with(reqwest::Client::new)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_is_config_error() {
        let err = KeyRotator::new(vec![]).unwrap_err();
        assert!(matches!(err, AkashaError::Config(_)));

        let err = KeyRotator::new(vec!["".into(), "  ".into()]).unwrap_err();
        assert!(matches!(err, AkashaError::Config(_)));
    }

    #[test]
    fn test_rotation_is_circular() {
        let r = KeyRotator::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        assert_eq!(r.current(), "a");
        assert_eq!(r.rotate(), "b");
        assert_eq!(r.rotate(), "c");
        // Wraps back to the first key.
        assert_eq!(r.rotate(), "a");
        assert_eq!(r.current(), "a");
    }

    #[test]
    fn test_blank_keys_are_dropped() {
        let r = KeyRotator::new(vec!["a".into(), "".into(), "b".into()]).unwrap();
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_client_is_cached_per_key() {
        let r = KeyRotator::new(vec!["a".into()]).unwrap();
        // Both calls must hand back the same underlying client.
        let _c1 = r.client_for("a");
        let _c2 = r.client_for("a");
        let clients = r.clients.lock().unwrap();
        assert_eq!(clients.len(), 1);
    }
}
