//! Process-wide cache of confirmed package checksums.
//!
//! Entries are keyed by (scope, file) where the scope is a host name or
//! [`LOCALHOST_SCOPE`] for files on the orchestrating machine. Only hashes
//! that matched the expected value are ever stored, and entries live for
//! the whole process.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::trace;

/// Scope used for local package files.
pub const LOCALHOST_SCOPE: &str = "localhost";

/// Synchronized checksum cache shared by every worker.
#[derive(Debug, Default)]
pub struct HashCache {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl HashCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached checksum for a file in a scope.
    #[must_use]
    pub fn get(&self, scope: &str, file: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(scope.to_string(), file.to_string()))
            .cloned()
    }

    /// Stores a checksum, replacing any previous value.
    pub fn set(&self, scope: &str, file: &str, value: &str) {
        trace!("hash cache set {scope}/{file}");
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((scope.to_string(), file.to_string()), value.to_string());
    }

    /// Returns true when the cached value equals `expected`.
    #[must_use]
    pub fn matches(&self, scope: &str, file: &str, expected: &str) -> bool {
        self.get(scope, file).is_some_and(|cached| cached == expected)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
