//! In-memory record of event identifiers that have already been accepted.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe set of previously seen event identifiers.
///
/// The registry only grows: there is no eviction and no TTL, and its contents
/// are lost when the process exits. Membership test and insertion happen
/// under one lock acquisition, so for any number of concurrent callers
/// presenting the same identifier exactly one observes first arrival.
///
/// # Examples
///
/// ```rust
/// use webhook_receiver_core::webhook::ProcessedEventRegistry;
///
/// let registry = ProcessedEventRegistry::new();
/// assert!(registry.try_insert("evt_1"));
/// assert!(!registry.try_insert("evt_1"));
/// ```
#[derive(Debug, Default)]
pub struct ProcessedEventRegistry {
    ids: Mutex<HashSet<String>>,
}

impl ProcessedEventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically record `event_id` as processed.
    ///
    /// Returns `true` when the identifier was not present before this call,
    /// `false` when it had already been recorded.
    pub fn try_insert(&self, event_id: &str) -> bool {
        self.lock().insert(event_id.to_string())
    }

    /// Check whether `event_id` has been recorded.
    pub fn contains(&self, event_id: &str) -> bool {
        self.lock().contains(event_id)
    }

    /// Number of recorded identifiers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no identifier has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a HashSet half-updated, so
    // a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
