//! Names waiting for a fresh update to propagate.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default propagation window.
pub const DEFAULT_PROPAGATION_WINDOW: Duration = Duration::from_secs(180);

/// Default interval of the background sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Set of recently updated names, keyed by name.
///
/// An entry is live while `now - inserted < window`. Expired entries are
/// ignored by [`PendingSet::is_pending`] even before a sweep removes them.
#[derive(Debug, Clone)]
pub struct PendingSet {
    window: Duration,
    entries: HashMap<String, Instant>,
}

impl PendingSet {
    /// Create an empty set with the given propagation window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    /// The propagation window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Insert or refresh the entry for `name`.
    pub fn mark_pending(&mut self, name: &str, now: Instant) {
        self.entries.insert(name.to_string(), now);
    }

    /// Whether `name` has an unexpired entry.
    pub fn is_pending(&self, name: &str, now: Instant) -> bool {
        self.entries
            .get(name)
            .is_some_and(|inserted| !self.expired(*inserted, now))
    }

    /// Remove and return every expired entry.
    pub fn sweep(&mut self, now: Instant) -> Vec<String> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, inserted)| self.expired(**inserted, now))
            .map(|(name, _)| name.clone())
            .collect();

        for name in &expired {
            self.entries.remove(name);
        }

        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn expired(&self, inserted: Instant, now: Instant) -> bool {
        now.saturating_duration_since(inserted) >= self.window
    }
}

impl Default for PendingSet {
    fn default() -> Self {
        Self::new(DEFAULT_PROPAGATION_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(180);

    #[test]
    fn test_pending_until_window_elapses() {
        let start = Instant::now();
        let mut pending = PendingSet::new(WINDOW);
        pending.mark_pending("home.example.com", start);

        assert!(pending.is_pending("home.example.com", start));
        assert!(pending.is_pending("home.example.com", start + Duration::from_secs(179)));
        assert!(!pending.is_pending("home.example.com", start + WINDOW));
        assert!(!pending.is_pending("vpn.example.com", start));
    }

    #[test]
    fn test_mark_pending_overwrites() {
        let start = Instant::now();
        let mut pending = PendingSet::new(WINDOW);
        pending.mark_pending("home.example.com", start);
        pending.mark_pending("home.example.com", start + Duration::from_secs(100));

        assert_eq!(pending.len(), 1);
        assert!(pending.is_pending("home.example.com", start + Duration::from_secs(200)));
    }

    #[test]
    fn test_sweep_evicts_only_expired() {
        let start = Instant::now();
        let mut pending = PendingSet::new(WINDOW);
        pending.mark_pending("old.example.com", start);
        pending.mark_pending("new.example.com", start + Duration::from_secs(60));

        let evicted = pending.sweep(start + WINDOW);
        assert_eq!(evicted, vec!["old.example.com".to_string()]);
        assert_eq!(pending.len(), 1);
        assert!(pending.is_pending("new.example.com", start + WINDOW));
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let start = Instant::now();
        let mut pending = PendingSet::new(WINDOW);
        pending.mark_pending("a.example.com", start);
        pending.mark_pending("b.example.com", start);

        let later = start + Duration::from_secs(300);
        let mut evicted = pending.sweep(later);
        evicted.sort();
        assert_eq!(evicted, vec!["a.example.com", "b.example.com"]);

        assert!(pending.sweep(later).is_empty());
        assert!(pending.is_empty());
    }

    #[test]
    fn test_evicted_entry_needs_new_mark() {
        let start = Instant::now();
        let mut pending = PendingSet::new(WINDOW);
        pending.mark_pending("home.example.com", start);
        pending.sweep(start + WINDOW);

        assert!(!pending.is_pending("home.example.com", start + WINDOW));

        let again = start + WINDOW + Duration::from_secs(1);
        pending.mark_pending("home.example.com", again);
        assert!(pending.is_pending("home.example.com", again));
    }

    #[test]
    fn test_default_window() {
        assert_eq!(PendingSet::default().window(), Duration::from_secs(180));
    }
}
