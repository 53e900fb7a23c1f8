//! The capacity store: who holds a slot, and until when.
//!
//! # Concurrency note
//!
//! `CapacityStore` is NOT thread-safe by itself; it is a plain `HashMap`.
//! The [`Coordinator`](crate::Coordinator) owns it behind the same lock as
//! the wait queue, which is what makes "check capacity, then admit" a
//! single atomic step. Nothing else gets a mutable reference.
//!
//! # Time
//!
//! Deadlines use Tokio's clock (`tokio::time::Instant`), so tests can
//! fast-forward through a session TTL with `tokio::time::advance`.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use waitroom_protocol::SessionId;

/// The set of admitted visitors, each with an expiry deadline.
///
/// ## Lifecycle of an entry
///
/// ```text
/// try_admit() ──→ [active, expires_at = now + ttl]
///                    │        ↑
///                    │   refresh()
///                    ▼
///             deadline passes ──→ is_lapsed() == true ──→ evict()
/// ```
///
/// A lapsed entry stays a member until something evicts it. Admission
/// decisions only look at membership; the sweep is what turns a lapse into
/// a free slot.
#[derive(Debug)]
pub struct CapacityStore {
    /// Active visitors and their deadlines.
    entries: HashMap<SessionId, Instant>,
    capacity: usize,
    ttl: Duration,
}

impl CapacityStore {
    /// Creates an empty store admitting at most `capacity` visitors, each
    /// for `ttl` after their last admit or refresh.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
            ttl,
        }
    }

    /// Admits `id` if a slot is free.
    ///
    /// On success the entry is inserted (or overwritten) with a fresh
    /// deadline. When the store is full this returns `false` and changes
    /// nothing, even if `id` is already a member.
    pub fn try_admit(&mut self, id: &SessionId) -> bool {
        if self.entries.len() >= self.capacity {
            return false;
        }
        self.entries.insert(id.clone(), self.deadline());
        tracing::debug!(session_id = %id, active = self.entries.len(), "slot granted");
        true
    }

    /// Extends an active visitor's deadline.
    ///
    /// Returns `false` for non-members. Refreshing never creates an entry:
    /// it is not an implicit join.
    pub fn refresh(&mut self, id: &SessionId) -> bool {
        let deadline = self.deadline();
        match self.entries.get_mut(id) {
            Some(expires_at) => {
                *expires_at = deadline;
                true
            }
            None => false,
        }
    }

    /// Whether `id` holds a slot.
    pub fn is_active(&self, id: &SessionId) -> bool {
        self.entries.contains_key(id)
    }

    /// Removes `id` unconditionally. Returns whether it was present.
    pub fn evict(&mut self, id: &SessionId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Whether the deadline of `id` has passed.
    ///
    /// Returns `None` if `id` is not a member.
    pub fn is_lapsed(&self, id: &SessionId) -> Option<bool> {
        self.entries
            .get(id)
            .map(|expires_at| Instant::now() >= *expires_at)
    }

    /// Members whose deadline has passed, earliest deadline first.
    pub fn lapsed_members(&self) -> Vec<SessionId> {
        let now = Instant::now();
        let mut lapsed: Vec<(&SessionId, &Instant)> = self
            .entries
            .iter()
            .filter(|(_, expires_at)| now >= **expires_at)
            .collect();
        lapsed.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
        lapsed.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Time left before `id` lapses; zero if it already has.
    ///
    /// Returns `None` if `id` is not a member.
    pub fn expires_in(&self, id: &SessionId) -> Option<Duration> {
        self.entries
            .get(id)
            .map(|expires_at| expires_at.saturating_duration_since(Instant::now()))
    }

    /// Number of active visitors.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Active visitors, sorted by identity for stable output.
    pub fn members(&self) -> Vec<SessionId> {
        let mut members: Vec<SessionId> = self.entries.keys().cloned().collect();
        members.sort();
        members
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.ttl
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `CapacityStore`.
    //!
    //! TTL behaviour runs on paused Tokio time: `advance` moves the clock
    //! that `Instant::now()` reads, so a three-minute session lapses
    //! instantly and deterministically.

    use super::*;

    const TTL: Duration = Duration::from_secs(180);

    fn sid(raw: &str) -> SessionId {
        SessionId::new(raw).unwrap()
    }

    // =====================================================================
    // try_admit()
    // =====================================================================

    #[test]
    fn test_try_admit_with_free_slot_admits() {
        let mut store = CapacityStore::new(2, TTL);

        assert!(store.try_admit(&sid("a")));
        assert!(store.is_active(&sid("a")));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_try_admit_when_full_returns_false_without_mutation() {
        let mut store = CapacityStore::new(1, TTL);
        store.try_admit(&sid("a"));

        assert!(!store.try_admit(&sid("b")));
        assert!(!store.is_active(&sid("b")));
        assert_eq!(store.members(), vec![sid("a")]);
    }

    #[test]
    fn test_try_admit_never_exceeds_capacity() {
        let mut store = CapacityStore::new(3, TTL);
        let admitted = (0..10)
            .filter(|i| store.try_admit(&sid(&format!("user_{i}"))))
            .count();

        assert_eq!(admitted, 3);
        assert_eq!(store.count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_admit_sets_deadline_one_ttl_ahead() {
        let mut store = CapacityStore::new(1, TTL);
        store.try_admit(&sid("a"));

        assert_eq!(store.expires_in(&sid("a")), Some(TTL));
    }

    // =====================================================================
    // refresh()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_refresh_active_extends_deadline() {
        let mut store = CapacityStore::new(1, TTL);
        store.try_admit(&sid("a"));
        tokio::time::advance(Duration::from_secs(100)).await;

        assert!(store.refresh(&sid("a")));
        assert_eq!(store.expires_in(&sid("a")), Some(TTL));
    }

    #[test]
    fn test_refresh_non_member_returns_false_and_creates_nothing() {
        let mut store = CapacityStore::new(1, TTL);

        assert!(!store.refresh(&sid("ghost")));
        assert_eq!(store.count(), 0);
    }

    // =====================================================================
    // is_lapsed() / lapsed_members()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_is_lapsed_after_ttl_returns_true() {
        let mut store = CapacityStore::new(1, TTL);
        store.try_admit(&sid("a"));
        assert_eq!(store.is_lapsed(&sid("a")), Some(false));

        tokio::time::advance(TTL).await;

        assert_eq!(store.is_lapsed(&sid("a")), Some(true));
        // Lapsing alone does not free the slot.
        assert!(store.is_active(&sid("a")));
    }

    #[test]
    fn test_is_lapsed_unknown_returns_none() {
        let store = CapacityStore::new(1, TTL);
        assert_eq!(store.is_lapsed(&sid("ghost")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lapsed_members_orders_by_deadline() {
        let mut store = CapacityStore::new(3, TTL);
        store.try_admit(&sid("first"));
        tokio::time::advance(Duration::from_secs(10)).await;
        store.try_admit(&sid("second"));
        tokio::time::advance(Duration::from_secs(10)).await;
        store.try_admit(&sid("fresh"));

        tokio::time::advance(TTL - Duration::from_secs(5)).await;

        assert_eq!(store.lapsed_members(), vec![sid("first"), sid("second")]);
    }

    // =====================================================================
    // evict() / clear()
    // =====================================================================

    #[test]
    fn test_evict_frees_slot() {
        let mut store = CapacityStore::new(1, TTL);
        store.try_admit(&sid("a"));

        assert!(store.evict(&sid("a")));
        assert!(!store.evict(&sid("a")), "second evict finds nothing");
        assert!(store.try_admit(&sid("b")));
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut store = CapacityStore::new(2, TTL);
        store.try_admit(&sid("a"));
        store.try_admit(&sid("b"));

        store.clear();

        assert_eq!(store.count(), 0);
        assert!(store.members().is_empty());
    }
}
