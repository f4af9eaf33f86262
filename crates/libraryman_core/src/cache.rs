//! Member lookup cache.
//!
//! # Responsibility
//! - Hold `MemberView` snapshots keyed by member id for repeated reads.
//!
//! # Invariants
//! - Entries are inserted on read and removed on write; never mutated in
//!   place.
//! - A fill is refused when its id was evicted (or the cache cleared) after
//!   the fill's ticket was taken, so a read that started before a write can
//!   never publish the pre-write row once the write's eviction has run.
//! - Cached values carry no credential material (`MemberView` has none).
//! - A poisoned lock is recovered, never propagated as a panic.

use crate::model::member::{MemberId, MemberView};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Eviction generation observed before a store read.
///
/// Obtained from `MemberLookupCache::begin_fill` and handed back to `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket {
    generation: u64,
}

/// Cache contract used by the member service.
///
/// Shared as `Arc<dyn MemberLookupCache>` so a host can clear it on demand
/// and tests can substitute their own implementation.
pub trait MemberLookupCache: Send + Sync {
    fn get(&self, member_id: MemberId) -> Option<MemberView>;
    /// Takes a ticket before reading `member_id` from the store.
    fn begin_fill(&self, member_id: MemberId) -> FillTicket;
    /// Stores `view` unless its id was evicted after `ticket` was taken.
    ///
    /// Returns whether the snapshot was stored.
    fn put(&self, view: MemberView, ticket: FillTicket) -> bool;
    fn evict(&self, member_id: MemberId);
    fn clear(&self);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<MemberId, MemberView>,
    generation: u64,
    evicted_at: HashMap<MemberId, u64>,
    cleared_at: u64,
}

impl CacheState {
    fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn is_stale(&self, member_id: MemberId, ticket: FillTicket) -> bool {
        if self.cleared_at > ticket.generation {
            return true;
        }
        self.evicted_at
            .get(&member_id)
            .is_some_and(|evicted| *evicted > ticket.generation)
    }
}

/// Process-local cache over a `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct InMemoryMemberCache {
    state: RwLock<CacheState>,
}

impl InMemoryMemberCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemberLookupCache for InMemoryMemberCache {
    fn get(&self, member_id: MemberId) -> Option<MemberView> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.entries.get(&member_id).cloned()
    }

    fn begin_fill(&self, _member_id: MemberId) -> FillTicket {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        FillTicket {
            generation: state.generation,
        }
    }

    fn put(&self, view: MemberView, ticket: FillTicket) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.is_stale(view.member_id, ticket) {
            return false;
        }
        state.entries.insert(view.member_id, view);
        true
    }

    fn evict(&self, member_id: MemberId) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let generation = state.bump();
        state.evicted_at.insert(member_id, generation);
        state.entries.remove(&member_id);
    }

    fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let generation = state.bump();
        state.cleared_at = generation;
        // Older eviction marks are covered by `cleared_at`.
        state.evicted_at.clear();
        state.entries.clear();
    }

    fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryMemberCache, MemberLookupCache};
    use crate::model::member::{MemberView, Role};
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::thread;

    fn view(member_id: i64, name: &str) -> MemberView {
        MemberView {
            member_id,
            role: Role::User,
            name: name.to_string(),
            username: format!("user{member_id}"),
            email: format!("user{member_id}@library.org"),
            membership_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
        }
    }

    fn fill(cache: &InMemoryMemberCache, view: MemberView) -> bool {
        let ticket = cache.begin_fill(view.member_id);
        cache.put(view, ticket)
    }

    #[test]
    fn put_get_evict_clear() {
        let cache = InMemoryMemberCache::new();
        assert!(cache.is_empty());

        assert!(fill(&cache, view(1, "one")));
        assert!(fill(&cache, view(2, "two")));
        assert_eq!(cache.get(1).map(|v| v.name), Some("one".to_string()));
        assert_eq!(cache.len(), 2);

        cache.evict(1);
        assert!(cache.get(1).is_none());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn put_replaces_existing_snapshot() {
        let cache = InMemoryMemberCache::new();
        fill(&cache, view(1, "before"));
        fill(&cache, view(1, "after"));
        assert_eq!(cache.get(1).map(|v| v.name), Some("after".to_string()));
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(InMemoryMemberCache::new());
        let handles: Vec<_> = (0..8)
            .map(|id| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    fill(&cache, view(id, "thread"));
                    cache.get(id).is_some()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().expect("thread should not panic"));
        }
        assert_eq!(cache.len(), 8);
    }

    #[test]
    fn put_is_refused_when_id_was_evicted_after_ticket() {
        let cache = InMemoryMemberCache::new();
        let ticket = cache.begin_fill(1);

        cache.evict(1);
        assert!(!cache.put(view(1, "stale"), ticket));
        assert!(cache.get(1).is_none());

        assert!(fill(&cache, view(1, "fresh")));
        assert_eq!(cache.get(1).map(|v| v.name), Some("fresh".to_string()));
    }

    #[test]
    fn eviction_of_other_id_does_not_refuse_fill() {
        let cache = InMemoryMemberCache::new();
        let ticket = cache.begin_fill(1);

        cache.evict(2);
        assert!(cache.put(view(1, "kept"), ticket));
    }

    #[test]
    fn put_is_refused_when_cache_was_cleared_after_ticket() {
        let cache = InMemoryMemberCache::new();
        let ticket = cache.begin_fill(3);

        cache.clear();
        assert!(!cache.put(view(3, "stale"), ticket));
        assert!(cache.is_empty());
    }
}
