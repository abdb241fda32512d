//! Bounded per-leader set of trade ids already seen.

use std::collections::{HashSet, VecDeque};

use crate::domain::{TradeEvent, TradeId};

/// Insertion-ordered id set; the oldest-added ids are evicted first.
#[derive(Debug)]
pub struct TradeIdCache {
    capacity: usize,
    ids: HashSet<TradeId>,
    order: VecDeque<TradeId>,
    seeded: bool,
}

impl TradeIdCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ids: HashSet::new(),
            order: VecDeque::new(),
            seeded: false,
        }
    }

    /// Whether the first fetch has been recorded.
    #[must_use]
    pub const fn is_seeded(&self) -> bool {
        self.seeded
    }

    #[must_use]
    pub fn contains(&self, id: &TradeId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Add `id`, evicting the oldest entries past capacity.
    ///
    /// Returns `false` if it was already present.
    pub fn insert(&mut self, id: TradeId) -> bool {
        if !self.ids.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        true
    }

    /// Diff a fetched window, given newest-first, against the cache.
    ///
    /// On the first call every id is recorded and nothing is returned.
    /// Afterwards the unseen events are recorded and returned oldest-first.
    pub fn absorb(&mut self, newest_first: Vec<TradeEvent>) -> Vec<TradeEvent> {
        let oldest_first = newest_first.into_iter().rev();

        if !self.seeded {
            for event in oldest_first {
                self.insert(event.id);
            }
            self.seeded = true;
            return Vec::new();
        }

        oldest_first
            .filter(|event| self.insert(event.id.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use rust_decimal::Decimal;

    fn event(id: &str) -> TradeEvent {
        TradeEvent {
            id: TradeId::from(id),
            market: "m".into(),
            side: Side::Buy,
            price: Decimal::ONE,
            size: Decimal::ONE,
            timestamp_secs: 0,
            source_wallet: None,
            outcome_index: None,
            outcome_label: None,
        }
    }

    fn ids(events: &[TradeEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn first_window_is_a_silent_baseline() {
        let mut cache = TradeIdCache::new(10);

        let emitted = cache.absorb(vec![event("t3"), event("t2"), event("t1")]);

        assert!(emitted.is_empty());
        assert!(cache.is_seeded());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn empty_first_window_still_seeds() {
        let mut cache = TradeIdCache::new(10);
        assert!(cache.absorb(Vec::new()).is_empty());
        assert!(cache.is_seeded());

        let emitted = cache.absorb(vec![event("t1")]);
        assert_eq!(ids(&emitted), ["t1"]);
    }

    #[test]
    fn later_windows_emit_only_unseen_ids_oldest_first() {
        let mut cache = TradeIdCache::new(10);
        cache.absorb(vec![event("t2"), event("t1")]);

        let emitted = cache.absorb(vec![event("t4"), event("t3"), event("t2"), event("t1")]);

        assert_eq!(ids(&emitted), ["t3", "t4"]);
        assert_eq!(cache.len(), 4);
        assert!(cache.absorb(vec![event("t4")]).is_empty());
    }

    #[test]
    fn repeated_id_in_one_window_is_emitted_once() {
        let mut cache = TradeIdCache::new(10);
        cache.absorb(Vec::new());

        let emitted = cache.absorb(vec![event("t1"), event("t1")]);
        assert_eq!(ids(&emitted), ["t1"]);
    }

    #[test]
    fn eviction_drops_oldest_added() {
        let mut cache = TradeIdCache::new(3);
        cache.absorb(vec![event("t3"), event("t2"), event("t1")]);

        let emitted = cache.absorb(vec![event("t5"), event("t4")]);

        assert_eq!(ids(&emitted), ["t4", "t5"]);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&TradeId::from("t1")));
        assert!(!cache.contains(&TradeId::from("t2")));
        assert!(cache.contains(&TradeId::from("t3")));
        assert!(cache.contains(&TradeId::from("t5")));
    }
}
