//! Bounded, time-limited price cache.
//!
//! Owned by whoever composes the pricing service; there is no global
//! instance. Every call takes `now` so expiry is deterministic under test.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tmk_ledger::Micros;

/// A cache hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedPrice {
    pub price: Micros,
    /// Price before the most recent change, if one was ever seen.
    pub previous: Option<Micros>,
}

#[derive(Debug, Clone)]
struct Entry {
    price: Micros,
    stored_at: Instant,
    /// Insertion sequence; smallest is evicted first.
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct PriceCache {
    ttl: Duration,
    capacity: usize,
    entries: HashMap<String, Entry>,
    previous: HashMap<String, Micros>,
    next_seq: u64,
}

impl PriceCache {
    /// `capacity` is clamped to at least 1.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: HashMap::new(),
            previous: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Price for `asset_id` if stored less than `ttl` before `now`.
    pub fn get(&self, asset_id: &str, now: Instant) -> Option<CachedPrice> {
        let e = self.entries.get(asset_id)?;
        if now.saturating_duration_since(e.stored_at) >= self.ttl {
            return None;
        }
        Some(CachedPrice {
            price: e.price,
            previous: self.previous.get(asset_id).copied(),
        })
    }

    /// Store a fresh price. Returns the price it replaced, if any.
    ///
    /// At capacity, a new asset evicts the entry inserted longest ago.
    pub fn insert(&mut self, asset_id: &str, price: Micros, now: Instant) -> Option<Micros> {
        let seq = self.next_seq;
        self.next_seq += 1;

        if !self.entries.contains_key(asset_id) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }

        let old = self
            .entries
            .insert(
                asset_id.to_string(),
                Entry {
                    price,
                    stored_at: now,
                    seq,
                },
            )
            .map(|e| e.price);

        if let Some(prev) = old.filter(|p| *p != price) {
            self.previous.insert(asset_id.to_string(), prev);
        }
        old
    }

    /// Last price seen before the current one.
    pub fn previous(&self, asset_id: &str) -> Option<Micros> {
        self.previous.get(asset_id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.seq)
            .map(|(k, _)| k.clone());
        if let Some(k) = oldest {
            self.entries.remove(&k);
            self.previous.remove(&k);
        }
    }
}
