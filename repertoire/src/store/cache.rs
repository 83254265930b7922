//! Short-TTL read-through cache for position records.
//!
//! TTL-only: there is no invalidation on write, so a read immediately after
//! a write may serve a record up to `ttl` old. That staleness bound is part
//! of the store's contract.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::model::PositionRecord;

#[derive(Clone)]
pub(crate) struct TtlCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<(String, String), (Instant, PositionRecord)>>>,
}

impl TtlCache {
    /// `Duration::ZERO` disables caching entirely.
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) fn get(&self, owner: &str, fen: &str) -> Option<PositionRecord> {
        if self.ttl.is_zero() {
            return None;
        }
        let mut entries = self.entries.lock().ok()?;
        let key = (owner.to_string(), fen.to_string());
        match entries.get(&key) {
            Some((stored_at, record)) if stored_at.elapsed() < self.ttl => Some(record.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub(crate) fn insert(&self, owner: &str, fen: &str, record: PositionRecord) {
        if self.ttl.is_zero() {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                (owner.to_string(), fen.to_string()),
                (Instant::now(), record),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(fen: &str) -> PositionRecord {
        PositionRecord {
            owner_id: "alice".into(),
            fen: fen.into(),
            book_moves: BTreeMap::new(),
            opponent_moves: BTreeMap::new(),
            anki_score: 0,
            comment_for_player: None,
            comment_for_opponent: None,
        }
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("alice", "k", record("k"));
        assert!(cache.get("alice", "k").is_some());
        assert!(cache.get("bob", "k").is_none());
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert("alice", "k", record("k"));
        assert!(cache.get("alice", "k").is_none());
    }

    #[test]
    fn test_expiry() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.insert("alice", "k", record("k"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("alice", "k").is_none());
    }
}
