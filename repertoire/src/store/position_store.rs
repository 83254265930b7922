//! Key-value-backed persistence for position records.
//!
//! Keys are normalized before every operation, so callers may pass full FENs
//! freely. Edge writes follow a two-phase protocol: a conditional create of
//! the whole move map, falling back to a single-field merge when the map
//! already exists. At most one of two racing creates for a brand-new
//! position wins; the loser degrades to a merge that cannot clobber the
//! winner's entry, so no update is lost without any distributed lock.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{KvError, StoreError};
use crate::kv::{ItemKey, KeyValueStore, ScanCursor};
use crate::model::{CommentSlot, EdgeKind, PositionRecord};
use crate::store::TtlCache;

pub struct PositionStore<K: KeyValueStore> {
    kv: Arc<K>,
    cache: TtlCache,
}

impl<K: KeyValueStore> Clone for PositionStore<K> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
            cache: self.cache.clone(),
        }
    }
}

impl<K: KeyValueStore> PositionStore<K> {
    pub fn new(kv: Arc<K>, config: StoreConfig) -> Self {
        Self {
            kv,
            cache: TtlCache::new(config.cache_ttl),
        }
    }

    fn key(&self, owner_id: &str, fen: &str) -> Result<ItemKey, StoreError> {
        let normalized =
            board::normalize(fen).map_err(|e| StoreError::InvalidKey(e.to_string()))?;
        Ok(ItemKey::new(owner_id, normalized))
    }

    /// Read a position. Served from the TTL cache when fresh enough; a read
    /// right after a write may therefore be stale for up to the TTL window.
    pub async fn get(
        &self,
        owner_id: &str,
        fen: &str,
    ) -> Result<Option<PositionRecord>, StoreError> {
        let key = self.key(owner_id, fen)?;
        if let Some(hit) = self.cache.get(owner_id, &key.sort) {
            return Ok(Some(hit));
        }
        let Some(value) = self.kv.get_item(&key).await? else {
            return Ok(None);
        };
        let record = decode(&key, value)?;
        self.cache.insert(owner_id, &key.sort, record.clone());
        Ok(Some(record))
    }

    /// Idempotent edge insert; creates the position record lazily.
    pub async fn upsert_edge(
        &self,
        owner_id: &str,
        fen: &str,
        move_code: &str,
        kind: EdgeKind,
        target_fen: &str,
    ) -> Result<(), StoreError> {
        let key = self.key(owner_id, fen)?;
        let mut entry = serde_json::Map::new();
        entry.insert(move_code.to_string(), json!({ "target_fen": target_fen }));

        match self
            .kv
            .put_if_absent(&key, kind.path(), Value::Object(entry))
            .await
        {
            Ok(()) => {
                debug!(owner = %key.partition, fen = %key.sort, move_code, path = kind.path(), "created move map");
            }
            Err(KvError::AlreadyExists) => {
                // Lost the conditional create (possibly to a concurrent
                // writer); merge just our field into the existing map.
                self.kv
                    .merge_field(&key, kind.path(), move_code, json!({ "target_fen": target_fen }))
                    .await?;
                debug!(owner = %key.partition, fen = %key.sort, move_code, path = kind.path(), "merged edge");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Remove a single edge. The position record stays even when both move
    /// maps end up empty.
    pub async fn delete_edge(
        &self,
        owner_id: &str,
        fen: &str,
        move_code: &str,
        kind: EdgeKind,
    ) -> Result<(), StoreError> {
        let key = self.key(owner_id, fen)?;
        self.kv.delete_field(&key, kind.path(), move_code).await?;
        debug!(owner = %key.partition, fen = %key.sort, move_code, path = kind.path(), "deleted edge");
        Ok(())
    }

    pub async fn set_comment(
        &self,
        owner_id: &str,
        fen: &str,
        slot: CommentSlot,
        text: &str,
    ) -> Result<(), StoreError> {
        let key = self.key(owner_id, fen)?;
        self.kv
            .merge_field(&key, "", slot.field(), json!(text))
            .await?;
        Ok(())
    }

    pub async fn set_anki_score(
        &self,
        owner_id: &str,
        fen: &str,
        score: i64,
    ) -> Result<(), StoreError> {
        let key = self.key(owner_id, fen)?;
        self.kv
            .merge_field(&key, "", "anki_score", json!(score))
            .await?;
        Ok(())
    }

    /// Lazy full scan of an owner's positions.
    pub fn scan_all(&self, owner_id: &str) -> PositionScan<K> {
        self.scan_from(owner_id, None)
    }

    /// Resume a scan from a cursor captured via [`PositionScan::cursor`].
    pub fn scan_from(&self, owner_id: &str, cursor: Option<ScanCursor>) -> PositionScan<K> {
        PositionScan {
            kv: Arc::clone(&self.kv),
            owner: owner_id.to_string(),
            cursor,
            done: false,
        }
    }
}

fn decode(key: &ItemKey, value: Value) -> Result<PositionRecord, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        partition: key.partition.clone(),
        sort: key.sort.clone(),
        reason,
    };
    let record: PositionRecord =
        serde_json::from_value(value).map_err(|e| corrupt(e.to_string()))?;
    record.validate().map_err(corrupt)?;
    Ok(record)
}

/// Cursor-paginated scan over one owner's positions. Unordered, finite, and
/// restartable: callers control cancellation by not requesting another page.
pub struct PositionScan<K: KeyValueStore> {
    kv: Arc<K>,
    owner: String,
    cursor: Option<ScanCursor>,
    done: bool,
}

impl<K: KeyValueStore> PositionScan<K> {
    /// Cursor to resume from after the most recently returned page.
    pub fn cursor(&self) -> Option<&ScanCursor> {
        self.cursor.as_ref()
    }

    /// Next page of records, or `None` once the scan has terminated.
    /// Records that fail validation are logged and skipped; one bad record
    /// must not kill a whole batch run.
    pub async fn next_page(&mut self) -> Result<Option<Vec<PositionRecord>>, StoreError> {
        if self.done {
            return Ok(None);
        }
        let page = self.kv.scan_page(&self.owner, self.cursor.take()).await?;
        self.cursor = page.next;
        if self.cursor.is_none() {
            self.done = true;
        }

        let mut records = Vec::with_capacity(page.items.len());
        for item in page.items {
            let decoded = serde_json::from_value::<PositionRecord>(item)
                .map_err(|e| e.to_string())
                .and_then(|r| r.validate().map(|()| r));
            match decoded {
                Ok(record) => records.push(record),
                Err(reason) => {
                    warn!(owner = %self.owner, %reason, "skipping unreadable position record");
                }
            }
        }
        Ok(Some(records))
    }

    /// Drain the remaining pages into one vector.
    pub async fn collect_all(mut self) -> Result<Vec<PositionRecord>, StoreError> {
        let mut all = Vec::new();
        while let Some(mut page) = self.next_page().await? {
            all.append(&mut page);
        }
        Ok(all)
    }
}
