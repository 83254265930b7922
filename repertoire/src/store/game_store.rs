//! Persistence for ingested games and their cached analysis reports.
//!
//! Games are immutable once stored; the report field is the only thing that
//! ever changes, and only via [`GameStore::set_report`] /
//! [`GameStore::clean_report`].

use std::sync::Arc;

use tracing::debug;

use crate::error::{KvError, StoreError};
use crate::kv::{ItemKey, KeyValueStore};
use crate::model::{GameRecord, GameReport};

pub struct GameStore<K: KeyValueStore> {
    kv: Arc<K>,
}

impl<K: KeyValueStore> Clone for GameStore<K> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
        }
    }
}

impl<K: KeyValueStore> GameStore<K> {
    pub fn new(kv: Arc<K>) -> Self {
        Self { kv }
    }

    fn key(owner_id: &str, game_id: &str) -> ItemKey {
        ItemKey::new(owner_id, game_id)
    }

    pub async fn get_game(
        &self,
        owner_id: &str,
        game_id: &str,
    ) -> Result<Option<GameRecord>, StoreError> {
        let key = Self::key(owner_id, game_id);
        let Some(value) = self.kv.get_item(&key).await? else {
            return Ok(None);
        };
        let record = serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
            partition: key.partition.clone(),
            sort: key.sort.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(record))
    }

    /// Store an ingested game. Re-ingesting an existing id is a no-op:
    /// games are immutable once stored.
    pub async fn put_game(&self, record: &GameRecord) -> Result<(), StoreError> {
        let key = Self::key(&record.owner_id, &record.game_id);
        let value = serde_json::to_value(record)
            .map_err(|e| StoreError::Kv(KvError::Malformed(e.to_string())))?;
        match self.kv.put_if_absent(&key, "", value).await {
            Ok(()) => {
                debug!(owner = %record.owner_id, game = %record.game_id, plies = record.game.moves.len(), "game stored");
                Ok(())
            }
            Err(KvError::AlreadyExists) => {
                debug!(owner = %record.owner_id, game = %record.game_id, "game already ingested");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Attach the computed report. Overwrites any previous one; the analyzer
    /// only calls this when no report is present.
    pub async fn set_report(
        &self,
        owner_id: &str,
        game_id: &str,
        report: &GameReport,
    ) -> Result<(), StoreError> {
        let key = Self::key(owner_id, game_id);
        let value = serde_json::to_value(report)
            .map_err(|e| StoreError::Kv(KvError::Malformed(e.to_string())))?;
        self.kv.merge_field(&key, "", "report", value).await?;
        Ok(())
    }

    /// Drop the cached report. Does not recompute; the next analysis request
    /// does.
    pub async fn clean_report(&self, owner_id: &str, game_id: &str) -> Result<(), StoreError> {
        let key = Self::key(owner_id, game_id);
        self.kv.delete_field(&key, "", "report").await?;
        debug!(owner = %owner_id, game = %game_id, "report invalidated");
        Ok(())
    }
}
