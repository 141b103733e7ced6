//! RoomDirectory (C3): storage-first read-through cache of room summaries (spec §4.3).
//!
//! Mirrors the room actor's storage-first discipline: every mutation persists before the
//! caller is allowed to broadcast, so a cold replacement instance can always recover the
//! directory from storage alone.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::messages::RoomDirectoryEntryView;
use crate::protocol::types::{PlayerId, RoomCode, RoomDirectoryStatus};
use crate::room::RoomStatusUpdate;
use crate::storage::{namespace, Storage};

/// A directory record for one room, kept up to date by `room.status` upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDirectoryEntry {
    pub code: RoomCode,
    pub status: RoomDirectoryStatus,
    pub player_count: u8,
    pub spectator_count: usize,
    pub host_id: PlayerId,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomDirectoryEntry {
    pub fn to_view(&self) -> RoomDirectoryEntryView {
        RoomDirectoryEntryView {
            code: self.code.clone(),
            status: format!("{:?}", self.status).to_lowercase(),
            player_count: self.player_count,
            spectator_count: self.spectator_count,
            host_id: self.host_id,
            is_public: self.is_public,
            updated_at: self.updated_at,
        }
    }
}

/// Lazily-loaded, storage-backed cache of [`RoomDirectoryEntry`], keyed by room code.
pub struct RoomDirectory {
    storage: Arc<dyn Storage>,
    cache: Option<HashMap<String, RoomDirectoryEntry>>,
}

impl RoomDirectory {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            cache: None,
        }
    }

    async fn ensure_loaded(&mut self) {
        if self.cache.is_some() {
            return;
        }
        let mut loaded = HashMap::new();
        if let Ok(keys) = self.storage.list_keys(namespace::DIRECTORY).await {
            for key in keys {
                if let Ok(Some(value)) = self.storage.get(namespace::DIRECTORY, &key).await {
                    if let Ok(entry) = serde_json::from_value::<RoomDirectoryEntry>(value) {
                        loaded.insert(key, entry);
                    }
                }
            }
        }
        self.cache = Some(loaded);
    }

    pub async fn get_all(&mut self) -> Vec<RoomDirectoryEntry> {
        self.ensure_loaded().await;
        self.cache.as_ref().expect("just loaded").values().cloned().collect()
    }

    pub async fn get_public(&mut self) -> Vec<RoomDirectoryEntry> {
        self.get_all().await.into_iter().filter(|e| e.is_public).collect()
    }

    pub async fn get(&mut self, code: &RoomCode) -> Option<RoomDirectoryEntry> {
        self.ensure_loaded().await;
        self.cache.as_ref().expect("just loaded").get(code.as_str()).cloned()
    }

    pub async fn size(&mut self) -> usize {
        self.ensure_loaded().await;
        self.cache.as_ref().expect("just loaded").len()
    }

    /// Applies a `room.status` upsert from a GameRoom, preserving `createdAt` from any
    /// existing record and persisting before returning (spec §4.3).
    pub async fn upsert(&mut self, update: RoomStatusUpdate) -> RoomDirectoryEntry {
        self.ensure_loaded().await;
        let created_at = self
            .cache
            .as_ref()
            .expect("just loaded")
            .get(update.code.as_str())
            .map_or(update.updated_at, |existing| existing.created_at);
        let entry = RoomDirectoryEntry {
            code: update.code.clone(),
            status: update.status,
            player_count: update.player_count,
            spectator_count: update.spectator_count,
            host_id: update.host_id,
            is_public: update.is_public,
            created_at,
            updated_at: update.updated_at,
        };
        if let Ok(value) = serde_json::to_value(&entry) {
            let _ = self
                .storage
                .put(namespace::DIRECTORY, entry.code.as_str(), value)
                .await;
        }
        self.cache
            .as_mut()
            .expect("just loaded")
            .insert(entry.code.as_str().to_string(), entry.clone());
        entry
    }

    pub async fn remove(&mut self, code: &RoomCode) {
        self.ensure_loaded().await;
        let _ = self.storage.delete(namespace::DIRECTORY, code.as_str()).await;
        self.cache.as_mut().expect("just loaded").remove(code.as_str());
    }

    /// Drops the cache; the next access re-reads storage (spec §4.3, used after external
    /// mutations this instance didn't itself perform).
    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}
