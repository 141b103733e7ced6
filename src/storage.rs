//! Storage (C9, ambient): the persistence trait backing "persist" in the AlarmQueue,
//! RoomDirectory and ChatLog contracts.
//!
//! Grounded in the teacher's `database::GameDatabase` trait-boundary + in-memory
//! implementation idiom (`src/database/mod.rs`), generalised from the teacher's
//! per-entity async methods to a namespace+key value store — this crate's storage needs
//! are "persist this actor's whole state blob before broadcasting", not a relational
//! schema of rooms/players, so a narrower trait is the faithful generalisation rather
//! than a literal port of every `GameDatabase` method.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

/// Namespaces used by this crate's actors. Kept as constants rather than an enum so a
/// future backend can add namespaces without a breaking change to the trait.
pub mod namespace {
    pub const ROOM: &str = "room";
    pub const SEATS: &str = "seats";
    pub const CHAT_HISTORY: &str = "chatHistory";
    pub const ALARM_QUEUE: &str = "alarmQueue";
    pub const DIRECTORY: &str = "directory";
    pub const PRESENCE: &str = "presenceSink";
    pub const GLOBAL_CHAT: &str = "globalChat";
    pub const INVITES: &str = "invites";
    pub const JOIN_REQUESTS: &str = "joinRequests";
    pub const LOBBY_ALARM_QUEUE: &str = "lobbyAlarmQueue";
}

/// Async key-value persistence, namespaced by component. One in-memory implementation
/// ships; the trait boundary is where a durable backend would plug in without touching
/// actor logic.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>>;
    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<()>;
    async fn delete(&self, namespace: &str, key: &str) -> Result<()>;
    async fn list_keys(&self, namespace: &str) -> Result<Vec<String>>;
    async fn health_check(&self) -> bool;
}

/// Process-local, `DashMap`-backed implementation. Matches the crate's "no external
/// database" posture (spec §1) — everything is lost on process restart.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    data: DashMap<(String, String), Value>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .data
            .get(&(namespace.to_string(), key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        self.data
            .insert((namespace.to_string(), key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        self.data.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_keys(&self, namespace: &str) -> Result<Vec<String>> {
        Ok(self
            .data
            .iter()
            .filter(|entry| entry.key().0 == namespace)
            .map(|entry| entry.key().1.clone())
            .collect())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let storage = InMemoryStorage::new();
        storage
            .put(namespace::ROOM, "ABC123", json!({"state": "waiting"}))
            .await
            .unwrap();

        let value = storage.get(namespace::ROOM, "ABC123").await.unwrap();
        assert_eq!(value, Some(json!({"state": "waiting"})));
    }

    #[tokio::test]
    async fn get_on_missing_key_is_none() {
        let storage = InMemoryStorage::new();
        assert_eq!(storage.get(namespace::ROOM, "NOPE00").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let storage = InMemoryStorage::new();
        storage
            .put(namespace::SEATS, "p1", json!({"connected": true}))
            .await
            .unwrap();
        storage.delete(namespace::SEATS, "p1").await.unwrap();
        assert_eq!(storage.get(namespace::SEATS, "p1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_keys_scoped_to_namespace() {
        let storage = InMemoryStorage::new();
        storage.put(namespace::ROOM, "A", json!(1)).await.unwrap();
        storage.put(namespace::ROOM, "B", json!(2)).await.unwrap();
        storage
            .put(namespace::DIRECTORY, "C", json!(3))
            .await
            .unwrap();

        let mut keys = storage.list_keys(namespace::ROOM).await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn health_check_reports_true() {
        let storage = InMemoryStorage::new();
        assert!(storage.health_check().await);
    }
}
