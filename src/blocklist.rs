//! Persisted set of identities hidden from the feed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::BlockLookup;
use crate::store::{DurableKv, KvStore};
use crate::types::FeedItem;

pub const KEY_BLOCKED_USERS: &str = "blocked_users";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub screen_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub blocked_at: DateTime<Utc>,
}

impl BlockEntry {
    pub fn from_item(item: &FeedItem) -> Self {
        Self {
            user_id: item.identity_id().to_string(),
            name: item.name.clone(),
            screen_name: item.screen_name.clone(),
            avatar_url: item.avatar_url.clone(),
            blocked_at: Utc::now(),
        }
    }
}

/// Write-through block-list keyed by identity id.
pub struct BlockList {
    kv: DurableKv,
    entries: HashMap<String, BlockEntry>,
}

impl BlockList {
    pub fn load(store: Box<dyn KvStore>) -> Self {
        let kv = DurableKv::new(store);
        let entries = match kv.read(KEY_BLOCKED_USERS) {
            None => HashMap::new(),
            Some(raw) => decode_entries(&raw),
        };
        log::info!("[blocklist] loaded {} blocked identities", entries.len());
        Self { kv, entries }
    }

    /// Add an identity. Returns false if it was already blocked.
    pub fn block(&mut self, entry: BlockEntry) -> bool {
        if self.entries.contains_key(&entry.user_id) {
            return false;
        }
        log::info!("[blocklist] block @{} ({})", entry.screen_name, entry.user_id);
        self.entries.insert(entry.user_id.clone(), entry);
        self.persist();
        true
    }

    /// Remove an identity. Returns false if it was not blocked.
    pub fn unblock(&mut self, identity_id: &str) -> bool {
        if self.entries.remove(identity_id).is_none() {
            return false;
        }
        log::info!("[blocklist] unblock {identity_id}");
        self.persist();
        true
    }

    pub fn is_blocked(&self, identity_id: &str) -> bool {
        self.entries.contains_key(identity_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, most recently blocked first.
    pub fn entries(&self) -> Vec<&BlockEntry> {
        let mut list: Vec<&BlockEntry> = self.entries.values().collect();
        list.sort_by(|a, b| b.blocked_at.cmp(&a.blocked_at).then_with(|| a.user_id.cmp(&b.user_id)));
        list
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.kv.delete(KEY_BLOCKED_USERS);
    }

    pub fn is_volatile(&self) -> bool {
        self.kv.is_volatile()
    }

    fn persist(&mut self) {
        let list: Vec<&BlockEntry> = self.entries.values().collect();
        match serde_json::to_string(&list) {
            Ok(raw) => self.kv.write(KEY_BLOCKED_USERS, &raw),
            Err(e) => log::error!("[blocklist] serialize failed: {e}"),
        }
    }
}

/// Decode the stored list entry by entry so one bad record does not cost the
/// rest.
fn decode_entries(raw: &str) -> HashMap<String, BlockEntry> {
    let values = match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(values) => values,
        Err(e) => {
            log::warn!("[blocklist] stored list unreadable, starting empty: {e}");
            return HashMap::new();
        }
    };
    let mut entries = HashMap::new();
    for value in values {
        match serde_json::from_value::<BlockEntry>(value) {
            Ok(entry) => {
                entries.insert(entry.user_id.clone(), entry);
            }
            Err(e) => log::warn!("[blocklist] skipping malformed entry: {e}"),
        }
    }
    entries
}

impl BlockLookup for BlockList {
    fn is_blocked(&self, identity_id: &str) -> bool {
        BlockList::is_blocked(self, identity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn entry(id: &str) -> BlockEntry {
        BlockEntry {
            user_id: id.to_string(),
            name: format!("User {id}"),
            screen_name: format!("user{id}"),
            avatar_url: None,
            blocked_at: Utc::now(),
        }
    }

    #[test]
    fn test_block_is_idempotent() {
        let mut list = BlockList::load(Box::new(MemoryStore::new()));
        assert!(list.block(entry("1")));
        assert!(!list.block(entry("1")));
        assert_eq!(list.len(), 1);
        assert!(list.is_blocked("1"));
    }

    #[test]
    fn test_unblock() {
        let mut list = BlockList::load(Box::new(MemoryStore::new()));
        list.block(entry("1"));
        assert!(list.unblock("1"));
        assert!(!list.unblock("1"));
        assert!(!list.is_blocked("1"));
    }

    #[test]
    fn test_survives_reload() {
        let store = MemoryStore::new();
        {
            let mut list = BlockList::load(Box::new(store.clone()));
            list.block(entry("1"));
            list.block(entry("2"));
            list.unblock("1");
        }
        let list = BlockList::load(Box::new(store));
        assert!(!list.is_blocked("1"));
        assert!(list.is_blocked("2"));
        assert_eq!(list.entries()[0].screen_name, "user2");
    }

    #[test]
    fn test_corrupt_payload_starts_empty() {
        let mut store = MemoryStore::new();
        store.set(KEY_BLOCKED_USERS, "{not json").unwrap();
        let list = BlockList::load(Box::new(store));
        assert!(list.is_empty());
    }

    #[test]
    fn test_malformed_entry_keeps_the_rest() {
        let mut store = MemoryStore::new();
        let raw = r#"[
            {"user_id":"1","screen_name":"one","blocked_at":"2024-05-01T10:00:00Z"},
            {"user_id":"2","blocked_at":"not a date"},
            {"screen_name":"no id"},
            {"user_id":"3","blocked_at":"2024-05-02T10:00:00Z"}
        ]"#;
        store.set(KEY_BLOCKED_USERS, raw).unwrap();
        let mut list = BlockList::load(Box::new(store.clone()));
        assert_eq!(list.len(), 2);
        assert!(list.is_blocked("1"));
        assert!(list.is_blocked("3"));

        // the next write keeps the surviving entries
        list.block(entry("4"));
        let reloaded = BlockList::load(Box::new(store));
        assert!(reloaded.is_blocked("1"));
        assert!(reloaded.is_blocked("3"));
        assert!(reloaded.is_blocked("4"));
    }

    #[test]
    fn test_clear_removes_key() {
        let store = MemoryStore::new();
        let mut list = BlockList::load(Box::new(store.clone()));
        list.block(entry("9"));
        list.clear();
        assert!(list.is_empty());
        assert!(store.is_empty());
    }
}
