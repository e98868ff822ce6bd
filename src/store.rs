//! Key/value persistence port for user preferences.
//!
//! `Preferences` and `BlockList` only see the `KvStore` trait. The native
//! build backs it with SQLite; `MemoryStore` serves tests and the fallback
//! when the database cannot be opened.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Result;

#[cfg(feature = "native")]
use rusqlite::{params, Connection, OptionalExtension};

pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store. Clones share the same map, which lets tests "restart" by
/// loading a fresh `Preferences` from a clone.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    map: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.map.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.map.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(feature = "native")]
pub struct SqliteStore {
    conn: Connection,
}

#[cfg(feature = "native")]
impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("[store] opened {path} (journal_mode={mode})");
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "busy_timeout", 250)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS prefs(
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_ms INTEGER NOT NULL
            );
        "#,
        )?;
        Ok(Self { conn })
    }
}

#[cfg(feature = "native")]
impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare_cached("SELECT value FROM prefs WHERE key = ?")?;
        let value = stmt.query_row(params![key], |row| row.get(0)).optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut stmt = self
            .conn
            .prepare_cached("INSERT OR REPLACE INTO prefs(key,value,updated_ms) VALUES (?,?,?)")?;
        stmt.execute(params![key, value, now])?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut stmt = self.conn.prepare_cached("DELETE FROM prefs WHERE key = ?")?;
        stmt.execute(params![key])?;
        Ok(())
    }
}

/// Best-effort wrapper over a `KvStore`.
///
/// Read failures look like missing keys. The first write failure switches the
/// wrapper to volatile mode: the session keeps working from memory and no
/// further writes are attempted.
pub struct DurableKv {
    inner: Box<dyn KvStore>,
    volatile: bool,
}

impl DurableKv {
    pub fn new(inner: Box<dyn KvStore>) -> Self {
        Self { inner, volatile: false }
    }

    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    pub fn read(&self, key: &str) -> Option<String> {
        match self.inner.get(key) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("[store] read '{key}' failed, using default: {e:#}");
                None
            }
        }
    }

    pub fn write(&mut self, key: &str, value: &str) {
        if self.volatile {
            return;
        }
        if let Err(e) = self.inner.set(key, value) {
            log::warn!("[store] write '{key}' failed, keeping preferences in memory: {e:#}");
            self.volatile = true;
        }
    }

    pub fn delete(&mut self, key: &str) {
        if self.volatile {
            return;
        }
        if let Err(e) = self.inner.remove(key) {
            log::warn!("[store] delete '{key}' failed, keeping preferences in memory: {e:#}");
            self.volatile = true;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;

    /// Store whose writes always fail; reads return whatever was seeded.
    pub(crate) struct BrokenStore {
        pub seeded: HashMap<String, String>,
    }

    impl KvStore for BrokenStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.seeded.get(key).cloned())
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("disk full"))
        }
        fn remove(&mut self, _key: &str) -> Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let mut a = MemoryStore::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
        a.remove("k").unwrap();
        assert!(b.is_empty());
    }

    #[test]
    fn test_durable_goes_volatile_on_write_error() {
        let mut kv = DurableKv::new(Box::new(BrokenStore { seeded: HashMap::new() }));
        assert!(!kv.is_volatile());
        kv.write("k", "v");
        assert!(kv.is_volatile());
        assert_eq!(kv.read("k"), None);
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_sqlite_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.db");
        let path = path.to_str().unwrap();
        {
            let mut store = SqliteStore::open(path).unwrap();
            store.set("follower_threshold", "2500").unwrap();
            store.set("follower_threshold", "3000").unwrap();
            store.set("gone", "x").unwrap();
            store.remove("gone").unwrap();
        }
        let store = SqliteStore::open(path).unwrap();
        assert_eq!(store.get("follower_threshold").unwrap().as_deref(), Some("3000"));
        assert_eq!(store.get("gone").unwrap(), None);
    }
}
