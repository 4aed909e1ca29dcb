//! SQLite-backed datastore.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::debug;

use crate::error::{AlmanacError, Result};

use super::{Datastore, RecordId, RecordKind, StoreTransaction, StoredRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records(
  id INTEGER PRIMARY KEY,
  kind TEXT NOT NULL,
  key TEXT NOT NULL,
  payload TEXT NOT NULL,
  UNIQUE(kind, key)
);

CREATE TABLE IF NOT EXISTS links(
  from_id INTEGER NOT NULL REFERENCES records(id),
  to_id INTEGER NOT NULL REFERENCES records(id),
  relation TEXT NOT NULL,
  PRIMARY KEY(from_id, to_id, relation)
);
"#;

/// Datastore persisted in a single SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| AlmanacError::io(parent, e))?;
            }
        }
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.init_schema()?;
        debug!(path = %path.display(), "opened datastore");
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Number of committed records of one kind.
    pub fn count(&self, kind: RecordKind) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records WHERE kind=?1", params![kind.label()], |r| r.get(0))?;
        Ok(n as usize)
    }

    /// Number of committed links with one relation.
    pub fn link_count(&self, relation: &str) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM links WHERE relation=?1", params![relation], |r| r.get(0))?;
        Ok(n as usize)
    }

    /// Read a committed record.
    pub fn record(&self, kind: RecordKind, key: &str) -> Result<Option<StoredRecord>> {
        fetch(&self.conn, kind, key)
    }
}

impl Datastore for SqliteStore {
    fn transaction(&mut self) -> Result<Box<dyn StoreTransaction + '_>> {
        Ok(Box::new(SqliteTransaction {
            tx: self.conn.transaction()?,
        }))
    }
}

/// An open SQLite transaction; rolls back on drop unless committed.
pub struct SqliteTransaction<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl StoreTransaction for SqliteTransaction<'_> {
    fn get(&self, kind: RecordKind, key: &str) -> Result<Option<StoredRecord>> {
        fetch(&self.tx, kind, key)
    }

    fn create(&mut self, kind: RecordKind, key: &str, payload: &Value) -> Result<RecordId> {
        self.tx.execute(
            "INSERT INTO records(kind,key,payload) VALUES(?1,?2,?3)",
            params![kind.label(), key, serde_json::to_string(payload)?],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    fn update(&mut self, kind: RecordKind, id: RecordId, payload: &Value) -> Result<()> {
        let changed = self.tx.execute(
            "UPDATE records SET payload=?1 WHERE id=?2 AND kind=?3",
            params![serde_json::to_string(payload)?, id, kind.label()],
        )?;
        if changed == 0 {
            return Err(AlmanacError::Datastore(format!("no {} record with id {}", kind, id)));
        }
        Ok(())
    }

    fn link(&mut self, from: RecordId, to: RecordId, relation: &str) -> Result<()> {
        self.tx.execute(
            "INSERT OR IGNORE INTO links(from_id,to_id,relation) VALUES(?1,?2,?3)",
            params![from, to, relation],
        )?;
        Ok(())
    }

    fn linked(&self, from: RecordId, relation: &str) -> Result<Vec<RecordId>> {
        let mut stmt = self
            .tx
            .prepare("SELECT to_id FROM links WHERE from_id=?1 AND relation=?2 ORDER BY rowid")?;
        let ids = stmt
            .query_map(params![from, relation], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<RecordId>>>()?;
        Ok(ids)
    }

    fn clear_links(&mut self, from: RecordId) -> Result<usize> {
        Ok(self.tx.execute("DELETE FROM links WHERE from_id=?1", params![from])?)
    }

    fn delete(&mut self, kind: RecordKind, id: RecordId) -> Result<()> {
        self.tx
            .execute("DELETE FROM links WHERE from_id=?1 OR to_id=?1", params![id])?;
        let changed = self
            .tx
            .execute("DELETE FROM records WHERE id=?1 AND kind=?2", params![id, kind.label()])?;
        if changed == 0 {
            return Err(AlmanacError::Datastore(format!("no {} record with id {}", kind, id)));
        }
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let SqliteTransaction { tx } = *self;
        tx.commit()?;
        Ok(())
    }
}

fn fetch(conn: &Connection, kind: RecordKind, key: &str) -> Result<Option<StoredRecord>> {
    let row: Option<(RecordId, String)> = conn
        .query_row(
            "SELECT id, payload FROM records WHERE kind=?1 AND key=?2",
            params![kind.label(), key],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    match row {
        Some((id, payload)) => Ok(Some(StoredRecord {
            id,
            kind,
            key: key.to_string(),
            payload: serde_json::from_str(&payload)?,
        })),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_commit_persists() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let mut tx = store.transaction().unwrap();
            let (alice, created) = tx.get_or_create(RecordKind::Person, "alice|smith", &json!({"name": "Alice"})).unwrap();
            assert!(created);
            let (again, created) = tx.get_or_create(RecordKind::Person, "alice|smith", &json!({})).unwrap();
            assert_eq!(alice, again);
            assert!(!created);
            tx.commit().unwrap();
        }

        let record = store.record(RecordKind::Person, "alice|smith").unwrap().unwrap();
        assert_eq!(record.payload["name"], "Alice");
        assert_eq!(store.count(RecordKind::Person).unwrap(), 1);
    }

    #[test]
    fn test_drop_rolls_back() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let mut tx = store.transaction().unwrap();
            let a = tx.create(RecordKind::Tag, "walk", &json!({})).unwrap();
            let b = tx.create(RecordKind::Entry, "2024-03-14", &json!({})).unwrap();
            tx.link(b, a, "tagged").unwrap();
        }
        assert_eq!(store.count(RecordKind::Tag).unwrap(), 0);
        assert_eq!(store.link_count("tagged").unwrap(), 0);
    }

    #[test]
    fn test_duplicate_create_fails_and_update_checks_kind() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut tx = store.transaction().unwrap();
        let id = tx.create(RecordKind::City, "montreal", &json!({"name": "Montréal"})).unwrap();
        assert!(matches!(
            tx.create(RecordKind::City, "montreal", &json!({})),
            Err(AlmanacError::Datastore(_))
        ));
        assert!(tx.update(RecordKind::City, id, &json!({"name": "Montreal"})).is_ok());
        assert!(tx.update(RecordKind::Tag, id, &json!({})).is_err());
    }

    #[test]
    fn test_clear_links_only_touches_outgoing() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let mut tx = store.transaction().unwrap();
            let entry = tx.create(RecordKind::Entry, "2024/03/14.json", &json!({})).unwrap();
            let scene = tx.create(RecordKind::Scene, "2024/03/14.json#scene-morning", &json!({})).unwrap();
            let tag = tx.create(RecordKind::Tag, "walk", &json!({})).unwrap();
            tx.link(entry, scene, "scene").unwrap();
            tx.link(entry, tag, "tagged").unwrap();
            tx.link(scene, tag, "tagged").unwrap();
            assert_eq!(tx.linked(entry, "scene").unwrap(), vec![scene]);

            assert_eq!(tx.clear_links(entry).unwrap(), 2);
            assert_eq!(tx.clear_links(entry).unwrap(), 0);
            assert!(tx.linked(entry, "scene").unwrap().is_empty());
            tx.commit().unwrap();
        }
        assert_eq!(store.link_count("scene").unwrap(), 0);
        assert_eq!(store.link_count("tagged").unwrap(), 1);
    }

    #[test]
    fn test_delete_removes_record_and_its_links() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let mut tx = store.transaction().unwrap();
            let entry = tx.create(RecordKind::Entry, "a.json", &json!({})).unwrap();
            let scene = tx.create(RecordKind::Scene, "a.json#scene-morning", &json!({})).unwrap();
            let alice = tx.create(RecordKind::Person, "alice|smith", &json!({})).unwrap();
            tx.link(entry, scene, "scene").unwrap();
            tx.link(scene, alice, "mentions").unwrap();

            tx.delete(RecordKind::Scene, scene).unwrap();
            assert!(tx.delete(RecordKind::Scene, scene).is_err());
            tx.commit().unwrap();
        }
        assert_eq!(store.count(RecordKind::Scene).unwrap(), 0);
        assert_eq!(store.count(RecordKind::Person).unwrap(), 1);
        assert_eq!(store.link_count("scene").unwrap(), 0);
        assert_eq!(store.link_count("mentions").unwrap(), 0);
    }

    #[test]
    fn test_record_kind_labels_round_trip() {
        for kind in RecordKind::ALL {
            assert_eq!(kind.label().parse::<RecordKind>(), Ok(kind));
        }
    }
}
