//! SQLite-backed stores. Simple and synchronous: one connection per store
//! behind a mutex, each mutation in its own committed transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use notify_types::DatasetRecord;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BasePermissions, DocumentIndex, RelationalIndex};

const SEARCH: &str = "search";
const REGISTER: &str = "register";

const RELATIONAL_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS base_uri (
    id       INTEGER PRIMARY KEY,
    base_uri TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS base_uri_permission (
    base_uri_id INTEGER NOT NULL REFERENCES base_uri(id) ON DELETE CASCADE,
    username    TEXT NOT NULL,
    kind        TEXT NOT NULL,
    PRIMARY KEY (base_uri_id, username, kind)
);
CREATE TABLE IF NOT EXISTS dataset (
    id               INTEGER PRIMARY KEY,
    uuid             TEXT NOT NULL,
    name             TEXT NOT NULL,
    base_uri_id      INTEGER NOT NULL REFERENCES base_uri(id),
    uri              TEXT NOT NULL UNIQUE,
    creator_username TEXT,
    frozen_at        REAL,
    created_at       REAL
);
CREATE INDEX IF NOT EXISTS idx_dataset_uuid ON dataset(uuid);
";

const DOCUMENT_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS document (
    uri  TEXT PRIMARY KEY,
    body TEXT NOT NULL
);
";

const SELECT_DATASET: &str = "
SELECT d.uuid, d.name, b.base_uri, d.uri, d.creator_username, d.frozen_at, d.created_at
FROM dataset d JOIN base_uri b ON b.id = d.base_uri_id";

fn open_connection(path: &Path, schema: &str) -> StoreResult<Connection> {
    let db = Connection::open(path)?;
    db.pragma_update(None, "journal_mode", "WAL").ok();
    db.pragma_update(None, "synchronous", "NORMAL").ok();
    init(db, schema)
}

fn init(db: Connection, schema: &str) -> StoreResult<Connection> {
    db.execute_batch("PRAGMA foreign_keys = ON;")?;
    db.execute_batch(schema)?;
    Ok(db)
}

fn lock(db: &Mutex<Connection>) -> StoreResult<MutexGuard<'_, Connection>> {
    db.lock()
        .map_err(|e| StoreError::LockPoisoned(e.to_string()))
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<DatasetRecord> {
    Ok(DatasetRecord {
        uuid: row.get(0)?,
        name: row.get(1)?,
        base_uri: row.get(2)?,
        uri: row.get(3)?,
        creator_username: row.get(4)?,
        frozen_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn base_uri_id(db: &Connection, base_uri: &str) -> StoreResult<Option<i64>> {
    Ok(db
        .query_row(
            "SELECT id FROM base_uri WHERE base_uri = ?1",
            [base_uri],
            |row| row.get(0),
        )
        .optional()?)
}

/// Persistent [`RelationalIndex`] in a SQLite database file.
pub struct SqliteRelationalIndex {
    db: Mutex<Connection>,
}

impl SqliteRelationalIndex {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = open_connection(path, RELATIONAL_SCHEMA)?;
        tracing::debug!(path = %path.display(), "opened relational index");
        Ok(Self { db: Mutex::new(db) })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let db = init(Connection::open_in_memory()?, RELATIONAL_SCHEMA)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn users(db: &Connection, id: i64, kind: &str) -> StoreResult<Vec<String>> {
        let mut stmt = db.prepare(
            "SELECT username FROM base_uri_permission
             WHERE base_uri_id = ?1 AND kind = ?2 ORDER BY username",
        )?;
        let users = stmt
            .query_map(params![id, kind], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(users)
    }
}

impl RelationalIndex for SqliteRelationalIndex {
    fn register_base_uri(&self, base_uri: &str) -> StoreResult<bool> {
        let db = lock(&self.db)?;
        let inserted = db.execute(
            "INSERT OR IGNORE INTO base_uri(base_uri) VALUES (?1)",
            [base_uri],
        )?;
        Ok(inserted > 0)
    }

    fn base_uri_exists(&self, base_uri: &str) -> StoreResult<bool> {
        let db = lock(&self.db)?;
        Ok(base_uri_id(&db, base_uri)?.is_some())
    }

    fn list_base_uris(&self) -> StoreResult<Vec<String>> {
        let db = lock(&self.db)?;
        let mut stmt = db.prepare("SELECT base_uri FROM base_uri ORDER BY base_uri")?;
        let uris = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(uris)
    }

    fn update_permissions(&self, permissions: &BasePermissions) -> StoreResult<()> {
        let mut db = lock(&self.db)?;
        let tx = db.transaction()?;
        let id = base_uri_id(&tx, &permissions.base_uri)?
            .ok_or_else(|| StoreError::BaseUriNotRegistered(permissions.base_uri.clone()))?;
        tx.execute("DELETE FROM base_uri_permission WHERE base_uri_id = ?1", [id])?;
        for (kind, users) in [
            (SEARCH, &permissions.users_with_search_permissions),
            (REGISTER, &permissions.users_with_register_permissions),
        ] {
            for user in users {
                tx.execute(
                    "INSERT OR IGNORE INTO base_uri_permission(base_uri_id, username, kind)
                     VALUES (?1, ?2, ?3)",
                    params![id, user, kind],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn permissions(&self, base_uri: &str) -> StoreResult<Option<BasePermissions>> {
        let db = lock(&self.db)?;
        let Some(id) = base_uri_id(&db, base_uri)? else {
            return Ok(None);
        };
        Ok(Some(BasePermissions {
            base_uri: base_uri.to_string(),
            users_with_search_permissions: Self::users(&db, id, SEARCH)?,
            users_with_register_permissions: Self::users(&db, id, REGISTER)?,
        }))
    }

    fn find_by_uuid(&self, uuid: &str, base_uri: &str) -> StoreResult<Vec<DatasetRecord>> {
        let db = lock(&self.db)?;
        let mut stmt = db.prepare(&format!(
            "{SELECT_DATASET} WHERE d.uuid = ?1 AND b.base_uri = ?2 ORDER BY d.id"
        ))?;
        let rows = stmt
            .query_map([uuid, base_uri], map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn upsert(&self, record: &DatasetRecord) -> StoreResult<()> {
        let mut db = lock(&self.db)?;
        let tx = db.transaction()?;
        let id = base_uri_id(&tx, &record.base_uri)?
            .ok_or_else(|| StoreError::BaseUriNotRegistered(record.base_uri.clone()))?;
        tx.execute(
            "INSERT INTO dataset(uuid, name, base_uri_id, uri, creator_username, frozen_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(uri) DO UPDATE SET
                 uuid = excluded.uuid,
                 name = excluded.name,
                 base_uri_id = excluded.base_uri_id,
                 creator_username = excluded.creator_username,
                 frozen_at = excluded.frozen_at,
                 created_at = excluded.created_at",
            params![
                record.uuid,
                record.name,
                id,
                record.uri,
                record.creator_username,
                record.frozen_at,
                record.created_at,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_by_uri(&self, uri: &str) -> StoreResult<usize> {
        let db = lock(&self.db)?;
        Ok(db.execute("DELETE FROM dataset WHERE uri = ?1", [uri])?)
    }

    fn list_datasets_by_user(&self, username: &str) -> StoreResult<Vec<DatasetRecord>> {
        let db = lock(&self.db)?;
        let mut stmt = db.prepare(&format!(
            "{SELECT_DATASET}
             JOIN base_uri_permission p ON p.base_uri_id = b.id
             WHERE p.username = ?1 AND p.kind = ?2
             ORDER BY d.id"
        ))?;
        let rows = stmt
            .query_map([username, SEARCH], map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn count(&self) -> StoreResult<usize> {
        let db = lock(&self.db)?;
        let n: i64 = db.query_row("SELECT COUNT(*) FROM dataset", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

/// Persistent [`DocumentIndex`] storing JSON documents in SQLite.
pub struct SqliteDocumentIndex {
    db: Mutex<Connection>,
}

impl SqliteDocumentIndex {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = open_connection(path, DOCUMENT_SCHEMA)?;
        tracing::debug!(path = %path.display(), "opened document index");
        Ok(Self { db: Mutex::new(db) })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let db = init(Connection::open_in_memory()?, DOCUMENT_SCHEMA)?;
        Ok(Self { db: Mutex::new(db) })
    }
}

impl DocumentIndex for SqliteDocumentIndex {
    fn upsert(&self, uri: &str, document: &Value) -> StoreResult<()> {
        let body = serde_json::to_string(document)?;
        let db = lock(&self.db)?;
        db.execute(
            "INSERT INTO document(uri, body) VALUES (?1, ?2)
             ON CONFLICT(uri) DO UPDATE SET body = excluded.body",
            [uri, body.as_str()],
        )?;
        Ok(())
    }

    fn delete_by_uri(&self, uri: &str) -> StoreResult<usize> {
        let db = lock(&self.db)?;
        Ok(db.execute("DELETE FROM document WHERE uri = ?1", [uri])?)
    }

    fn get(&self, uri: &str) -> StoreResult<Option<Value>> {
        let db = lock(&self.db)?;
        let body: Option<String> = db
            .query_row("SELECT body FROM document WHERE uri = ?1", [uri], |row| {
                row.get(0)
            })
            .optional()?;
        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    fn count(&self) -> StoreResult<usize> {
        let db = lock(&self.db)?;
        let n: i64 = db.query_row("SELECT COUNT(*) FROM document", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}
