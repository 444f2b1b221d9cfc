use std::path::{Path, PathBuf};
use std::{env, fs};

use rusqlite::{Connection, OptionalExtension, params};
use uq_core::{KeyValueStore, PortResult};

use crate::error::Result;
use crate::schema;

const DB_FILE: &str = "uniqpass.db";

/// Base directory for durable state.
///
/// Priority: explicit override > `UQ_DATA_DIR` > `$HOME/.uniqpass`.
pub fn resolve_base_dir(override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    env::var("UQ_DATA_DIR")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            env::var("HOME")
                .or_else(|_| env::var("USERPROFILE"))
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".uniqpass")
        })
}

pub fn resolve_db_path(override_dir: Option<&Path>) -> PathBuf {
    resolve_base_dir(override_dir).join(DB_FILE)
}

/// SQLite-backed string key-value store.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::debug!("opened store at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove `key`. Returns whether a row was deleted.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(deleted > 0)
    }

    /// Every stored key, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

impl KeyValueStore for Store {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(Store::get(self, key)?)
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        Ok(Store::set(self, key, value)?)
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        if Store::remove(self, key)? {
            tracing::debug!(key, "removed stored value");
        }
        Ok(())
    }
}
