//! SQLite-backed scene cache.
//!
//! # Invariants
//! - Exactly one row per slot name in `cache_slots`.

use crate::cache::{decode_snapshot, encode_snapshot, CacheResult, SceneCache, DEFAULT_SLOT};
use crate::db::{open_db, open_db_in_memory};
use crate::model::element::SceneElement;
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Scene cache storing snapshots in one SQLite table.
pub struct SqliteSceneCache {
    conn: Mutex<Connection>,
    slot: String,
}

impl SqliteSceneCache {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection, slot: impl Into<String>) -> Self {
        Self {
            conn: Mutex::new(conn),
            slot: slot.into(),
        }
    }

    /// Opens the cache database file using the default slot.
    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        Ok(Self::new(open_db(path)?, DEFAULT_SLOT))
    }

    pub fn open_in_memory() -> CacheResult<Self> {
        Ok(Self::new(open_db_in_memory()?, DEFAULT_SLOT))
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned guard still holds a usable connection.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SceneCache for SqliteSceneCache {
    fn read(&self) -> CacheResult<Option<Vec<SceneElement>>> {
        let payload: Option<String> = self
            .conn()
            .query_row(
                "SELECT payload FROM cache_slots WHERE slot = ?1;",
                [self.slot.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            debug!(
                "event=cache_read module=cache status=ok slot={} present=false",
                self.slot
            );
            return Ok(None);
        };

        match decode_snapshot(&self.slot, &payload) {
            Ok(elements) => {
                debug!(
                    "event=cache_read module=cache status=ok slot={} present=true elements={}",
                    self.slot,
                    elements.len()
                );
                Ok(Some(elements))
            }
            Err(err) => {
                error!(
                    "event=cache_read module=cache status=error slot={} error_code=cache_malformed error={}",
                    self.slot, err
                );
                Err(err)
            }
        }
    }

    fn write(&self, elements: &[SceneElement]) -> CacheResult<()> {
        let payload = encode_snapshot(elements)?;
        self.conn().execute(
            "INSERT INTO cache_slots (slot, payload, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now') * 1000)
             ON CONFLICT(slot) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at;",
            params![self.slot.as_str(), payload],
        )?;
        debug!(
            "event=cache_write module=cache status=ok slot={} elements={}",
            self.slot,
            elements.len()
        );
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        self.conn().execute(
            "DELETE FROM cache_slots WHERE slot = ?1;",
            [self.slot.as_str()],
        )?;
        debug!("event=cache_clear module=cache status=ok slot={}", self.slot);
        Ok(())
    }
}
