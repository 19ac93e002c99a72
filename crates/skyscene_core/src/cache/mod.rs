//! Local durable cache of the last known scene.
//!
//! # Responsibility
//! - Hold one named slot with the full scene snapshot as JSON.
//! - Surface corrupted snapshots instead of masking them.
//!
//! # Invariants
//! - `write` replaces the slot unconditionally.
//! - `read` never drops malformed contents silently.

use crate::db::DbError;
use crate::model::element::{ElementValidationError, SceneElement};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod sqlite_cache;

/// Slot name used by the scene builder.
pub const DEFAULT_SLOT: &str = "skyElements";

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug)]
pub enum CacheError {
    Db(DbError),
    /// Stored payload is not a valid element sequence.
    Malformed { slot: String, message: String },
    Encode(serde_json::Error),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Malformed { slot, message } => {
                write!(f, "cached scene in slot `{slot}` is malformed: {message}")
            }
            Self::Encode(err) => write!(f, "failed to encode scene snapshot: {err}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Malformed { .. } => None,
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for the scene snapshot slot.
pub trait SceneCache: Send + Sync {
    /// Returns the stored snapshot, or `None` when the slot is absent.
    fn read(&self) -> CacheResult<Option<Vec<SceneElement>>>;
    /// Replaces the slot with the given ordered sequence.
    fn write(&self, elements: &[SceneElement]) -> CacheResult<()>;
    /// Removes the slot entirely.
    fn clear(&self) -> CacheResult<()>;
}

/// Decodes a stored snapshot, validating every element.
pub fn decode_snapshot(slot: &str, payload: &str) -> CacheResult<Vec<SceneElement>> {
    let elements: Vec<SceneElement> =
        serde_json::from_str(payload).map_err(|err| CacheError::Malformed {
            slot: slot.to_string(),
            message: err.to_string(),
        })?;

    elements
        .iter()
        .enumerate()
        .try_for_each(|(index, element)| {
            element
                .validate()
                .map_err(|err: ElementValidationError| CacheError::Malformed {
                    slot: slot.to_string(),
                    message: format!("element {index} ({}): {err}", element.id),
                })
        })?;

    Ok(elements)
}

pub fn encode_snapshot(elements: &[SceneElement]) -> CacheResult<String> {
    serde_json::to_string(elements).map_err(CacheError::Encode)
}
