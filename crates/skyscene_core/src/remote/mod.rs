//! Remote store adapters, one per element category.
//!
//! # Responsibility
//! - Wrap a category-specific REST collection with get-all/save-all/clear.
//! - Turn every transport or protocol failure into a `RemoteError` value.
//!
//! # Invariants
//! - Adapters never panic and never return elements of another category.
//! - `Ok(vec![])` means the collection is empty; `Err(_)` means it could
//!   not be read.

use crate::model::element::{Category, SceneElement};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod http_store;

pub use http_store::HttpCategoryStore;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure of one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Request never produced a response.
    Transport(String),
    /// Non-2xx HTTP status.
    Status { code: u16, reason: String },
    /// Response body was not a valid envelope.
    Decode(String),
    /// Envelope reported `success: false`.
    Rejected(String),
    /// A returned element failed validation or has the wrong category.
    InvalidElement(String),
    /// Endpoint configuration cannot be turned into a request.
    InvalidConfig(String),
}

impl RemoteError {
    /// Whether the remote could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "remote_unreachable",
            Self::Status { .. } => "remote_status",
            Self::Decode(_) => "remote_decode",
            Self::Rejected(_) => "remote_rejected",
            Self::InvalidElement(_) => "remote_invalid_element",
            Self::InvalidConfig(_) => "remote_invalid_config",
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "remote unreachable: {message}"),
            Self::Status { code, reason } => write!(f, "remote returned HTTP {code} {reason}"),
            Self::Decode(message) => write!(f, "invalid remote response: {message}"),
            Self::Rejected(message) => write!(f, "remote rejected request: {message}"),
            Self::InvalidElement(message) => write!(f, "invalid remote element: {message}"),
            Self::InvalidConfig(message) => write!(f, "invalid remote endpoint: {message}"),
        }
    }
}

impl Error for RemoteError {}

/// Adapter contract for one category collection.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Category this adapter serves.
    fn category(&self) -> Category;

    /// Reads the full collection in source order.
    async fn fetch_all(&self) -> RemoteResult<Vec<SceneElement>>;

    /// Replaces the full collection with `elements`.
    async fn save_all(&self, elements: &[SceneElement]) -> RemoteResult<()>;

    /// Empties the collection.
    async fn clear_all(&self) -> RemoteResult<()>;
}

/// Validates fetched elements against the adapter category.
pub fn check_fetched(
    category: Category,
    elements: Vec<SceneElement>,
) -> RemoteResult<Vec<SceneElement>> {
    for element in &elements {
        if element.category() != category {
            return Err(RemoteError::InvalidElement(format!(
                "element {} is a {} in the {} collection",
                element.id,
                element.category(),
                category
            )));
        }
        element
            .validate()
            .map_err(|err| RemoteError::InvalidElement(format!("element {}: {err}", element.id)))?;
    }
    Ok(elements)
}
