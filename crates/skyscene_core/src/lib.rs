//! Persistence core for the SkyScene builder.
//! Keeps the in-memory scene, the local cache and the remote store consistent.

pub mod cache;
pub mod config;
pub mod controller;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod sync;

pub use cache::sqlite_cache::SqliteSceneCache;
pub use cache::{CacheError, CacheResult, SceneCache, DEFAULT_SLOT};
pub use config::{CacheConfig, ConfigError, LogConfig, RemoteEndpoint, SceneConfig};
pub use controller::scene_controller::{
    LoadOutcome, LoadSource, MutationReport, SceneController, SceneError, SceneSnapshot,
    SyncStatus,
};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::element::{
    Category, CloudSize, ElementId, ElementPayload, ElementValidationError, Position,
    SceneElement, BIRD_PALETTE,
};
pub use model::scene::{CategoryCounts, Scene};
pub use remote::{CategoryStore, HttpCategoryStore, RemoteError, RemoteResult};
pub use sync::{PerCategory, SceneLoad, SceneSync, SyncReport, SyncSetupError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
