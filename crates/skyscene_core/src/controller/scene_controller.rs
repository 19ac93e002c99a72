//! Reconciliation controller for the scene.
//!
//! # Responsibility
//! - Pick the source of truth at startup (remote, then local cache).
//! - Apply `add`/`clear` locally first, then write through to the remote.
//! - Mirror every scene change into the local cache.
//!
//! # Invariants
//! - Local mutations are never rolled back because of a remote failure.
//! - The state lock is never held across an await point.
//! - Remote counts only change from successful remote results.
//! - A malformed cache is surfaced to the caller, never read as empty.
//! - The load-time push never writes a category whose remote read failed.

use crate::cache::{CacheError, SceneCache};
use crate::model::element::{Category, SceneElement};
use crate::model::scene::{count_by_category, CategoryCounts, Scene};
use crate::sync::SceneSync;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Controller-level error.
#[derive(Debug)]
pub enum SceneError {
    Cache(CacheError),
}

impl Display for SceneError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SceneError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Cache(err) => Some(err),
        }
    }
}

impl From<CacheError> for SceneError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

/// Whether a mutation reached the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Local and remote both hold the change.
    Synced,
    /// Only local state and cache hold the change.
    LocalOnly,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::LocalOnly => "local_only",
        }
    }
}

/// Where the startup scene came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Cache,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub source: LoadSource,
    pub element_count: usize,
    /// Categories whose remote read failed.
    pub remote_failed: Vec<Category>,
    /// Categories filled in from the cache because their remote read failed.
    pub cache_filled: Vec<Category>,
    /// Result of pushing a cache-sourced scene back to the remote.
    pub push_status: Option<SyncStatus>,
    /// The cache could not be decoded while filling failed categories.
    pub cache_malformed: bool,
}

/// Result of one `add` or `clear` command.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationReport {
    pub status: SyncStatus,
    /// Element created by `add`.
    pub element: Option<SceneElement>,
    /// Categories whose remote write failed.
    pub failed: Vec<Category>,
}

/// Read projection handed to presentation layers.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSnapshot {
    pub elements: Vec<SceneElement>,
    pub busy: bool,
    pub local_counts: CategoryCounts,
    pub remote_counts: CategoryCounts,
    pub last_status: Option<SyncStatus>,
}

#[derive(Debug, Default)]
struct SceneState {
    scene: Scene,
    remote_counts: CategoryCounts,
    last_status: Option<SyncStatus>,
}

struct BusyGuard<'a>(&'a AtomicUsize);

impl<'a> BusyGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owner of the authoritative scene.
pub struct SceneController<C: SceneCache> {
    sync: SceneSync,
    cache: C,
    state: Mutex<SceneState>,
    busy: AtomicUsize,
}

impl<C: SceneCache> SceneController<C> {
    /// Creates a controller with an empty scene; call `load` once at startup.
    pub fn new(sync: SceneSync, cache: C) -> Self {
        Self {
            sync,
            cache,
            state: Mutex::new(SceneState::default()),
            busy: AtomicUsize::new(0),
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Loads the startup scene.
    ///
    /// # Contract
    /// - A non-empty remote result wins; a category whose read failed is
    ///   filled in from the cache.
    /// - Otherwise a non-empty cached scene wins and is pushed back to the
    ///   remote (best-effort), skipping categories whose read failed.
    /// - Otherwise the scene starts empty.
    ///
    /// # Errors
    /// - `SceneError::Cache` when the cached snapshot is malformed and no
    ///   remote data was returned. With remote data, the scene is adopted
    ///   and `LoadOutcome::cache_malformed` is set instead.
    pub async fn load(&self) -> Result<LoadOutcome, SceneError> {
        let _busy = BusyGuard::enter(&self.busy);
        let remote = self.sync.load_all().await;
        let remote_failed = remote.failed_categories();
        let known = remote.known_counts();
        let remote_elements = remote.elements();

        if !remote_elements.is_empty() {
            let mut cache_filled = Vec::new();
            let mut cache_malformed = false;
            let elements = if remote_failed.is_empty() {
                remote_elements
            } else {
                let cached = match self.cache.read() {
                    Ok(cached) => cached.unwrap_or_default(),
                    Err(err) => {
                        error!(
                            "event=scene_load module=controller status=error source=remote error_code=cache_malformed error={}",
                            err
                        );
                        cache_malformed = true;
                        Vec::new()
                    }
                };
                let mut merged = Vec::new();
                for category in Category::ALL {
                    match remote.get(category) {
                        Ok(fetched) => merged.extend(fetched.iter().cloned()),
                        Err(_) => {
                            let before = merged.len();
                            merged.extend(
                                cached
                                    .iter()
                                    .filter(|element| element.category() == category)
                                    .cloned(),
                            );
                            if merged.len() > before {
                                cache_filled.push(category);
                            }
                        }
                    }
                }
                merged
            };

            let snapshot = {
                let mut state = self.lock_state();
                state.scene = adopt(elements, "remote");
                for category in Category::ALL {
                    if let Some(count) = *known.get(category) {
                        state.remote_counts.set(category, count);
                    }
                }
                state.scene.as_slice().to_vec()
            };
            self.persist(&snapshot);

            info!(
                "event=scene_load module=controller status=ok source=remote elements={} cache_filled={}",
                snapshot.len(),
                cache_filled.len()
            );
            return Ok(LoadOutcome {
                source: LoadSource::Remote,
                element_count: snapshot.len(),
                remote_failed,
                cache_filled,
                push_status: None,
                cache_malformed,
            });
        }

        let cached = match self.cache.read() {
            Ok(cached) => cached.unwrap_or_default(),
            Err(err) => {
                error!(
                    "event=scene_load module=controller status=error source=cache error_code=cache_malformed error={}",
                    err
                );
                return Err(err.into());
            }
        };

        if cached.is_empty() {
            let mut state = self.lock_state();
            state.scene = Scene::new();
            for category in Category::ALL {
                if let Some(count) = *known.get(category) {
                    state.remote_counts.set(category, count);
                }
            }
            info!(
                "event=scene_load module=controller status=ok source=empty remote_failed={}",
                remote_failed.len()
            );
            return Ok(LoadOutcome {
                source: LoadSource::Empty,
                element_count: 0,
                remote_failed,
                cache_filled: Vec::new(),
                push_status: None,
                cache_malformed: false,
            });
        }

        let snapshot = {
            let mut state = self.lock_state();
            state.scene = adopt(cached, "cache");
            state.scene.as_slice().to_vec()
        };

        let pushed_ok = self.push_readable(&snapshot, &remote_failed).await;
        let pushed = count_by_category(&snapshot);
        {
            let mut state = self.lock_state();
            for category in &pushed_ok {
                state.remote_counts.set(*category, pushed.get(*category));
            }
        }
        let push_status = status_of(pushed_ok.len() == Category::ALL.len());

        info!(
            "event=scene_load module=controller status=ok source=cache elements={} push={}",
            snapshot.len(),
            push_status.as_str()
        );
        Ok(LoadOutcome {
            source: LoadSource::Cache,
            element_count: snapshot.len(),
            remote_failed,
            cache_filled: Vec::new(),
            push_status: Some(push_status),
            cache_malformed: false,
        })
    }

    /// Pushes `snapshot` to every category that was read successfully and
    /// returns the categories whose write succeeded.
    async fn push_readable(
        &self,
        snapshot: &[SceneElement],
        remote_failed: &[Category],
    ) -> Vec<Category> {
        if remote_failed.is_empty() {
            let report = self.sync.save_all(snapshot).await;
            return Category::ALL
                .into_iter()
                .filter(|category| report.get(*category).is_ok())
                .collect();
        }

        let mut pushed_ok = Vec::new();
        for category in Category::ALL {
            if remote_failed.contains(&category) {
                warn!(
                    "event=scene_push module=controller status=skip category={} reason=remote_unreadable",
                    category
                );
                continue;
            }
            if self.sync.save_category(category, snapshot).await.is_ok() {
                pushed_ok.push(category);
            }
        }
        pushed_ok
    }

    /// Adds a randomly generated element of `category`.
    ///
    /// The element is appended and cached before any remote I/O and stays in
    /// the scene whatever the remote outcome.
    pub async fn add(&self, category: Category) -> MutationReport {
        let element = SceneElement::random(category, &mut rand::thread_rng());

        let snapshot = {
            let mut state = self.lock_state();
            if let Err(err) = state.scene.push(element.clone()) {
                warn!(
                    "event=scene_add module=controller status=error error_code=duplicate_id error={}",
                    err
                );
            }
            state.scene.as_slice().to_vec()
        };
        self.persist(&snapshot);

        let result = self.sync.add_one(&element).await;
        let status = status_of(result.is_ok());
        {
            let mut state = self.lock_state();
            if let Ok(remote_count) = result {
                state.remote_counts.set(category, remote_count);
            }
            state.last_status = Some(status);
        }

        info!(
            "event=scene_add module=controller status=ok category={} element_id={} sync={}",
            category,
            element.id,
            status.as_str()
        );
        MutationReport {
            status,
            failed: if status == SyncStatus::Synced {
                Vec::new()
            } else {
                vec![category]
            },
            element: Some(element),
        }
    }

    /// Clears the remote collections, then the scene and the cache.
    ///
    /// The local clear happens even when the remote refuses, so the remote
    /// may keep stale elements afterwards.
    pub async fn clear(&self) -> MutationReport {
        let _busy = BusyGuard::enter(&self.busy);
        let report = self.sync.clear_all().await;
        let status = status_of(report.is_success());

        {
            let mut state = self.lock_state();
            state.scene.clear();
            for category in Category::ALL {
                if report.get(category).is_ok() {
                    state.remote_counts.set(category, 0);
                }
            }
            state.last_status = Some(status);
        }
        if let Err(err) = self.cache.clear() {
            error!(
                "event=cache_clear module=controller status=error error={}",
                err
            );
        }

        info!(
            "event=scene_clear module=controller status=ok sync={}",
            status.as_str()
        );
        MutationReport {
            status,
            element: None,
            failed: report.failed_categories(),
        }
    }

    /// Current scene in insertion order.
    pub fn elements(&self) -> Vec<SceneElement> {
        self.lock_state().scene.as_slice().to_vec()
    }

    /// True while `load` or `clear` is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst) > 0
    }

    pub fn local_counts(&self) -> CategoryCounts {
        self.lock_state().scene.counts()
    }

    /// Last known remote size per category.
    pub fn remote_counts(&self) -> CategoryCounts {
        self.lock_state().remote_counts
    }

    pub fn last_status(&self) -> Option<SyncStatus> {
        self.lock_state().last_status
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        let busy = self.is_busy();
        let state = self.lock_state();
        SceneSnapshot {
            elements: state.scene.as_slice().to_vec(),
            busy,
            local_counts: state.scene.counts(),
            remote_counts: state.remote_counts,
            last_status: state.last_status,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SceneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, elements: &[SceneElement]) {
        if let Err(err) = self.cache.write(elements) {
            error!(
                "event=cache_write module=controller status=error elements={} error={}",
                elements.len(),
                err
            );
        }
    }
}

fn status_of(synced: bool) -> SyncStatus {
    if synced {
        SyncStatus::Synced
    } else {
        SyncStatus::LocalOnly
    }
}

fn adopt(elements: Vec<SceneElement>, source: &str) -> Scene {
    let (scene, dropped) = Scene::from_elements(elements);
    if dropped > 0 {
        warn!(
            "event=scene_adopt module=controller status=ok source={} dropped_duplicates={}",
            source, dropped
        );
    }
    scene
}
