//! Aggregating sync service over the bird and cloud adapters.
//!
//! # Responsibility
//! - Present both category collections as one logical scene store.
//! - Fan requests out per category and fan the results back in.
//!
//! # Invariants
//! - Both category calls of one operation run concurrently.
//! - Results keep per-category detail; `is_success()` is the AND of both.
//! - `add_one` touches only the element's own category.
//! - No retries, no transactions: a partial write stays partially applied.

use crate::model::element::{Category, SceneElement};
use crate::model::scene::{partition_by_category, CategoryCounts};
use crate::remote::{CategoryStore, RemoteError, RemoteResult};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Adapter wiring error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncSetupError {
    CategoryMismatch { expected: Category, found: Category },
}

impl Display for SyncSetupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CategoryMismatch { expected, found } => {
                write!(f, "expected a {expected} adapter, got a {found} adapter")
            }
        }
    }
}

impl Error for SyncSetupError {}

/// Per-category pair of results.
#[derive(Debug, Clone, PartialEq)]
pub struct PerCategory<T> {
    pub birds: T,
    pub clouds: T,
}

impl<T> PerCategory<T> {
    pub fn get(&self, category: Category) -> &T {
        match category {
            Category::Bird => &self.birds,
            Category::Cloud => &self.clouds,
        }
    }
}

/// Outcome of `load_all`.
pub type SceneLoad = PerCategory<RemoteResult<Vec<SceneElement>>>;

/// Outcome of `save_all` / `clear_all`.
pub type SyncReport = PerCategory<RemoteResult<()>>;

impl SceneLoad {
    /// Concatenation of the successful halves, birds first.
    pub fn elements(&self) -> Vec<SceneElement> {
        Category::ALL
            .into_iter()
            .filter_map(|category| self.get(category).as_ref().ok())
            .flatten()
            .cloned()
            .collect()
    }

    pub fn failed_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|category| self.get(*category).is_err())
            .collect()
    }

    /// Whether every category was read successfully.
    pub fn is_complete(&self) -> bool {
        self.birds.is_ok() && self.clouds.is_ok()
    }

    /// Counts of the categories that were read successfully.
    pub fn known_counts(&self) -> PerCategory<Option<usize>> {
        PerCategory {
            birds: self.birds.as_ref().ok().map(Vec::len),
            clouds: self.clouds.as_ref().ok().map(Vec::len),
        }
    }
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.birds.is_ok() && self.clouds.is_ok()
    }

    pub fn failed_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|category| self.get(*category).is_err())
            .collect()
    }

    /// First error in merge order, if any.
    pub fn first_error(&self) -> Option<&RemoteError> {
        self.birds.as_ref().err().or(self.clouds.as_ref().err())
    }
}

/// Logical store over both category adapters.
#[derive(Clone)]
pub struct SceneSync {
    birds: Arc<dyn CategoryStore>,
    clouds: Arc<dyn CategoryStore>,
}

impl SceneSync {
    /// Composes the two adapters.
    ///
    /// # Errors
    /// - `CategoryMismatch` when an adapter serves the wrong category.
    pub fn new(
        birds: Arc<dyn CategoryStore>,
        clouds: Arc<dyn CategoryStore>,
    ) -> Result<Self, SyncSetupError> {
        for (expected, store) in [(Category::Bird, &birds), (Category::Cloud, &clouds)] {
            let found = store.category();
            if found != expected {
                return Err(SyncSetupError::CategoryMismatch { expected, found });
            }
        }
        Ok(Self { birds, clouds })
    }

    fn store(&self, category: Category) -> &Arc<dyn CategoryStore> {
        match category {
            Category::Bird => &self.birds,
            Category::Cloud => &self.clouds,
        }
    }

    /// Reads both collections concurrently.
    pub async fn load_all(&self) -> SceneLoad {
        let (birds, clouds) = tokio::join!(self.birds.fetch_all(), self.clouds.fetch_all());
        let load = SceneLoad { birds, clouds };

        let counts = load.known_counts();
        info!(
            "event=sync_load module=sync status={} birds={} clouds={}",
            if load.is_complete() { "ok" } else { "partial" },
            count_field(counts.birds),
            count_field(counts.clouds)
        );
        load
    }

    /// Replaces both collections with the matching part of `elements`.
    pub async fn save_all(&self, elements: &[SceneElement]) -> SyncReport {
        let (birds, clouds) = partition_by_category(elements);
        let (bird_result, cloud_result) =
            tokio::join!(self.birds.save_all(&birds), self.clouds.save_all(&clouds));
        let report = SyncReport {
            birds: bird_result,
            clouds: cloud_result,
        };
        log_report("sync_save", &report, count_pair(birds.len(), clouds.len()));
        report
    }

    /// Replaces one collection with the `category` part of `elements`,
    /// leaving the other collection alone.
    pub async fn save_category(
        &self,
        category: Category,
        elements: &[SceneElement],
    ) -> RemoteResult<()> {
        let part: Vec<SceneElement> = elements
            .iter()
            .filter(|element| element.category() == category)
            .cloned()
            .collect();
        let result = self.store(category).save_all(&part).await;
        match &result {
            Ok(()) => info!(
                "event=sync_save module=sync status=ok category={} elements={}",
                category,
                part.len()
            ),
            Err(err) => warn!(
                "event=sync_save module=sync status=error category={} error_code={}",
                category,
                err.code()
            ),
        }
        result
    }

    /// Empties both collections.
    pub async fn clear_all(&self) -> SyncReport {
        let (birds, clouds) = tokio::join!(self.birds.clear_all(), self.clouds.clear_all());
        let report = SyncReport { birds, clouds };
        log_report("sync_clear", &report, CategoryCounts::default());
        report
    }

    /// Appends one element to its category collection.
    ///
    /// Returns the new remote size of that category. A failed read aborts
    /// before any write so an unreadable collection is never overwritten.
    /// An id already present remotely is not appended twice.
    pub async fn add_one(&self, element: &SceneElement) -> RemoteResult<usize> {
        let category = element.category();
        let store = self.store(category);

        let mut current = store.fetch_all().await.map_err(|err| {
            warn!(
                "event=sync_add module=sync status=error stage=fetch category={} element_id={} error_code={}",
                category,
                element.id,
                err.code()
            );
            err
        })?;
        if !current.iter().any(|existing| existing.id == element.id) {
            current.push(element.clone());
        }

        match store.save_all(&current).await {
            Ok(()) => {
                info!(
                    "event=sync_add module=sync status=ok category={} element_id={} remote_count={}",
                    category,
                    element.id,
                    current.len()
                );
                Ok(current.len())
            }
            Err(err) => {
                warn!(
                    "event=sync_add module=sync status=error stage=save category={} element_id={} error_code={}",
                    category,
                    element.id,
                    err.code()
                );
                Err(err)
            }
        }
    }
}

fn count_pair(birds: usize, clouds: usize) -> CategoryCounts {
    CategoryCounts { birds, clouds }
}

fn count_field(count: Option<usize>) -> String {
    count.map_or_else(|| "error".to_string(), |value| value.to_string())
}

fn log_report(event: &str, report: &SyncReport, sent: CategoryCounts) {
    if report.is_success() {
        info!(
            "event={} module=sync status=ok birds={} clouds={}",
            event, sent.birds, sent.clouds
        );
        return;
    }
    let failed: Vec<&str> = report
        .failed_categories()
        .into_iter()
        .map(Category::as_str)
        .collect();
    warn!(
        "event={} module=sync status=partial failed={} error_code={}",
        event,
        failed.join(","),
        report.first_error().map_or("none", RemoteError::code)
    );
}
