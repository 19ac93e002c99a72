#![allow(dead_code)]

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use skyscene_core::{Category, CategoryStore, RemoteError, RemoteResult, SceneElement, SceneSync};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-process category store with failure switches.
pub struct FakeStore {
    category: Category,
    contents: Mutex<Vec<SceneElement>>,
    fail_fetch: AtomicBool,
    fail_save: AtomicBool,
    fail_clear: AtomicBool,
    fetch_calls: AtomicUsize,
    save_calls: AtomicUsize,
    clear_calls: AtomicUsize,
}

impl FakeStore {
    pub fn new(category: Category) -> Arc<Self> {
        Self::with_contents(category, Vec::new())
    }

    pub fn with_contents(category: Category, contents: Vec<SceneElement>) -> Arc<Self> {
        Arc::new(Self {
            category,
            contents: Mutex::new(contents),
            fail_fetch: AtomicBool::new(false),
            fail_save: AtomicBool::new(false),
            fail_clear: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
            save_calls: AtomicUsize::new(0),
            clear_calls: AtomicUsize::new(0),
        })
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn fail_clear(&self, fail: bool) {
        self.fail_clear.store(fail, Ordering::SeqCst);
    }

    /// Makes every call fail as if the server were down.
    pub fn go_offline(&self) {
        self.fail_fetch(true);
        self.fail_save(true);
        self.fail_clear(true);
    }

    pub fn contents(&self) -> Vec<SceneElement> {
        self.contents.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CategoryStore for FakeStore {
    fn category(&self) -> Category {
        self.category
    }

    async fn fetch_all(&self) -> RemoteResult<Vec<SceneElement>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection refused".to_string()));
        }
        Ok(self.contents())
    }

    async fn save_all(&self, elements: &[SceneElement]) -> RemoteResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                code: 503,
                reason: "Service Unavailable".to_string(),
            });
        }
        *self.contents.lock().unwrap() = elements.to_vec();
        Ok(())
    }

    async fn clear_all(&self) -> RemoteResult<()> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected("clear refused".to_string()));
        }
        self.contents.lock().unwrap().clear();
        Ok(())
    }
}

pub struct Remote {
    pub birds: Arc<FakeStore>,
    pub clouds: Arc<FakeStore>,
    pub sync: SceneSync,
}

pub fn remote_with(birds: Vec<SceneElement>, clouds: Vec<SceneElement>) -> Remote {
    let birds = FakeStore::with_contents(Category::Bird, birds);
    let clouds = FakeStore::with_contents(Category::Cloud, clouds);
    let sync = SceneSync::new(birds.clone(), clouds.clone()).unwrap();
    Remote {
        birds,
        clouds,
        sync,
    }
}

pub fn empty_remote() -> Remote {
    remote_with(Vec::new(), Vec::new())
}

pub fn elements(category: Category, count: usize, seed: u64) -> Vec<SceneElement> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| SceneElement::random(category, &mut rng))
        .collect()
}

pub fn ids(elements: &[SceneElement]) -> Vec<skyscene_core::ElementId> {
    elements.iter().map(|element| element.id).collect()
}
