mod support;

use rusqlite::params;
use skyscene_core::db::open_db_in_memory;
use skyscene_core::{
    Category, CategoryCounts, LoadSource, SceneCache, SceneController, SceneError,
    SqliteSceneCache, SyncStatus,
};
use support::{elements, empty_remote, ids, remote_with, Remote};

fn controller(remote: &Remote) -> SceneController<SqliteSceneCache> {
    SceneController::new(
        remote.sync.clone(),
        SqliteSceneCache::open_in_memory().unwrap(),
    )
}

#[tokio::test]
async fn load_adopts_non_empty_remote_and_caches_it() {
    let birds = elements(Category::Bird, 1, 1);
    let clouds = elements(Category::Cloud, 2, 2);
    let remote = remote_with(birds.clone(), clouds.clone());
    let controller = controller(&remote);
    controller
        .cache()
        .write(&elements(Category::Bird, 4, 3))
        .unwrap();

    let outcome = controller.load().await.unwrap();
    assert_eq!(outcome.source, LoadSource::Remote);
    assert_eq!(outcome.element_count, 3);
    assert!(outcome.remote_failed.is_empty());

    let mut expected = ids(&birds);
    expected.extend(ids(&clouds));
    assert_eq!(ids(&controller.elements()), expected);
    assert_eq!(ids(&controller.cache().read().unwrap().unwrap()), expected);
    assert_eq!(
        controller.remote_counts(),
        CategoryCounts {
            birds: 1,
            clouds: 2
        }
    );
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn load_falls_back_to_cache_and_pushes_it_when_remote_is_empty() {
    let remote = empty_remote();
    let controller = controller(&remote);
    let cached_bird = elements(Category::Bird, 1, 4);
    controller.cache().write(&cached_bird).unwrap();

    let outcome = controller.load().await.unwrap();
    assert_eq!(outcome.source, LoadSource::Cache);
    assert_eq!(outcome.push_status, Some(SyncStatus::Synced));
    assert_eq!(controller.elements(), cached_bird);
    assert_eq!(controller.elements().len(), 1);
    assert_eq!(remote.birds.contents(), cached_bird);
    assert_eq!(controller.remote_counts().birds, 1);
}

#[tokio::test]
async fn load_falls_back_to_cache_when_remote_is_unreachable() {
    let remote = empty_remote();
    remote.birds.go_offline();
    remote.clouds.go_offline();
    let controller = controller(&remote);
    let cached = elements(Category::Cloud, 2, 5);
    controller.cache().write(&cached).unwrap();

    let outcome = controller.load().await.unwrap();
    assert_eq!(outcome.source, LoadSource::Cache);
    assert_eq!(outcome.remote_failed, Category::ALL.to_vec());
    assert_eq!(outcome.push_status, Some(SyncStatus::LocalOnly));
    assert_eq!(controller.elements(), cached);
    assert_eq!(controller.remote_counts(), CategoryCounts::default());
}

#[tokio::test]
async fn load_fills_failed_category_from_cache() {
    let remote_clouds = elements(Category::Cloud, 1, 6);
    let remote = remote_with(Vec::new(), remote_clouds.clone());
    remote.birds.fail_fetch(true);
    let controller = controller(&remote);

    let cached_birds = elements(Category::Bird, 2, 7);
    let mut cached = cached_birds.clone();
    cached.extend(elements(Category::Cloud, 1, 8));
    controller.cache().write(&cached).unwrap();

    let outcome = controller.load().await.unwrap();
    assert_eq!(outcome.source, LoadSource::Remote);
    assert_eq!(outcome.cache_filled, vec![Category::Bird]);

    let mut expected = ids(&cached_birds);
    expected.extend(ids(&remote_clouds));
    assert_eq!(ids(&controller.elements()), expected);
    assert_eq!(controller.remote_counts().clouds, 1);
    assert_eq!(controller.remote_counts().birds, 0);
}

#[tokio::test]
async fn load_starts_empty_when_nothing_is_stored() {
    let remote = empty_remote();
    let controller = controller(&remote);

    let outcome = controller.load().await.unwrap();
    assert_eq!(outcome.source, LoadSource::Empty);
    assert!(controller.elements().is_empty());
    assert_eq!(remote.birds.save_calls(), 0);
    assert!(controller.cache().read().unwrap().is_none());
}

#[tokio::test]
async fn load_surfaces_malformed_cache() {
    let remote = empty_remote();
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO cache_slots (slot, payload) VALUES (?1, ?2);",
        params!["skyElements", "[{\"id\":1}]"],
    )
    .unwrap();
    let controller = SceneController::new(
        remote.sync.clone(),
        SqliteSceneCache::new(conn, "skyElements"),
    );

    let err = controller.load().await.unwrap_err();
    assert!(matches!(err, SceneError::Cache(_)));
    assert!(controller.elements().is_empty());
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn load_keeps_remote_half_when_cache_is_malformed() {
    let remote_clouds = elements(Category::Cloud, 2, 21);
    let remote = remote_with(Vec::new(), remote_clouds.clone());
    remote.birds.fail_fetch(true);
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO cache_slots (slot, payload) VALUES (?1, ?2);",
        params!["skyElements", "{not json"],
    )
    .unwrap();
    let controller = SceneController::new(
        remote.sync.clone(),
        SqliteSceneCache::new(conn, "skyElements"),
    );

    let outcome = controller.load().await.unwrap();
    assert_eq!(outcome.source, LoadSource::Remote);
    assert!(outcome.cache_malformed);
    assert!(outcome.cache_filled.is_empty());
    assert_eq!(outcome.remote_failed, vec![Category::Bird]);
    assert_eq!(controller.elements(), remote_clouds);
    assert_eq!(controller.remote_counts().clouds, 2);
}

#[tokio::test]
async fn load_push_skips_category_that_could_not_be_read() {
    let remote_birds = elements(Category::Bird, 3, 22);
    let remote = remote_with(remote_birds.clone(), Vec::new());
    remote.birds.fail_fetch(true);
    let controller = controller(&remote);

    let mut cached = elements(Category::Bird, 1, 23);
    cached.extend(elements(Category::Cloud, 2, 24));
    controller.cache().write(&cached).unwrap();

    let outcome = controller.load().await.unwrap();
    assert_eq!(outcome.source, LoadSource::Cache);
    assert_eq!(outcome.push_status, Some(SyncStatus::LocalOnly));
    assert_eq!(controller.elements(), cached);

    assert_eq!(remote.birds.save_calls(), 0);
    assert_eq!(remote.birds.contents(), remote_birds);
    assert_eq!(ids(&remote.clouds.contents()), ids(&cached[1..]));
    assert_eq!(
        controller.remote_counts(),
        CategoryCounts {
            birds: 0,
            clouds: 2
        }
    );
}

#[tokio::test]
async fn add_writes_through_to_remote_and_cache() {
    let remote = empty_remote();
    let controller = controller(&remote);
    controller.load().await.unwrap();

    let report = controller.add(Category::Cloud).await;
    assert_eq!(report.status, SyncStatus::Synced);
    assert!(report.failed.is_empty());
    let cloud = report.element.unwrap();
    assert_eq!(cloud.category(), Category::Cloud);

    assert_eq!(controller.elements(), vec![cloud.clone()]);
    assert_eq!(controller.cache().read().unwrap(), Some(vec![cloud.clone()]));
    assert_eq!(remote.clouds.contents(), vec![cloud]);
    assert_eq!(remote.birds.save_calls(), 0);
    assert_eq!(controller.remote_counts().clouds, 1);
    assert_eq!(controller.last_status(), Some(SyncStatus::Synced));
}

#[tokio::test]
async fn add_bird_while_remote_save_fails_stays_local() {
    let remote_birds = elements(Category::Bird, 2, 9);
    let remote = remote_with(remote_birds.clone(), Vec::new());
    let controller = controller(&remote);
    controller.load().await.unwrap();
    assert_eq!(controller.remote_counts().birds, 2);

    remote.birds.fail_save(true);
    let report = controller.add(Category::Bird).await;
    assert_eq!(report.status, SyncStatus::LocalOnly);
    assert_eq!(report.failed, vec![Category::Bird]);
    let bird = report.element.unwrap();

    assert_eq!(controller.elements().len(), 3);
    assert_eq!(controller.elements().last(), Some(&bird));
    let cached = controller.cache().read().unwrap().unwrap();
    assert!(cached.iter().any(|element| element.id == bird.id));
    assert_eq!(remote.birds.contents(), remote_birds);
    assert_eq!(controller.remote_counts().birds, 2);
    assert_eq!(controller.last_status(), Some(SyncStatus::LocalOnly));
}

#[tokio::test]
async fn clear_with_remote_success_resets_everything() {
    let remote = remote_with(elements(Category::Bird, 2, 10), elements(Category::Cloud, 3, 11));
    let controller = controller(&remote);
    controller.load().await.unwrap();
    controller.add(Category::Bird).await;

    let report = controller.clear().await;
    assert_eq!(report.status, SyncStatus::Synced);
    assert!(controller.elements().is_empty());
    assert!(controller.cache().read().unwrap().is_none());
    assert_eq!(controller.remote_counts(), CategoryCounts::default());
    assert!(remote.birds.contents().is_empty());
    assert!(remote.clouds.contents().is_empty());
}

#[tokio::test]
async fn clear_is_applied_locally_even_when_remote_refuses() {
    let remote = remote_with(elements(Category::Bird, 1, 12), elements(Category::Cloud, 1, 13));
    let controller = controller(&remote);
    controller.load().await.unwrap();
    remote.clouds.fail_clear(true);

    let report = controller.clear().await;
    assert_eq!(report.status, SyncStatus::LocalOnly);
    assert_eq!(report.failed, vec![Category::Cloud]);
    assert!(controller.elements().is_empty());
    assert!(controller.cache().read().unwrap().is_none());
    assert_eq!(
        controller.remote_counts(),
        CategoryCounts {
            birds: 0,
            clouds: 1
        }
    );
    assert_eq!(remote.clouds.contents().len(), 1);
}

#[tokio::test]
async fn element_count_tracks_adds_and_clears_regardless_of_remote() {
    let remote = empty_remote();
    let controller = controller(&remote);
    controller.load().await.unwrap();

    let steps: [(Option<Category>, bool); 7] = [
        (Some(Category::Bird), true),
        (Some(Category::Cloud), false),
        (None, false),
        (Some(Category::Cloud), true),
        (Some(Category::Bird), false),
        (Some(Category::Bird), true),
        (None, true),
    ];
    let mut expected = 0;
    for (command, online) in steps {
        for store in [&remote.birds, &remote.clouds] {
            if online {
                store.fail_fetch(false);
                store.fail_save(false);
                store.fail_clear(false);
            } else {
                store.go_offline();
            }
        }
        match command {
            Some(category) => {
                controller.add(category).await;
                expected += 1;
            }
            None => {
                controller.clear().await;
                expected = 0;
            }
        }
        assert_eq!(controller.elements().len(), expected);
        assert_eq!(controller.local_counts().total(), expected);
    }
}

#[tokio::test]
async fn element_is_visible_before_remote_write_completes() {
    let remote = empty_remote();
    let controller = controller(&remote);
    controller.load().await.unwrap();

    // Polled right after `add` parks on its first remote call.
    let observe = async { controller.snapshot() };
    let (report, observed) = tokio::join!(controller.add(Category::Bird), observe);

    assert_eq!(observed.elements.len(), 1);
    assert_eq!(observed.local_counts.birds, 1);
    assert_eq!(observed.remote_counts.birds, 0);
    assert_eq!(report.status, SyncStatus::Synced);
    assert_eq!(controller.snapshot().remote_counts.birds, 1);
}

#[tokio::test]
async fn busy_flag_is_set_while_clear_is_in_flight() {
    let remote = empty_remote();
    let controller = controller(&remote);

    let observe = async { controller.is_busy() };
    let (_, busy_during) = tokio::join!(controller.clear(), observe);

    assert!(busy_during);
    assert!(!controller.is_busy());
}
