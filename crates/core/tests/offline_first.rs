//! Offline-first integration tests.
//!
//! These tests exercise the full reconciliation stack against a file-backed
//! cache:
//! - A cache filled while online keeps serving after a restart while offline
//! - Search falls back to cached titles when the network goes away
//! - History survives restarts and stays bounded
//! - A coordinator over the same stack follows connectivity changes

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tempfile::TempDir;
use tokio::sync::watch;

use cinecache_core::{
    testing::{fixtures::movie_dto, MockConnectivity, MockMovieSource},
    CoordinatorConfig, CoordinatorPhase, ListState, MovieRepository, QueryCoordinator,
    RepositoryConfig, Resource, SearchHistory, SqliteCache,
};

/// Test helper wiring a repository over a cache file.
struct TestHarness {
    repository: MovieRepository,
    history: SearchHistory,
    source: Arc<MockMovieSource>,
    connectivity: Arc<MockConnectivity>,
}

impl TestHarness {
    fn open(dir: &TempDir, online: bool) -> Self {
        let cache = Arc::new(
            SqliteCache::new(&dir.path().join("cache.db")).expect("Failed to open cache"),
        );
        let source = Arc::new(MockMovieSource::new());
        let connectivity = Arc::new(MockConnectivity::new(online));
        let repository = MovieRepository::new(
            source.clone(),
            cache.clone(),
            connectivity.clone(),
            RepositoryConfig::default(),
        );
        let history = SearchHistory::new(cache, 3);

        Self {
            repository,
            history,
            source,
            connectivity,
        }
    }
}

async fn wait_until(
    rx: &mut watch::Receiver<ListState>,
    predicate: impl FnMut(&ListState) -> bool,
) -> ListState {
    tokio::time::timeout(Duration::from_secs(10), rx.wait_for(predicate))
        .await
        .expect("state never matched")
        .expect("state channel closed")
        .clone()
}

fn titles(resource: &Resource<Vec<cinecache_core::Movie>>) -> Vec<String> {
    resource
        .data()
        .map(|movies| movies.iter().map(|m| m.title.clone()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_cache_survives_restart_offline() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    {
        let online = TestHarness::open(&dir, true);
        online
            .source
            .set_trending(vec![
                movie_dto(1, "Dune: Part Two", 90.0),
                movie_dto(2, "Oppenheimer", 80.0),
            ])
            .await;
        let emissions: Vec<_> = online.repository.fetch_trending(false).collect().await;
        assert_eq!(titles(emissions.last().unwrap()), vec!["Dune: Part Two", "Oppenheimer"]);
    }

    let offline = TestHarness::open(&dir, false);

    let trending: Vec<_> = offline.repository.fetch_trending(false).collect().await;
    assert_eq!(trending.len(), 2);
    assert!(trending[0].is_loading());
    assert_eq!(titles(&trending[1]), vec!["Dune: Part Two", "Oppenheimer"]);

    let search: Vec<_> = offline.repository.search("dune").collect().await;
    assert_eq!(titles(&search[1]), vec!["Dune: Part Two"]);
    assert_eq!(offline.source.call_count().await, 0);

    assert_eq!(
        offline.repository.get_by_id(2).unwrap().unwrap().title,
        "Oppenheimer"
    );
}

#[tokio::test]
async fn test_search_results_feed_offline_fallback() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let harness = TestHarness::open(&dir, true);
    harness
        .source
        .set_catalog(vec![
            movie_dto(10, "Heat", 30.0),
            movie_dto(11, "Heat Wave", 5.0),
        ])
        .await;

    let online: Vec<_> = harness.repository.search("heat").collect().await;
    assert_eq!(titles(&online[1]), vec!["Heat", "Heat Wave"]);

    harness.connectivity.set_online(false);
    let offline: Vec<_> = harness.repository.search("wave").collect().await;
    assert_eq!(titles(&offline[1]), vec!["Heat Wave"]);

    let missing: Vec<_> = harness.repository.search("alien").collect().await;
    assert_eq!(
        missing[1].error_message(),
        Some("offline, results may be limited")
    );
}

#[tokio::test]
async fn test_history_is_bounded_across_restarts() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    {
        let harness = TestHarness::open(&dir, true);
        for query in ["alien", "brazil", "casablanca", "dune", "eraserhead"] {
            harness.history.save_search(query).unwrap();
        }
    }

    let harness = TestHarness::open(&dir, true);
    let queries: Vec<String> = harness
        .history
        .get_recent(10)
        .unwrap()
        .into_iter()
        .map(|r| r.query)
        .collect();
    assert_eq!(queries, vec!["eraserhead", "dune", "casablanca"]);
}

#[tokio::test(start_paused = true)]
async fn test_coordinator_goes_offline_and_recovers() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let harness = TestHarness::open(&dir, true);
    harness
        .source
        .set_trending(vec![movie_dto(1, "Dune: Part Two", 90.0)])
        .await;

    let coordinator = QueryCoordinator::new(
        harness.repository.clone(),
        harness.history.clone(),
        harness.connectivity.clone(),
        CoordinatorConfig::default(),
    );
    let mut rx = coordinator.subscribe();
    coordinator.start();

    let state = wait_until(&mut rx, |s| !s.movies.is_empty()).await;
    assert_eq!(state.movies[0].title, "Dune: Part Two");

    harness.connectivity.set_online(false);
    wait_until(&mut rx, |s| s.is_offline).await;

    // Offline search served from the trending rows already cached.
    coordinator.on_query_changed("dune");
    tokio::time::sleep(Duration::from_millis(400)).await;
    let state = wait_until(&mut rx, |s| {
        s.phase == CoordinatorPhase::Searching && !s.is_searching
    })
    .await;
    assert_eq!(state.movies.len(), 1);
    assert!(state.error.is_none());

    harness.connectivity.set_online(true);
    let state = wait_until(&mut rx, |s| !s.is_offline).await;
    assert_eq!(state.query, "dune");

    coordinator.shutdown();
}
