use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::RepositoryError;
use crate::cache::MovieCache;
use crate::connectivity::ConnectivityMonitor;
use crate::metrics;
use crate::movie::{CachedMovie, Movie, MoviePage};
use crate::remote::{MovieSource, RemoteError, SearchParams};
use crate::resource::Resource;

/// Stream of envelopes produced by one repository call.
pub type MovieStream = BoxStream<'static, Resource<Vec<Movie>>>;

/// Repository settings.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Language passed to the remote source.
    pub language: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
        }
    }
}

/// Offline-first movie repository.
///
/// Cheap to clone; clones share the source, cache and connectivity monitor.
#[derive(Clone)]
pub struct MovieRepository {
    source: Arc<dyn MovieSource>,
    cache: Arc<dyn MovieCache>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    config: RepositoryConfig,
    /// Bumped after every cache write made through this repository.
    changes: Arc<watch::Sender<u64>>,
}

enum TrendingStep {
    Start,
    ReadCache,
    /// `cached` is the trending partition as read; `shown` is whether it has
    /// already been emitted.
    Reconcile { cached: Vec<Movie>, shown: bool },
    Done,
}

enum SearchStep {
    Start,
    Query,
    Done,
}

impl MovieRepository {
    pub fn new(
        source: Arc<dyn MovieSource>,
        cache: Arc<dyn MovieCache>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        config: RepositoryConfig,
    ) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            source,
            cache,
            connectivity,
            config,
            changes: Arc::new(changes),
        }
    }

    /// Trending movies: cached list first (unless `force_refresh`), then the
    /// refreshed list when online.
    ///
    /// Ends with the last `Success` or a single `Error`; never emits `Error`
    /// after `Success`.
    pub fn fetch_trending(&self, force_refresh: bool) -> MovieStream {
        let repo = self.clone();
        stream::unfold(TrendingStep::Start, move |step| {
            let repo = repo.clone();
            async move { repo.trending_step(step, force_refresh).await }
        })
        .boxed()
    }

    /// Free-text search: remote first, local title match as fallback.
    ///
    /// A blank query yields a single empty `Success`.
    pub fn search(&self, query: &str) -> MovieStream {
        let query = query.trim().to_string();
        if query.is_empty() {
            return stream::once(async { Resource::success(Vec::new()) }).boxed();
        }

        let repo = self.clone();
        stream::unfold(SearchStep::Start, move |step| {
            let repo = repo.clone();
            let query = query.clone();
            async move { repo.search_step(step, &query).await }
        })
        .boxed()
    }

    /// Cached movie by id. Never touches the network.
    pub fn get_by_id(&self, id: i64) -> Result<Option<Movie>, RepositoryError> {
        Ok(self.cache.get_by_id(id)?.map(Movie::from))
    }

    /// A cached movie, yielded now and again whenever a cache write through
    /// this repository changes it. `None` while it is not cached.
    pub fn observe_by_id(&self, id: i64) -> BoxStream<'static, Option<Movie>> {
        let repo = self.clone();
        let rx = self.changes.subscribe();

        stream::unfold((rx, None), move |(mut rx, last): (_, Option<Option<Movie>>)| {
            let repo = repo.clone();
            async move {
                loop {
                    if last.is_some() && rx.changed().await.is_err() {
                        return None;
                    }
                    rx.borrow_and_update();

                    let current = match repo.get_by_id(id) {
                        Ok(movie) => movie,
                        Err(e) => {
                            warn!(error = %e, id, "Failed to read cached movie");
                            None
                        }
                    };
                    if last.as_ref() != Some(&current) {
                        return Some((current.clone(), (rx, Some(current))));
                    }
                }
            }
        })
        .boxed()
    }

    /// Remove movies cached more than `max_age` ago. Returns the number
    /// removed.
    pub fn evict_older_than(&self, max_age: chrono::Duration) -> Result<usize, RepositoryError> {
        let cutoff = Utc::now() - max_age;
        let removed = self.cache.delete_older_than(cutoff)?;
        if removed > 0 {
            info!(removed, %cutoff, "Evicted stale cached movies");
            metrics::EVICTED_ROWS.inc_by(removed as u64);
            self.notify();
        }
        Ok(removed)
    }

    /// Remove every cached movie.
    pub fn clear_cache(&self) -> Result<(), RepositoryError> {
        self.cache.delete_all()?;
        self.notify();
        info!("Cleared movie cache");
        Ok(())
    }

    // =========================================================================
    // Trending
    // =========================================================================

    async fn trending_step(
        &self,
        mut step: TrendingStep,
        force_refresh: bool,
    ) -> Option<(Resource<Vec<Movie>>, TrendingStep)> {
        loop {
            step = match step {
                TrendingStep::Start => return Some((Resource::Loading, TrendingStep::ReadCache)),
                TrendingStep::ReadCache => {
                    let cached = self.read_trending();
                    if !cached.is_empty() && !force_refresh {
                        debug!(count = cached.len(), "Serving cached trending movies");
                        metrics::CACHE_HITS.inc();
                        return Some((
                            Resource::success(cached.clone()),
                            TrendingStep::Reconcile {
                                cached,
                                shown: true,
                            },
                        ));
                    }
                    TrendingStep::Reconcile {
                        cached,
                        shown: false,
                    }
                }
                TrendingStep::Reconcile { cached, shown } => {
                    let emission = if self.connectivity.is_online() {
                        self.refresh_trending(shown).await
                    } else {
                        offline_trending(cached, shown)
                    };
                    return emission.map(|resource| (resource, TrendingStep::Done));
                }
                TrendingStep::Done => return None,
            };
        }
    }

    async fn refresh_trending(&self, shown: bool) -> Option<Resource<Vec<Movie>>> {
        let started = Instant::now();
        let result = self.source.fetch_trending(&self.config.language).await;
        record_remote("trending", started, result.is_ok());

        let page = match result {
            Ok(page) => page,
            Err(e) if shown => {
                warn!(error = %e, "Trending refresh failed, keeping cached list");
                metrics::SUPPRESSED_FAILURES.inc();
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Trending refresh failed");
                record_outcome("trending", "error");
                return Some(Resource::from_error(e.into()));
            }
        };

        let fetched = rows(page, true);
        if let Err(e) = self.cache.replace_trending(&fetched) {
            warn!(error = %e, "Failed to store trending movies");
            record_outcome("trending", "network");
            return Some(Resource::success(by_popularity(fetched)));
        }
        self.notify();

        let fresh = match self.cache.get_trending() {
            Ok(rows) => rows.into_iter().map(Movie::from).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to re-read trending movies");
                by_popularity(fetched)
            }
        };

        info!(count = fresh.len(), "Refreshed trending movies");
        record_outcome("trending", "network");
        Some(Resource::success(fresh))
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    fn read_trending(&self) -> Vec<Movie> {
        match self.cache.get_trending() {
            Ok(rows) => rows.into_iter().map(Movie::from).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to read trending cache, treating as empty");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Search
    // =========================================================================

    async fn search_step(
        &self,
        step: SearchStep,
        query: &str,
    ) -> Option<(Resource<Vec<Movie>>, SearchStep)> {
        match step {
            SearchStep::Start => Some((Resource::Loading, SearchStep::Query)),
            SearchStep::Query => {
                let resource = if self.connectivity.is_online() {
                    self.search_online(query).await
                } else {
                    self.search_offline(query)
                };
                Some((resource, SearchStep::Done))
            }
            SearchStep::Done => None,
        }
    }

    async fn search_online(&self, query: &str) -> Resource<Vec<Movie>> {
        let params = SearchParams::new(query, self.config.language.clone());
        let started = Instant::now();
        let result = self.source.search_movies(&params).await;
        record_remote("search", started, result.is_ok());

        match result {
            Ok(page) => {
                let fetched = rows(page, false);
                match self.cache.insert_all(&fetched) {
                    Ok(()) => self.notify(),
                    Err(e) => warn!(error = %e, query, "Failed to cache search results"),
                }
                debug!(count = fetched.len(), query, "Remote search succeeded");
                record_outcome("search", "network");
                Resource::success(fetched.into_iter().map(Movie::from).collect())
            }
            Err(e) => self.search_fallback(query, e),
        }
    }

    fn search_fallback(&self, query: &str, cause: RemoteError) -> Resource<Vec<Movie>> {
        let local = self.search_local(query);
        if local.is_empty() {
            warn!(error = %cause, query, "Remote search failed with no local matches");
            record_outcome("search", "error");
            return Resource::from_error(cause.into());
        }

        info!(
            error = %cause,
            query,
            count = local.len(),
            "Remote search failed, serving local matches"
        );
        record_outcome("search", "cache");
        Resource::success(local)
    }

    fn search_offline(&self, query: &str) -> Resource<Vec<Movie>> {
        let local = self.search_local(query);
        if local.is_empty() {
            record_outcome("search", "error");
            return Resource::from_error(RepositoryError::NoConnectivityLimitedResults);
        }
        debug!(count = local.len(), query, "Offline search served from cache");
        record_outcome("search", "cache");
        Resource::success(local)
    }

    fn search_local(&self, query: &str) -> Vec<Movie> {
        match self.cache.search_by_title(query) {
            Ok(rows) => rows.into_iter().map(Movie::from).collect(),
            Err(e) => {
                warn!(error = %e, query, "Local search failed, treating as no matches");
                Vec::new()
            }
        }
    }
}

fn offline_trending(cached: Vec<Movie>, shown: bool) -> Option<Resource<Vec<Movie>>> {
    if shown {
        debug!("Offline, cached trending list stands");
        record_outcome("trending", "cache");
        return None;
    }
    if cached.is_empty() {
        record_outcome("trending", "error");
        return Some(Resource::from_error(
            RepositoryError::NoConnectivityAndNoCache,
        ));
    }
    // Forced refresh while offline: fall back to the cache instead of
    // ending on Loading.
    record_outcome("trending", "cache");
    Some(Resource::success(cached))
}

fn rows(page: MoviePage, is_trending: bool) -> Vec<CachedMovie> {
    let now = Utc::now();
    page.results
        .into_iter()
        .map(|dto| dto.into_cached(is_trending, now))
        .collect()
}

fn by_popularity(rows: Vec<CachedMovie>) -> Vec<Movie> {
    let mut movies: Vec<Movie> = rows.into_iter().map(Movie::from).collect();
    movies.sort_by(|a, b| b.popularity.total_cmp(&a.popularity));
    movies
}

fn record_remote(operation: &str, started: Instant, ok: bool) {
    metrics::REMOTE_DURATION
        .with_label_values(&[operation])
        .observe(started.elapsed().as_secs_f64());
    metrics::REMOTE_REQUESTS
        .with_label_values(&[operation, if ok { "success" } else { "failure" }])
        .inc();
}

fn record_outcome(operation: &str, source: &str) {
    metrics::RECONCILE_OUTCOMES
        .with_label_values(&[operation, source])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use crate::cache::{CacheError, SqliteCache};
    use crate::testing::fixtures::{cached_movie, movie_dto};
    use crate::testing::{MockConnectivity, MockMovieSource, RecordedSourceCall};

    struct Harness {
        repo: MovieRepository,
        source: Arc<MockMovieSource>,
        cache: Arc<SqliteCache>,
        connectivity: Arc<MockConnectivity>,
    }

    fn harness(online: bool) -> Harness {
        let source = Arc::new(MockMovieSource::new());
        let cache = Arc::new(SqliteCache::in_memory().unwrap());
        let connectivity = Arc::new(MockConnectivity::new(online));
        let repo = MovieRepository::new(
            source.clone(),
            cache.clone(),
            connectivity.clone(),
            RepositoryConfig::default(),
        );
        Harness {
            repo,
            source,
            cache,
            connectivity,
        }
    }

    fn seed_trending(cache: &SqliteCache, count: i64) {
        let rows: Vec<CachedMovie> = (1..=count)
            .map(|i| cached_movie(i, &format!("Cached {}", i), i as f64, true, Utc::now()))
            .collect();
        cache.replace_trending(&rows).unwrap();
    }

    fn ids(resource: &Resource<Vec<Movie>>) -> Vec<i64> {
        resource
            .data()
            .map(|movies| movies.iter().map(|m| m.id).collect())
            .unwrap_or_default()
    }

    fn assert_no_error_after_success(emissions: &[Resource<Vec<Movie>>]) {
        let first_success = emissions.iter().position(|r| r.is_success());
        if let Some(pos) = first_success {
            assert!(
                emissions[pos..].iter().all(|r| !r.is_error()),
                "error after success: {:?}",
                emissions
            );
        }
        assert!(emissions.iter().filter(|r| r.is_error()).count() <= 1);
    }

    // =========================================================================
    // fetch_trending
    // =========================================================================

    #[tokio::test]
    async fn test_trending_offline_empty_cache_errors() {
        let h = harness(false);

        let emissions: Vec<_> = h.repo.fetch_trending(false).collect().await;

        assert_eq!(emissions.len(), 2);
        assert!(emissions[0].is_loading());
        assert_eq!(
            emissions[1].error_message(),
            Some("no connection and no cached data")
        );
        assert!(matches!(
            emissions[1].cause(),
            Some(RepositoryError::NoConnectivityAndNoCache)
        ));
        assert_eq!(h.source.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_trending_cached_then_fresh() {
        let h = harness(true);
        seed_trending(&h.cache, 5);
        let fresh: Vec<_> = (101..=120)
            .map(|i| movie_dto(i, &format!("Fresh {}", i), i as f64))
            .collect();
        h.source.set_trending(fresh).await;

        let emissions: Vec<_> = h.repo.fetch_trending(false).collect().await;

        assert_eq!(emissions.len(), 3);
        assert!(emissions[0].is_loading());
        assert_eq!(ids(&emissions[1]), vec![5, 4, 3, 2, 1]);
        let fresh_ids = ids(&emissions[2]);
        assert_eq!(fresh_ids.len(), 20);
        assert_eq!(fresh_ids[0], 120);

        let partition = h.cache.get_trending().unwrap();
        assert_eq!(partition.len(), 20);
        assert!(partition.iter().all(|row| row.is_trending && row.movie.id > 100));
        assert!(h.cache.get_by_id(1).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trending_keeps_refetched_ids() {
        let h = harness(true);
        seed_trending(&h.cache, 5);
        h.source
            .set_trending(vec![movie_dto(3, "Cached 3", 3.0), movie_dto(50, "New", 50.0)])
            .await;

        let emissions: Vec<_> = h.repo.fetch_trending(false).collect().await;

        assert_eq!(ids(emissions.last().unwrap()), vec![50, 3]);
        assert!(h.cache.get_by_id(3).unwrap().is_some());
        assert!(h.cache.get_by_id(4).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trending_failure_suppressed_by_cache_hit() {
        let h = harness(true);
        seed_trending(&h.cache, 3);
        h.source.set_failing(Some(500)).await;

        let emissions: Vec<_> = h.repo.fetch_trending(false).collect().await;

        assert_eq!(emissions.len(), 2);
        assert!(emissions[0].is_loading());
        assert_eq!(ids(&emissions[1]), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_trending_offline_with_cache_ends_on_cache() {
        let h = harness(false);
        seed_trending(&h.cache, 2);

        let emissions: Vec<_> = h.repo.fetch_trending(false).collect().await;

        assert_eq!(emissions.len(), 2);
        assert_eq!(ids(&emissions[1]), vec![2, 1]);
        assert_eq!(h.source.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_trending_never_errors_with_cache_for_any_connectivity() {
        for online in [true, false] {
            for failing in [None, Some(500)] {
                let h = harness(online);
                seed_trending(&h.cache, 4);
                h.source.set_failing(failing).await;

                let emissions: Vec<_> = h.repo.fetch_trending(false).collect().await;

                assert!(
                    emissions.iter().all(|r| !r.is_error()),
                    "online={} failing={:?}: {:?}",
                    online,
                    failing,
                    emissions
                );
                assert_no_error_after_success(&emissions);
            }
        }
    }

    #[tokio::test]
    async fn test_trending_network_failure_without_cache_errors() {
        let h = harness(true);
        h.source.set_next_error(RemoteError::RateLimitExceeded).await;

        let emissions: Vec<_> = h.repo.fetch_trending(false).collect().await;

        assert_eq!(emissions.len(), 2);
        assert!(matches!(
            emissions[1].cause(),
            Some(RepositoryError::NetworkFailure(RemoteError::RateLimitExceeded))
        ));
        assert_eq!(
            emissions[1].error_message(),
            Some("Rate limit exceeded, please wait before retrying")
        );
    }

    #[tokio::test]
    async fn test_forced_refresh_skips_cached_emission() {
        let h = harness(true);
        seed_trending(&h.cache, 3);
        h.source.set_trending(vec![movie_dto(9, "Fresh", 9.0)]).await;

        let emissions: Vec<_> = h.repo.fetch_trending(true).collect().await;

        assert_eq!(emissions.len(), 2);
        assert!(emissions[0].is_loading());
        assert_eq!(ids(&emissions[1]), vec![9]);
    }

    #[tokio::test]
    async fn test_forced_refresh_failure_errors_even_with_cache() {
        let h = harness(true);
        seed_trending(&h.cache, 3);
        h.source.set_failing(Some(503)).await;

        let emissions: Vec<_> = h.repo.fetch_trending(true).collect().await;

        assert_eq!(emissions.len(), 2);
        assert!(emissions[1].is_error());
        assert_eq!(h.cache.get_trending().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_forced_refresh_offline_falls_back_to_cache() {
        let h = harness(false);
        seed_trending(&h.cache, 2);

        let emissions: Vec<_> = h.repo.fetch_trending(true).collect().await;

        assert_eq!(emissions.len(), 2);
        assert_eq!(ids(&emissions[1]), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_trending_uses_configured_language() {
        let source = Arc::new(MockMovieSource::new());
        let repo = MovieRepository::new(
            source.clone(),
            Arc::new(SqliteCache::in_memory().unwrap()),
            Arc::new(MockConnectivity::new(true)),
            RepositoryConfig {
                language: "it-IT".to_string(),
            },
        );

        let _: Vec<_> = repo.fetch_trending(false).collect().await;

        assert_eq!(
            source.recorded_calls().await,
            vec![RecordedSourceCall::Trending {
                language: "it-IT".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_connectivity_checked_once_per_call() {
        let h = harness(true);

        let _: Vec<_> = h.repo.fetch_trending(false).collect().await;
        let _: Vec<_> = h.repo.search("dune").collect().await;

        assert_eq!(h.connectivity.check_count(), 2);
    }

    #[tokio::test]
    async fn test_dropping_stream_stops_before_network() {
        let h = harness(true);

        let mut stream = h.repo.fetch_trending(false);
        assert!(stream.next().await.unwrap().is_loading());
        drop(stream);

        assert_eq!(h.source.call_count().await, 0);
    }

    // =========================================================================
    // search
    // =========================================================================

    #[tokio::test]
    async fn test_blank_search_yields_only_empty_success() {
        let h = harness(true);

        for query in ["", "   "] {
            let emissions: Vec<_> = h.repo.search(query).collect().await;
            assert_eq!(emissions.len(), 1);
            assert_eq!(emissions[0].data(), Some(&Vec::new()));
        }
        assert_eq!(h.source.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_search_offline_matches_cached_title() {
        let h = harness(false);
        h.cache
            .insert_all(&[
                cached_movie(1, "Dune: Part Two", 90.0, false, Utc::now()),
                cached_movie(2, "Arrival", 40.0, true, Utc::now()),
            ])
            .unwrap();

        let emissions: Vec<_> = h.repo.search("dune").collect().await;

        assert_eq!(emissions.len(), 2);
        assert!(emissions[0].is_loading());
        assert_eq!(ids(&emissions[1]), vec![1]);
    }

    #[tokio::test]
    async fn test_search_offline_no_match_errors() {
        let h = harness(false);

        let emissions: Vec<_> = h.repo.search("dune").collect().await;

        assert_eq!(
            emissions[1].error_message(),
            Some("offline, results may be limited")
        );
    }

    #[tokio::test]
    async fn test_search_online_keeps_remote_order_and_upserts() {
        let h = harness(true);
        h.cache
            .replace_trending(&[cached_movie(2, "Dune", 5.0, true, Utc::now())])
            .unwrap();
        h.source
            .set_catalog(vec![
                movie_dto(1, "Dune: Part Two", 10.0),
                movie_dto(2, "Dune", 80.0),
            ])
            .await;

        let emissions: Vec<_> = h.repo.search("dune").collect().await;

        assert_eq!(emissions.len(), 2);
        assert_eq!(ids(&emissions[1]), vec![1, 2]);

        // Upsert flips the trending marker and replaces the row wholesale.
        let row = h.cache.get_by_id(2).unwrap().unwrap();
        assert!(!row.is_trending);
        assert_eq!(row.movie.popularity, 80.0);
        assert!(h.cache.get_trending().unwrap().is_empty());

        assert_eq!(
            h.source.recorded_calls().await,
            vec![RecordedSourceCall::Search(SearchParams::new("dune", "en-US"))]
        );
    }

    #[tokio::test]
    async fn test_search_failure_falls_back_to_local() {
        let h = harness(true);
        h.cache
            .insert_all(&[
                cached_movie(1, "Dune", 10.0, false, Utc::now()),
                cached_movie(2, "Dune: Part Two", 90.0, false, Utc::now()),
            ])
            .unwrap();
        h.source.set_failing(Some(500)).await;

        let emissions: Vec<_> = h.repo.search("DUNE").collect().await;

        assert_eq!(ids(&emissions[1]), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_search_failure_without_local_reports_network_error() {
        let h = harness(true);
        h.source.set_failing(Some(500)).await;

        let emissions: Vec<_> = h.repo.search("dune").collect().await;

        assert!(matches!(
            emissions[1].cause(),
            Some(RepositoryError::NetworkFailure(RemoteError::ApiError { status: 500, .. }))
        ));
    }

    // =========================================================================
    // Cache faults and maintenance
    // =========================================================================

    struct BrokenCache;

    impl MovieCache for BrokenCache {
        fn get_trending(&self) -> Result<Vec<CachedMovie>, CacheError> {
            Err(CacheError::Database("disk I/O error".to_string()))
        }
        fn get_by_id(&self, _id: i64) -> Result<Option<CachedMovie>, CacheError> {
            Err(CacheError::Database("disk I/O error".to_string()))
        }
        fn search_by_title(&self, _text: &str) -> Result<Vec<CachedMovie>, CacheError> {
            Err(CacheError::Database("disk I/O error".to_string()))
        }
        fn insert_all(&self, _movies: &[CachedMovie]) -> Result<(), CacheError> {
            Err(CacheError::Database("disk I/O error".to_string()))
        }
        fn delete_trending(&self) -> Result<usize, CacheError> {
            Err(CacheError::Database("disk I/O error".to_string()))
        }
        fn replace_trending(&self, _movies: &[CachedMovie]) -> Result<(), CacheError> {
            Err(CacheError::Database("disk I/O error".to_string()))
        }
        fn delete_all(&self) -> Result<(), CacheError> {
            Err(CacheError::Database("disk I/O error".to_string()))
        }
        fn delete_older_than(&self, _cutoff: chrono::DateTime<Utc>) -> Result<usize, CacheError> {
            Err(CacheError::Database("disk I/O error".to_string()))
        }
        fn count(&self) -> Result<u64, CacheError> {
            Err(CacheError::Database("disk I/O error".to_string()))
        }
    }

    fn broken_repo(source: Arc<MockMovieSource>) -> MovieRepository {
        MovieRepository::new(
            source,
            Arc::new(BrokenCache),
            Arc::new(MockConnectivity::new(true)),
            RepositoryConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_broken_cache_still_serves_network_results() {
        let source = Arc::new(MockMovieSource::new());
        source
            .set_trending(vec![movie_dto(1, "Low", 1.0), movie_dto(2, "High", 2.0)])
            .await;
        source.set_catalog(vec![movie_dto(3, "Dune", 3.0)]).await;
        let repo = broken_repo(source);

        let trending: Vec<_> = repo.fetch_trending(false).collect().await;
        assert_eq!(trending.len(), 2);
        assert_eq!(ids(&trending[1]), vec![2, 1]);

        let search: Vec<_> = repo.search("dune").collect().await;
        assert_eq!(ids(&search[1]), vec![3]);
    }

    #[tokio::test]
    async fn test_get_by_id_surfaces_storage_error() {
        let repo = broken_repo(Arc::new(MockMovieSource::new()));
        assert!(matches!(
            repo.get_by_id(1),
            Err(RepositoryError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_get_by_id_reads_cache_only() {
        let h = harness(true);
        h.cache
            .insert_all(&[cached_movie(7, "Heat", 30.0, false, Utc::now())])
            .unwrap();

        assert_eq!(h.repo.get_by_id(7).unwrap().unwrap().title, "Heat");
        assert!(h.repo.get_by_id(8).unwrap().is_none());
        assert_eq!(h.source.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_evict_older_than() {
        let h = harness(true);
        let now = Utc::now();
        h.cache
            .insert_all(&[
                cached_movie(1, "Old", 1.0, false, now - Duration::days(10)),
                cached_movie(2, "New", 2.0, false, now),
            ])
            .unwrap();

        assert_eq!(h.repo.evict_older_than(Duration::days(7)).unwrap(), 1);
        assert!(h.cache.get_by_id(1).unwrap().is_none());
        assert!(h.cache.get_by_id(2).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let h = harness(true);
        seed_trending(&h.cache, 3);

        h.repo.clear_cache().unwrap();

        assert_eq!(h.cache.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_observe_by_id_follows_cache_writes() {
        let h = harness(true);
        h.source.set_catalog(vec![movie_dto(7, "Dune", 50.0)]).await;
        let mut observed = h.repo.observe_by_id(7);

        assert_eq!(observed.next().await, Some(None));

        h.repo.search("dune").collect::<Vec<_>>().await;
        let movie = observed.next().await.unwrap().unwrap();
        assert_eq!(movie.title, "Dune");

        // Same row written again: nothing new to observe
        h.repo.search("dune").collect::<Vec<_>>().await;
        h.repo.clear_cache().unwrap();
        assert_eq!(observed.next().await, Some(None));
    }
}
