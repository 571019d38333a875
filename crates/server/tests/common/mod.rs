//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock movie source and a mock connectivity monitor injected,
//! backed by a real SQLite cache in a temporary directory.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use cinecache_core::config::{DatabaseConfig, ServerConfig};
use cinecache_core::testing::{MockConnectivity, MockMovieSource};
use cinecache_core::{
    CacheConfig, Config, ConnectivityMonitor, MovieCache, MovieRepository, MovieSource,
    ProbeConfig, RepositoryConfig, SearchHistory, SearchHistoryStore, SqliteCache, TmdbConfig,
};
use cinecache_server::state::AppState;

/// Re-export fixtures for test convenience
pub use cinecache_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_trending() {
///     let fixture = TestFixture::new().await;
///     fixture.source.set_trending(vec![fixtures::movie_dto(1, "Dune", 90.0)]).await;
///
///     let response = fixture.get("/api/v1/movies/trending").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock remote source - configure trending and search results
    pub source: Arc<MockMovieSource>,
    /// Mock connectivity - flip online/offline
    pub connectivity: Arc<MockConnectivity>,
    /// Direct handle on the cache for seeding and assertions
    pub cache: Arc<SqliteCache>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response with the body kept as text.
#[derive(Debug)]
pub struct TextResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let source = Arc::new(MockMovieSource::new());
        let connectivity = Arc::new(MockConnectivity::new(test_config.online));
        let cache = Arc::new(SqliteCache::new(&db_path).expect("Failed to create cache"));

        let config = Config {
            tmdb: TmdbConfig::with_api_key("test-key"),
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            cache: CacheConfig {
                history_limit: test_config.history_limit,
                ..Default::default()
            },
            connectivity: ProbeConfig {
                enabled: false,
                ..Default::default()
            },
        };

        let repository = MovieRepository::new(
            Arc::clone(&source) as Arc<dyn MovieSource>,
            Arc::clone(&cache) as Arc<dyn MovieCache>,
            Arc::clone(&connectivity) as Arc<dyn ConnectivityMonitor>,
            RepositoryConfig::default(),
        );
        let history = SearchHistory::new(
            Arc::clone(&cache) as Arc<dyn SearchHistoryStore>,
            test_config.history_limit,
        );

        let state = Arc::new(AppState::new(
            config,
            repository,
            history,
            Arc::clone(&connectivity) as Arc<dyn ConnectivityMonitor>,
            Arc::clone(&cache) as Arc<dyn MovieCache>,
        ));

        let router = cinecache_server::api::create_router(state);

        Self {
            router,
            source,
            connectivity,
            cache,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a GET request and keep the body as text (for /metrics).
    pub async fn get_text(&self, path: &str) -> TextResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        TextResponse {
            status,
            content_type,
            body: String::from_utf8_lossy(&body_bytes).into_owned(),
        }
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Initial connectivity
    pub online: bool,
    /// Search history capacity
    pub history_limit: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            online: true,
            history_limit: 10,
        }
    }
}
