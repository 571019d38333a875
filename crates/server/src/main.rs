use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinecache_core::{
    load_config, validate_config, ConnectivityMonitor, HttpConnectivityMonitor, MovieCache,
    MovieRepository, MovieSource, RepositoryConfig, SearchHistory, SearchHistoryStore,
    SqliteCache, StaticConnectivity, TmdbClient,
};
use cinecache_server::{api::create_router, metrics, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("CINECACHE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    // Create SQLite cache (movies and search history share one database)
    let sqlite = Arc::new(
        SqliteCache::new(&config.database.path).context("Failed to create movie cache")?,
    );
    let cache: Arc<dyn MovieCache> = sqlite.clone();
    let history_store: Arc<dyn SearchHistoryStore> = sqlite;
    info!("Movie cache initialized");

    // Create TMDB client
    let source: Arc<dyn MovieSource> =
        Arc::new(TmdbClient::new(config.tmdb.clone()).context("Failed to create TMDB client")?);
    info!("TMDB client initialized (language: {})", config.tmdb.language);

    // Connectivity monitor
    let mut probe: Option<Arc<HttpConnectivityMonitor>> = None;
    let mut probe_handle: Option<JoinHandle<()>> = None;
    let connectivity: Arc<dyn ConnectivityMonitor> = if config.connectivity.enabled {
        let monitor = Arc::new(
            HttpConnectivityMonitor::new(config.connectivity.clone(), true)
                .context("Failed to create connectivity probe")?,
        );
        if !monitor.probe_once().await {
            warn!("Remote source unreachable at startup, serving from cache");
        }
        probe_handle = Some(monitor.start());
        probe = Some(Arc::clone(&monitor));
        monitor
    } else {
        info!("Connectivity probing disabled, assuming online");
        Arc::new(StaticConnectivity::new(true))
    };

    let repository = MovieRepository::new(
        source,
        Arc::clone(&cache),
        Arc::clone(&connectivity),
        RepositoryConfig {
            language: config.tmdb.language.clone(),
        },
    );
    let history = SearchHistory::new(history_store, config.cache.history_limit);

    // Periodic eviction of stale cache rows
    let eviction_handle = config
        .cache
        .max_age()
        .map(|max_age| spawn_eviction(repository.clone(), max_age, config.cache.eviction_interval()));

    // Register metrics before the first scrape
    once_cell::sync::Lazy::force(&metrics::REGISTRY);

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        repository,
        history,
        connectivity,
        cache,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    if let Some(monitor) = probe {
        monitor.stop();
    }
    if let Some(handle) = probe_handle {
        let _ = handle.await;
        info!("Connectivity probe stopped");
    }
    if let Some(handle) = eviction_handle {
        handle.abort();
    }

    Ok(())
}

fn spawn_eviction(
    repository: MovieRepository,
    max_age: chrono::Duration,
    interval: Duration,
) -> JoinHandle<()> {
    info!(
        "Evicting cached movies older than {}h every {:?}",
        max_age.num_hours(),
        interval
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match repository.evict_older_than(max_age) {
                Ok(0) => {}
                Ok(removed) => info!("Evicted {} stale cached movies", removed),
                Err(e) => warn!("Cache eviction failed: {}", e),
            }
        }
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
