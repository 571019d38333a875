use std::sync::Arc;

use cinecache_core::{
    Config, ConnectivityMonitor, CoordinatorConfig, MovieCache, MovieRepository,
    QueryCoordinator, SanitizedConfig, SearchHistory,
};

/// Shared application state
pub struct AppState {
    config: Config,
    repository: MovieRepository,
    history: SearchHistory,
    connectivity: Arc<dyn ConnectivityMonitor>,
    cache: Arc<dyn MovieCache>,
}

impl AppState {
    pub fn new(
        config: Config,
        repository: MovieRepository,
        history: SearchHistory,
        connectivity: Arc<dyn ConnectivityMonitor>,
        cache: Arc<dyn MovieCache>,
    ) -> Self {
        Self {
            config,
            repository,
            history,
            connectivity,
            cache,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn repository(&self) -> &MovieRepository {
        &self.repository
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    pub fn connectivity(&self) -> &dyn ConnectivityMonitor {
        self.connectivity.as_ref()
    }

    pub fn cache(&self) -> &dyn MovieCache {
        self.cache.as_ref()
    }

    /// Base URL for poster and backdrop links.
    pub fn image_base_url(&self) -> &str {
        self.config
            .tmdb
            .image_base_url
            .as_deref()
            .unwrap_or(cinecache_core::movie::DEFAULT_IMAGE_BASE_URL)
    }

    /// A fresh coordinator for one client session.
    pub fn new_coordinator(&self) -> QueryCoordinator {
        QueryCoordinator::new(
            self.repository.clone(),
            self.history.clone(),
            Arc::clone(&self.connectivity),
            CoordinatorConfig {
                debounce: self.config.cache.debounce(),
                history_limit: self.config.cache.history_limit,
            },
        )
    }
}
