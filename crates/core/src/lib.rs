pub mod cache;
pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod history;
pub mod metrics;
pub mod movie;
pub mod remote;
pub mod repository;
pub mod resource;
pub mod testing;

pub use cache::{CacheError, MovieCache, SearchHistoryStore, SqliteCache};
pub use config::{
    load_config, load_config_from_str, validate_config, CacheConfig, Config, ConfigError,
    SanitizedConfig,
};
pub use connectivity::{
    ConnectivityMonitor, HttpConnectivityMonitor, ProbeConfig, StaticConnectivity,
};
pub use coordinator::{CoordinatorConfig, CoordinatorPhase, ListState, QueryCoordinator};
pub use history::{SearchHistory, SearchRecord};
pub use movie::{CachedMovie, Movie, MovieDto, MoviePage};
pub use remote::{MovieSource, RemoteError, SearchParams, TmdbClient, TmdbConfig};
pub use repository::{MovieRepository, MovieStream, RepositoryConfig, RepositoryError};
pub use resource::Resource;
