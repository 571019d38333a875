use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::connectivity::ProbeConfig;
use crate::remote::TmdbConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub connectivity: ProbeConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("cinecache.db")
}

/// Cache, history and input-coordination settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Recent searches kept (default: 10)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Search debounce window in milliseconds (default: 300)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Evict movies cached longer than this; 0 disables eviction (default: 168)
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
    /// Seconds between eviction passes (default: 3600)
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            debounce_ms: default_debounce_ms(),
            max_age_hours: default_max_age_hours(),
            eviction_interval_secs: default_eviction_interval(),
        }
    }
}

impl CacheConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Maximum row age, or `None` when eviction is disabled.
    pub fn max_age(&self) -> Option<chrono::Duration> {
        if self.max_age_hours == 0 {
            return None;
        }
        i64::try_from(self.max_age_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }
}

fn default_history_limit() -> usize {
    crate::history::DEFAULT_MAX_ITEMS
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_max_age_hours() -> u64 {
    24 * 7
}

fn default_eviction_interval() -> u64 {
    3600
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub tmdb: SanitizedTmdbConfig,
    pub cache: CacheConfig,
    pub connectivity: ProbeConfig,
}

/// Sanitized TMDB config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTmdbConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base_url: Option<String>,
    pub language: String,
    pub timeout_secs: u64,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            tmdb: SanitizedTmdbConfig {
                base_url: config.tmdb.base_url.clone(),
                image_base_url: config.tmdb.image_base_url.clone(),
                language: config.tmdb.language.clone(),
                timeout_secs: config.tmdb.timeout_secs,
                api_key_configured: !config.tmdb.api_key.is_empty(),
            },
            cache: config.cache.clone(),
            connectivity: config.connectivity.clone(),
        }
    }
}
