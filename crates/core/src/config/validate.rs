use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - TMDB section exists (enforced by serde) and carries an API key
/// - Server port is not 0
/// - History keeps at least one search
/// - Probe settings are usable when probing is enabled
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.tmdb.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "tmdb.api_key cannot be empty".to_string(),
        ));
    }

    if config.tmdb.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tmdb.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.cache.history_limit == 0 {
        return Err(ConfigError::ValidationError(
            "cache.history_limit must be at least 1".to_string(),
        ));
    }

    if config.cache.max_age_hours > 0 && config.cache.eviction_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache.eviction_interval_secs cannot be 0 while eviction is enabled".to_string(),
        ));
    }

    if config.connectivity.enabled {
        if config.connectivity.probe_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "connectivity.probe_url cannot be empty".to_string(),
            ));
        }
        if config.connectivity.probe_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "connectivity.probe_interval_secs cannot be 0".to_string(),
            ));
        }
    }

    Ok(())
}
