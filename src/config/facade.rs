//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::TrustRouterConfig;
use crate::error::RouterError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file, an optional explicit file and environment,
    /// then validate it.
    pub fn load(explicit: Option<&Path>) -> Result<TrustRouterConfig, RouterError> {
        let config = MergeService::load(explicit)
            .map_err(|e| RouterError::ConfigError(format!("Failed to load config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Create default configuration.
    pub fn default() -> TrustRouterConfig {
        TrustRouterConfig::default()
    }
}
