//! Environment variable source: TRUSTROUTER__* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder, e.g. `TRUSTROUTER__CACHE__TTL_MS`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix("TRUSTROUTER")
            .separator("__")
            .try_parsing(true),
    ))
}
