use config::builder::DefaultState;
use config::ConfigBuilder;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use logging::init_tracing;
pub use settings::{Config, GatewayConfig, LoggingConfig, TelegramConfig, WorkflowConfig};

/// Prefix of environment variables that override file settings,
/// e.g. `LEMON__GATEWAY__API_KEY`.
pub const ENV_PREFIX: &str = "LEMON";

/// Loads the application configuration from a TOML file layered with `LEMON__*`
/// environment variables.
///
/// The result is validated before it is returned, so callers can rely on sane
/// polling parameters.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("telegram.allowed_chat_ids")
                .try_parsing(true),
        );
    finish(builder)
}

/// Loads the configuration from an in-memory TOML document, without environment overrides.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml));
    finish(builder)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Config, ConfigError> {
    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.build()?.try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}
