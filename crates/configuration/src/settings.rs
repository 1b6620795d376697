use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Rejects settings that would make the trade workflow misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.venue.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "gateway.venue must name a trading venue (MIC)".to_string(),
            ));
        }
        if self.workflow.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "workflow.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.workflow.poll_timeout() < self.workflow.poll_interval() {
            return Err(ConfigError::ValidationError(
                "workflow.poll_timeout_secs must not be shorter than the poll interval".to_string(),
            ));
        }
        if self.workflow.max_search_results == 0 {
            return Err(ConfigError::ValidationError(
                "workflow.max_search_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection settings for the brokerage REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the trading API, with trailing slash.
    pub trading_base_url: String,
    /// Base URL of the market data API, with trailing slash.
    pub market_data_base_url: String,
    /// Bearer token. Usually supplied through `LEMON__GATEWAY__API_KEY`.
    #[serde(default)]
    pub api_key: String,
    /// MIC of the venue all orders are routed to, e.g. "XMUN".
    pub venue: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parameters of the conversational trade workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    /// Spacing between two order status lookups.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long to wait for an execution before cancelling the order.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// Consecutive failed status lookups tolerated while polling.
    #[serde(default = "default_max_poll_errors")]
    pub max_poll_errors: u32,
    /// Upper bound on instruments offered after a search.
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,
    /// Space used by quick-trades and `/positions`. Falls back to the first listed space.
    #[serde(default)]
    pub default_space_id: Option<String>,
}

impl WorkflowConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
            max_poll_errors: default_max_poll_errors(),
            max_search_results: default_max_search_results(),
            default_space_id: None,
        }
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_long_poll_timeout_secs")]
    pub long_poll_timeout_secs: u64,
    /// Chats allowed to talk to the bot. Empty means everyone.
    #[serde(default)]
    pub allowed_chat_ids: Vec<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            long_poll_timeout_secs: default_long_poll_timeout_secs(),
            allowed_chat_ids: Vec::new(),
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive. `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            directory: None,
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}
fn default_poll_interval_ms() -> u64 {
    2_000
}
fn default_poll_timeout_secs() -> u64 {
    180
}
fn default_max_poll_errors() -> u32 {
    3
}
fn default_max_search_results() -> usize {
    4
}
fn default_long_poll_timeout_secs() -> u64 {
    30
}
fn default_log_filter() -> String {
    "info".to_string()
}
