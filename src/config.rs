use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "pos-checkout.toml";

/// Main configuration structure for the checkout client
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PosCheckoutConfig {
    /// POS API connection settings
    pub api: ApiConfig,
    /// Checkout workflow behaviour
    pub checkout: CheckoutConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the POS API, without trailing slash
    pub base_url: String,
    /// Bearer token (can be set via POS_API_TOKEN)
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout_seconds: u64,
    /// Client-side rate limit
    pub requests_per_second: u32,
    /// Burst capacity on top of the steady rate
    pub burst_capacity: u32,
    /// How long customer search responses stay cached
    pub search_cache_ttl_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            token: None,
            timeout_seconds: 30,
            requests_per_second: 10,
            burst_capacity: 20,
            search_cache_ttl_seconds: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Insert the device count/details steps between customer and payment
    pub capture_devices: bool,
    /// Upper bound for the device count step
    pub max_devices: u32,
    /// Minimum trimmed phone length before a search is scheduled
    pub phone_search_min_chars: usize,
    /// Quiet period before a phone search fires
    pub phone_search_debounce_ms: u64,
    /// Page size requested from the customer search endpoint
    pub customer_search_limit: u32,
    /// Pause on the terminal step before the workflow resets
    pub settle_delay_ms: u64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            capture_devices: false,
            max_devices: 10,
            phone_search_min_chars: 3,
            phone_search_debounce_ms: 300,
            customer_search_limit: 10,
            settle_delay_ms: 300,
        }
    }
}

impl CheckoutConfig {
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.phone_search_debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl PosCheckoutConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. pos-checkout.toml in the working directory
    /// 3. Environment variables (POS_CHECKOUT__SECTION__KEY)
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Same as `load`, reading `path` instead of the default file. An explicit
    /// path must exist.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if Path::new(DEFAULT_CONFIG_FILE).exists() {
                    builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("POS_CHECKOUT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut pos_config: PosCheckoutConfig = builder.build()?.try_deserialize()?;

        if pos_config.api.token.is_none() {
            if let Ok(token) = std::env::var("POS_API_TOKEN") {
                if !token.trim().is_empty() {
                    pos_config.api.token = Some(token);
                }
            }
        }

        Ok(pos_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Copy with the token masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.api.token.is_some() {
            copy.api.token = Some("********".to_string());
        }
        copy
    }
}
