use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Client configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Root URL of the recommendation service
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Directory holding the persisted key-value state
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Items requested per domain for the unified feed
    #[serde(default = "default_unified_items_per_domain")]
    pub unified_items_per_domain: u32,

    /// Items requested for a single-domain feed
    #[serde(default = "default_domain_item_count")]
    pub domain_item_count: u32,

    /// Trailing window used when learning preferences from interactions
    #[serde(default = "default_learn_window_days")]
    pub learn_window_days: u32,

    /// Credentials used by the headless binary when no session is stored
    #[serde(default)]
    pub login_email: Option<String>,

    #[serde(default)]
    pub login_password: Option<String>,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".unirec")
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_unified_items_per_domain() -> u32 {
    5
}

fn default_domain_item_count() -> u32 {
    10
}

fn default_learn_window_days() -> u32 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            state_dir: default_state_dir(),
            request_timeout_secs: default_request_timeout_secs(),
            unified_items_per_domain: default_unified_items_per_domain(),
            domain_item_count: default_domain_item_count(),
            learn_window_days: default_learn_window_days(),
            login_email: None,
            login_password: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the request bounds against the limits the service accepts
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=20).contains(&self.unified_items_per_domain) {
            anyhow::bail!(
                "UNIFIED_ITEMS_PER_DOMAIN must be between 1 and 20, got {}",
                self.unified_items_per_domain
            );
        }
        if !(1..=50).contains(&self.domain_item_count) {
            anyhow::bail!(
                "DOMAIN_ITEM_COUNT must be between 1 and 50, got {}",
                self.domain_item_count
            );
        }
        if self.learn_window_days == 0 {
            anyhow::bail!("LEARN_WINDOW_DAYS must be positive");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
