use std::time::Duration;

use serde::Deserialize;

use crate::utils::error::MeteringError;

#[derive(Debug, Clone, Deserialize)]
pub struct MeteringConfig {
    /// Base URL of the counter document store API
    pub store_api_url: String,

    /// Bearer token for the counter store; optional when pointed at an emulator
    #[serde(default)]
    pub store_api_key: Option<String>,

    /// How long a locally cached counter stays fresh (milliseconds).
    /// Trades read-your-writes latency against cross-device accuracy. 10-30s
    /// is a good default.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Max cached counters (one per user id seen by this process)
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: u64,

    /// Per-call timeout for remote store requests (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl MeteringConfig {
    pub fn load() -> Result<Self, MeteringError> {
        dotenvy::dotenv().ok();

        let cfg: MeteringConfig = config::Config::builder()
            .add_source(config::Environment::with_prefix("LENSPASS"))
            .build()?
            .try_deserialize()?;

        if cfg.store_api_url.is_empty() {
            return Err(MeteringError::Config(
                "store_api_url must not be empty".to_string(),
            ));
        }

        Ok(cfg)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_cache_ttl_ms() -> u64 {
    15_000
}
fn default_cache_max_entries() -> u64 {
    10_000
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
