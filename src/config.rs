//! Configuration Management
//!
//! Loads sfops configuration from disk. Values are resolved
//! in the order CLI flag > environment variable > config file > default;
//! clap folds the environment into [`Overrides`] before [`Config::resolve`]
//! sees them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ensure::throttle::ThrottleConfig;

/// Admin API version used when none is configured
pub const DEFAULT_API_VERSION: &str = "2024-01";

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the store domain
pub const ENV_STORE: &str = "SHOPIFY_STORE";
/// Environment variable holding the Admin API access token
pub const ENV_ACCESS_TOKEN: &str = "SHOPIFY_ACCESS_TOKEN";
/// Environment variable holding the Admin API version
pub const ENV_API_VERSION: &str = "SHOPIFY_API_VERSION";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Store domain, e.g. `my-shop.myshopify.com`
    #[serde(default)]
    pub store: Option<String>,
    /// Admin API access token
    #[serde(default)]
    pub access_token: Option<String>,
    /// Admin API version, e.g. `2024-01`
    #[serde(default)]
    pub api_version: Option<String>,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Pacing between create requests
    #[serde(default)]
    pub throttle: Option<ThrottleConfig>,
}

/// Values supplied on the command line (or through clap's env fallback)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store: Option<String>,
    pub access_token: Option<String>,
    pub api_version: Option<String>,
    pub timeout_secs: Option<u64>,
    pub delay_ms: Option<u64>,
    pub base_url: Option<String>,
}

/// Fully resolved settings for talking to the Admin API
#[derive(Debug, Clone)]
pub struct ShopSettings {
    pub store: String,
    pub access_token: String,
    pub api_version: String,
    pub timeout: Duration,
    pub throttle: ThrottleConfig,
    /// Origin override; `https://{store}` when absent
    pub base_url: Option<String>,
}

impl Config {
    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("storefront-ops").join("config.json"))
    }

    /// Load configuration from the default location
    ///
    /// A missing or unreadable file yields the default configuration.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from an explicit path. Unlike [`Config::load`],
    /// a missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Resolve the effective settings (overrides > config > default)
    pub fn resolve(&self, overrides: &Overrides) -> Result<ShopSettings> {
        let store = first_non_empty([overrides.store.clone(), self.store.clone()])
            .with_context(|| format!("No store configured. Use --store or set {ENV_STORE}"))?;

        let access_token =
            first_non_empty([overrides.access_token.clone(), self.access_token.clone()])
                .with_context(|| {
                    format!("No access token configured. Use --token or set {ENV_ACCESS_TOKEN}")
                })?;

        let api_version =
            first_non_empty([overrides.api_version.clone(), self.api_version.clone()])
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let timeout_secs = overrides
            .timeout_secs
            .or(self.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let throttle = match overrides.delay_ms {
            Some(delay_ms) => ThrottleConfig::Fixed { delay_ms },
            None => self.throttle.clone().unwrap_or_default(),
        };

        Ok(ShopSettings {
            store: normalize_store(&store),
            access_token,
            api_version,
            timeout: Duration::from_secs(timeout_secs),
            throttle,
            base_url: overrides.base_url.clone(),
        })
    }
}

fn first_non_empty<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

/// Strip scheme and trailing slashes so both `shop.myshopify.com` and
/// `https://shop.myshopify.com/` are accepted.
fn normalize_store(store: &str) -> String {
    store
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}
