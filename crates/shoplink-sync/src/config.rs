//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHOPLINK_PROVIDER=fixture                                          │
//! │     SHOPLINK_APP_KEY=6abc...                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/shoplink/config.toml (Linux)                             │
//! │     ~/Library/Application Support/dev.shoplink.shoplink/config.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [provider]
//! kind = "live"                  # live | fixture
//! auth_base_url = "https://auth.tiktok-shops.com"
//! api_base_url = "https://open-api.tiktokglobalshop.com"
//! api_version = "202309"
//! app_key = "6abc..."
//! request_timeout_secs = 30
//! auth_error_codes = [105000, 105001, 105002, 36004004]
//! price_unit = "major"          # major | minor (bare integers are cents)
//!
//! [sync]
//! page_size = 20
//! max_pages = 50
//! max_products = 1000
//! failure_cap = 50
//!
//! [ledger]
//! max_entries = 50
//!
//! [secrets]
//! key_env = "SHOPLINK_SECRET_KEY"
//! cache_ttl_secs = 30
//!
//! [database]
//! path = "/var/lib/shoplink/shoplink.db"
//! ```
//!
//! The app secret is never read from this file; it is stored encrypted
//! through `SyncService::configure_app`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};
use shoplink_core::{PriceUnit, SyncBudget, MAX_PAGES_LIMIT, MAX_PAGE_SIZE, MAX_PRODUCTS_LIMIT};

// =============================================================================
// Provider Kind
// =============================================================================

/// Which marketplace backend the engine talks to.
///
/// Chosen once when the service is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Signed HTTP calls against the real marketplace.
    #[default]
    Live,

    /// Deterministic in-process catalog, no network.
    Fixture,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Live => write!(f, "live"),
            ProviderKind::Fixture => write!(f, "fixture"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" | "http" => Ok(ProviderKind::Live),
            "fixture" | "mock" => Ok(ProviderKind::Fixture),
            other => Err(SyncError::Configuration(format!(
                "Unknown provider kind: '{}'. Valid options: live, fixture",
                other
            ))),
        }
    }
}

// =============================================================================
// Provider Settings
// =============================================================================

/// Marketplace endpoints and auth-failure detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub kind: ProviderKind,

    /// Base URL of the token API.
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,

    /// Base URL of the signed open API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Version segment used in open API paths.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// App key, used when `configure` is called without one.
    #[serde(default)]
    pub app_key: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Envelope codes that mean "access token rejected".
    #[serde(default = "default_auth_error_codes")]
    pub auth_error_codes: Vec<i64>,

    /// Unit of price amounts. `minor` reads pure-integer amounts as cents.
    #[serde(default)]
    pub price_unit: PriceUnit,
}

fn default_auth_base_url() -> String {
    "https://auth.tiktok-shops.com".to_string()
}

fn default_api_base_url() -> String {
    "https://open-api.tiktokglobalshop.com".to_string()
}

fn default_api_version() -> String {
    "202309".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_auth_error_codes() -> Vec<i64> {
    vec![105000, 105001, 105002, 36004004]
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings {
            kind: ProviderKind::default(),
            auth_base_url: default_auth_base_url(),
            api_base_url: default_api_base_url(),
            api_version: default_api_version(),
            app_key: None,
            request_timeout_secs: default_request_timeout(),
            auth_error_codes: default_auth_error_codes(),
            price_unit: PriceUnit::default(),
        }
    }
}

impl ProviderSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Default budgets for imports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default = "default_max_products")]
    pub max_products: u32,

    /// Failures listed per result before the rest are only counted.
    #[serde(default = "default_failure_cap")]
    pub failure_cap: usize,
}

fn default_page_size() -> u32 {
    shoplink_core::DEFAULT_PAGE_SIZE
}
fn default_max_pages() -> u32 {
    50
}
fn default_max_products() -> u32 {
    1_000
}
fn default_failure_cap() -> usize {
    shoplink_core::DEFAULT_FAILURE_CAP
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            max_products: default_max_products(),
            failure_cap: default_failure_cap(),
        }
    }
}

impl SyncSettings {
    /// Default budget handed to the orchestrator.
    pub fn budget(&self) -> SyncBudget {
        SyncBudget {
            page_size: self.page_size,
            max_pages: self.max_pages,
            max_products: self.max_products,
        }
    }
}

// =============================================================================
// Ledger / Secrets / Database Settings
// =============================================================================

/// Run history retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    #[serde(default = "default_max_entries")]
    pub max_entries: u32,
}

fn default_max_entries() -> u32 {
    50
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            max_entries: default_max_entries(),
        }
    }
}

/// Where the encryption key comes from and how long decrypted
/// credentials stay cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretSettings {
    /// Name of the environment variable holding the base64 32-byte key.
    #[serde(default = "default_key_env")]
    pub key_env: String,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_key_env() -> String {
    "SHOPLINK_SECRET_KEY".to_string()
}

fn default_cache_ttl() -> u64 {
    30
}

impl Default for SecretSettings {
    fn default() -> Self {
        SecretSettings {
            key_env: default_key_env(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl SecretSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// SQLite location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file; defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub secrets: SecretSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl SyncConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (config.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|name| std::env::var(name).ok());

        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(path)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.provider.kind == ProviderKind::Live {
            validate_base_url("auth_base_url", &self.provider.auth_base_url)?;
            validate_base_url("api_base_url", &self.provider.api_base_url)?;
        }

        if self.provider.api_version.trim().is_empty() {
            return Err(SyncError::config("api_version must not be empty"));
        }

        if self.provider.request_timeout_secs == 0 {
            return Err(SyncError::config(
                "request_timeout_secs must be greater than 0",
            ));
        }

        check_range("page_size", self.sync.page_size, MAX_PAGE_SIZE)?;
        check_range("max_pages", self.sync.max_pages, MAX_PAGES_LIMIT)?;
        check_range("max_products", self.sync.max_products, MAX_PRODUCTS_LIMIT)?;

        if self.ledger.max_entries == 0 {
            return Err(SyncError::config("ledger.max_entries must be at least 1"));
        }

        if self.secrets.key_env.trim().is_empty() {
            return Err(SyncError::config("secrets.key_env must name a variable"));
        }

        Ok(())
    }

    /// Applies `SHOPLINK_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(kind) = lookup("SHOPLINK_PROVIDER") {
            match kind.parse() {
                Ok(parsed) => {
                    debug!(kind = %kind, "Overriding provider kind from environment");
                    self.provider.kind = parsed;
                }
                Err(_) => warn!(kind = %kind, "Unknown provider kind in environment"),
            }
        }

        if let Some(url) = lookup("SHOPLINK_AUTH_BASE_URL") {
            self.provider.auth_base_url = url;
        }

        if let Some(url) = lookup("SHOPLINK_API_BASE_URL") {
            debug!(url = %url, "Overriding API base URL from environment");
            self.provider.api_base_url = url;
        }

        if let Some(version) = lookup("SHOPLINK_API_VERSION") {
            self.provider.api_version = version;
        }

        if let Some(key) = lookup("SHOPLINK_APP_KEY") {
            self.provider.app_key = Some(key);
        }

        if let Some(unit) = lookup("SHOPLINK_PRICE_UNIT") {
            match unit.parse() {
                Ok(parsed) => self.provider.price_unit = parsed,
                Err(_) => warn!(unit = %unit, "Unknown price unit in environment"),
            }
        }

        if let Some(path) = lookup("SHOPLINK_DATABASE_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("SHOPLINK_LEDGER_MAX_ENTRIES") {
            match max.parse::<u32>() {
                Ok(n) => self.ledger.max_entries = n,
                Err(_) => warn!(value = %max, "Ignoring non-numeric SHOPLINK_LEDGER_MAX_ENTRIES"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "shoplink", "shoplink")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Database file path, falling back to the platform data directory.
    pub fn database_path(&self) -> SyncResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        directories::ProjectDirs::from("dev", "shoplink", "shoplink")
            .map(|dirs| dirs.data_dir().join("shoplink.db"))
            .ok_or_else(|| SyncError::config("No database path configured"))
    }
}

fn validate_base_url(field: &str, raw: &str) -> SyncResult<()> {
    let url = Url::parse(raw).map_err(|e| SyncError::InvalidUrl(format!("{}: {}", field, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(SyncError::InvalidUrl(format!(
            "{} must start with http:// or https://, got: {}",
            field, raw
        )));
    }
    Ok(())
}

fn check_range(field: &str, value: u32, max: u32) -> SyncResult<()> {
    if value == 0 || value > max {
        return Err(SyncError::Configuration(format!(
            "sync.{} must be between 1 and {}, got {}",
            field, max, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("live".parse::<ProviderKind>().unwrap(), ProviderKind::Live);
        assert_eq!("Fixture".parse::<ProviderKind>().unwrap(), ProviderKind::Fixture);
        assert_eq!("mock".parse::<ProviderKind>().unwrap(), ProviderKind::Fixture);
        assert!("grpc".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.provider.kind, ProviderKind::Live);
        assert_eq!(config.provider.api_version, "202309");
        assert_eq!(config.provider.auth_error_codes, vec![105000, 105001, 105002, 36004004]);
        assert_eq!(config.sync.page_size, 20);
        assert_eq!(config.ledger.max_entries, 50);
        assert_eq!(config.secrets.cache_ttl(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [provider]
            kind = "fixture"

            [ledger]
            max_entries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.provider.kind, ProviderKind::Fixture);
        assert_eq!(config.ledger.max_entries, 5);
        assert_eq!(config.sync.max_products, 1_000);
        assert_eq!(config.provider.request_timeout_secs, 30);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();

        config.provider.api_base_url = "ftp://example.com".to_string();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.provider.api_base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        // Fixture mode never dials out, so URLs are not checked.
        config.provider.kind = ProviderKind::Fixture;
        assert!(config.validate().is_ok());

        config.sync.page_size = 0;
        assert!(config.validate().is_err());
        config.sync.page_size = 101;
        assert!(config.validate().is_err());
        config.sync.page_size = 100;
        assert!(config.validate().is_ok());

        config.ledger.max_entries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SHOPLINK_PROVIDER", "fixture"),
            ("SHOPLINK_API_VERSION", "202401"),
            ("SHOPLINK_APP_KEY", "key-1"),
            ("SHOPLINK_DATABASE_PATH", "/tmp/shoplink.db"),
            ("SHOPLINK_LEDGER_MAX_ENTRIES", "oops"),
            ("SHOPLINK_PRICE_UNIT", "minor"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.provider.kind, ProviderKind::Fixture);
        assert_eq!(config.provider.api_version, "202401");
        assert_eq!(config.provider.app_key.as_deref(), Some("key-1"));
        assert_eq!(config.provider.price_unit, PriceUnit::Minor);
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/shoplink.db")
        );
        // Unparseable values leave the default in place.
        assert_eq!(config.ledger.max_entries, 50);
    }

    #[test]
    fn test_toml_serialization() {
        let config = SyncConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[provider]"));
        assert!(toml_str.contains("[sync]"));
        assert!(toml_str.contains("[ledger]"));
    }
}
