use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const TOKEN_SYMMETRIC_KEY_ENV: &str = "TOKEN_SYMMETRIC_KEY";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    #[serde(default)]
    pub rotation: LogRotation,
    pub gateway: GatewayConfig,
    /// Runs on the in-memory stores when unset
    #[serde(default)]
    pub postgres_url: Option<String>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// How often the log file rolls over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    Daily,
    #[default]
    Never,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret, at least 32 bytes
    pub token_symmetric_key: String,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,
}

fn default_access_ttl() -> i64 {
    15 * 60
}

fn default_refresh_ttl() -> i64 {
    24 * 60 * 60
}

impl AuthConfig {
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_ttl_secs)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_token_ttl_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerConfig {
    pub transfer_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transfer_timeout_ms: 5_000,
        }
    }
}

impl LedgerConfig {
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }
}

impl AppConfig {
    /// Read `config/<env>.yaml`, then apply environment overrides
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{env}.yaml");
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config file: {config_path}"))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("failed to parse config file: {config_path}"))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|v| !v.is_empty()) {
            self.postgres_url = Some(url);
        }
        if let Some(key) = lookup(TOKEN_SYMMETRIC_KEY_ENV).filter(|v| !v.is_empty()) {
            self.auth.token_symmetric_key = key;
        }
    }
}
