//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory (or
//! the path given with `-f`), then applies `GOVACCT_*` env overrides. Missing
//! file and no explicit path → built-in defaults.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::crypto::CryptoSuite;
use crate::error::AppError;

pub const ENV_HEX_PRIVATE_KEY: &str = "GOVACCT_HEX_PRIVATE_KEY";
pub const ENV_NODES: &str = "GOVACCT_NODES";
pub const ENV_CONFIG_PATH: &str = "GOVACCT_CONFIG_PATH";
pub const ENV_GROUP_ID: &str = "GOVACCT_GROUP_ID";
pub const ENV_GOVERN_ADDRESS: &str = "GOVACCT_GOVERN_ADDRESS";
pub const ENV_LOG_LEVEL: &str = "GOVACCT_LOG_LEVEL";

const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

/// Which ledger backend serves the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    JsonRpc,
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonrpc" | "json-rpc" => Ok(BackendKind::JsonRpc),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown backend '{other}' (expected jsonrpc or memory)")),
        }
    }
}

/// URL scheme used to reach peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(format!("unknown scheme '{other}' (expected http or https)")),
        }
    }
}

/// Raw inputs of the bootstrap core.
#[derive(Debug, Clone)]
pub struct SystemSettings {
    /// Hex private key to import; `None` → generate.
    pub hex_private_key: Option<String>,
    /// `;`-delimited peer list.
    pub node_str: String,
    /// Crypto-material root (already expanded, no `~`).
    pub config_path: PathBuf,
    pub group_id: String,
    /// Existing governance contract; `None` → deploy.
    pub govern_contract_address: Option<String>,
    pub crypto_suite: CryptoSuite,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkSettings {
    pub backend: BackendKind,
    pub scheme: Scheme,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub system: SystemSettings,
    pub network: NetworkSettings,
    pub log_level: String,
}

/// Env-var overrides, captured once so tests can pass them explicitly.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub hex_private_key: Option<String>,
    pub nodes: Option<String>,
    pub config_path: Option<String>,
    pub group_id: Option<String>,
    pub govern_address: Option<String>,
    pub log_level: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            hex_private_key: env::var(ENV_HEX_PRIVATE_KEY).ok(),
            nodes: env::var(ENV_NODES).ok(),
            config_path: env::var(ENV_CONFIG_PATH).ok(),
            group_id: env::var(ENV_GROUP_ID).ok(),
            govern_address: env::var(ENV_GOVERN_ADDRESS).ok(),
            log_level: env::var(ENV_LOG_LEVEL).ok(),
        }
    }
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    system: RawSystem,
    #[serde(default)]
    network: RawNetwork,
    #[serde(default)]
    logging: RawLogging,
}

#[derive(Deserialize)]
struct RawSystem {
    #[serde(default)]
    hex_private_key: Option<String>,
    #[serde(default = "default_node_str")]
    node_str: String,
    #[serde(default = "default_config_path")]
    config_path: String,
    /// Accepts `group_id = 1` as well as `group_id = "1"`.
    #[serde(default = "default_group_id")]
    group_id: toml::Value,
    #[serde(default)]
    govern_contract_address: Option<String>,
    #[serde(default = "default_crypto_suite")]
    crypto_suite: String,
}

impl Default for RawSystem {
    fn default() -> Self {
        Self {
            hex_private_key: None,
            node_str: default_node_str(),
            config_path: default_config_path(),
            group_id: default_group_id(),
            govern_contract_address: None,
            crypto_suite: default_crypto_suite(),
        }
    }
}

#[derive(Deserialize)]
struct RawNetwork {
    #[serde(default = "default_backend")]
    backend: String,
    #[serde(default = "default_scheme")]
    scheme: String,
}

impl Default for RawNetwork {
    fn default() -> Self {
        Self { backend: default_backend(), scheme: default_scheme() }
    }
}

#[derive(Deserialize)]
struct RawLogging {
    #[serde(default = "default_log_level")]
    level: String,
}

impl Default for RawLogging {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_node_str() -> String { "127.0.0.1:20200".to_string() }
fn default_config_path() -> String { "conf".to_string() }
fn default_group_id() -> toml::Value { toml::Value::Integer(1) }
fn default_crypto_suite() -> String { "ecdsa".to_string() }
fn default_backend() -> String { "jsonrpc".to_string() }
fn default_scheme() -> String { "http".to_string() }
fn default_log_level() -> String { "info".to_string() }

/// Load config from the given path, or `config/default.toml`, then apply env-var overrides.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let overrides = EnvOverrides::from_env();

    if let Some(path) = config_path {
        return load_from(Path::new(path), &overrides);
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        load_from(default_path, &overrides)
    } else {
        resolve(RawConfig::default(), &overrides)
    }
}

/// Internal loader: accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &EnvOverrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, overrides)
}

fn resolve(parsed: RawConfig, overrides: &EnvOverrides) -> Result<Config, AppError> {
    let s = parsed.system;

    let group_id = match overrides.group_id.clone() {
        Some(g) => g,
        None => match s.group_id {
            toml::Value::String(g) => g,
            toml::Value::Integer(g) => g.to_string(),
            other => {
                return Err(AppError::Config(format!(
                    "system.group_id must be a string or integer, got {}",
                    other.type_str()
                )));
            }
        },
    };

    let crypto_suite = s.crypto_suite.parse::<CryptoSuite>().map_err(AppError::Config)?;
    let backend = parsed.network.backend.parse::<BackendKind>().map_err(AppError::Config)?;
    let scheme = parsed.network.scheme.parse::<Scheme>().map_err(AppError::Config)?;

    let config_path_str = overrides.config_path.clone().unwrap_or(s.config_path);

    Ok(Config {
        system: SystemSettings {
            hex_private_key: non_blank(overrides.hex_private_key.clone().or(s.hex_private_key)),
            node_str: overrides.nodes.clone().unwrap_or(s.node_str),
            config_path: expand_home(&config_path_str),
            group_id,
            govern_contract_address: non_blank(
                overrides.govern_address.clone().or(s.govern_contract_address),
            ),
            crypto_suite,
        },
        network: NetworkSettings { backend, scheme },
        log_level: overrides.log_level.clone().unwrap_or(parsed.logging.level),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Settings for a memory-backed run against `cert_path`.
#[cfg(test)]
impl SystemSettings {
    pub fn test_default(cert_path: &Path) -> Self {
        Self {
            hex_private_key: None,
            node_str: "127.0.0.1:20200;127.0.0.1:20201".into(),
            config_path: cert_path.to_path_buf(),
            group_id: "1".into(),
            govern_contract_address: None,
            crypto_suite: CryptoSuite::Ecdsa,
        }
    }
}
