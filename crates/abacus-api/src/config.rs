use abacus_core::{CalcError, CalcResult, OperationCosts, ServiceConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_size_kb")]
    pub max_body_size_kb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), max_body_size_kb: default_max_body_size_kb() }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PoolConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { workers: default_workers() }
    }
}

/// Per-operator simulated durations in milliseconds
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CostsConfig {
    #[serde(default = "default_cost_ms")]
    pub plus_ms: i64,
    #[serde(default = "default_cost_ms")]
    pub minus_ms: i64,
    #[serde(default = "default_cost_ms")]
    pub multiply_ms: i64,
    #[serde(default = "default_cost_ms")]
    pub divide_ms: i64,
}

impl Default for CostsConfig {
    fn default() -> Self {
        Self {
            plus_ms: default_cost_ms(),
            minus_ms: default_cost_ms(),
            multiply_ms: default_cost_ms(),
            divide_ms: default_cost_ms(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StoreConfig {
    /// JSON snapshot written on shutdown and restored on start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct AbacusConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub costs: CostsConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl AbacusConfig {
    /// Config file location: explicit path, then `ABACUS_CONFIG_PATH`, then `abacus.toml`
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit.map(Path::to_path_buf).unwrap_or_else(|| {
            std::env::var("ABACUS_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("abacus.toml"))
        })
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        let config_str = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Configuration file '{}' not found. Using default configuration.",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read '{}'", path.display()));
            }
        };

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Failed to parse configuration file '{}'", path.display()))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        Ok(toml::from_str(config_str)?)
    }

    /// Apply `ABACUS_HOST`, `ABACUS_PORT` and `ABACUS_WORKERS`
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("ABACUS_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("ABACUS_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid ABACUS_PORT"),
            }
        }
        if let Ok(workers) = std::env::var("ABACUS_WORKERS") {
            match workers.parse::<usize>() {
                Ok(workers) => self.pool.workers = workers,
                Err(_) => warn!(value = %workers, "Ignoring invalid ABACUS_WORKERS"),
            }
        }

        info!(
            host = %self.server.host,
            port = self.server.port,
            workers = self.pool.workers,
            "Configuration resolved"
        );
        self
    }

    pub fn validate(&self) -> CalcResult<()> {
        if self.pool.workers == 0 {
            return Err(CalcError::config("pool.workers", "at least one worker is required"));
        }
        self.max_body_bytes()?;
        self.operation_costs().map(|_| ())
    }

    /// Request body limit in bytes
    pub fn max_body_bytes(&self) -> CalcResult<usize> {
        self.server.max_body_size_kb.checked_mul(1024).ok_or_else(|| {
            CalcError::config("server.max_body_size_kb", "limit does not fit in memory addresses")
        })
    }

    pub fn operation_costs(&self) -> CalcResult<OperationCosts> {
        let costs = &self.costs;
        OperationCosts::from_millis(costs.plus_ms, costs.minus_ms, costs.multiply_ms, costs.divide_ms)
    }

    pub fn service_config(&self) -> CalcResult<ServiceConfig> {
        self.validate()?;
        Ok(ServiceConfig { workers: self.pool.workers, costs: self.operation_costs()? })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_body_size_kb() -> usize {
    64
}
fn default_workers() -> usize {
    10
}
fn default_cost_ms() -> i64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AbacusConfig::from_toml_str("").unwrap();
        assert_eq!(config, AbacusConfig::default());
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.pool.workers, 10);
        assert_eq!(config.costs.divide_ms, 1000);
        assert!(config.store.snapshot_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let config = AbacusConfig::from_toml_str(
            r#"
[server]
port = 9000

[pool]
workers = 3

[costs]
plus_ms = 5
multiply_ms = 0

[store]
snapshot_path = "state.json"
"#,
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.pool.workers, 3);
        assert_eq!(config.costs.plus_ms, 5);
        assert_eq!(config.costs.minus_ms, 1000);
        assert_eq!(config.store.snapshot_path, Some(PathBuf::from("state.json")));

        let service = config.service_config().unwrap();
        assert_eq!(service.workers, 3);
        assert_eq!(service.costs.multiply, std::time::Duration::ZERO);
    }

    #[test]
    fn test_validation() {
        let mut config = AbacusConfig::default();
        config.pool.workers = 0;
        assert!(matches!(
            config.validate(),
            Err(CalcError::ConfigValidation { ref setting, .. }) if setting == "pool.workers"
        ));

        let mut config = AbacusConfig::default();
        config.costs.minus_ms = -1;
        assert!(matches!(
            config.service_config(),
            Err(CalcError::ConfigValidation { ref setting, .. }) if setting == "minus"
        ));

        let mut config = AbacusConfig::default();
        assert_eq!(config.max_body_bytes().unwrap(), 64 * 1024);
        config.server.max_body_size_kb = usize::MAX;
        assert!(matches!(
            config.validate(),
            Err(CalcError::ConfigValidation { ref setting, .. })
                if setting == "server.max_body_size_kb"
        ));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(AbacusConfig::from_toml_str("[pool]\nworkers = \"many\"").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("abacus-config-that-does-not-exist.toml");
        let config = AbacusConfig::load(&path).unwrap();
        assert_eq!(config, AbacusConfig::default());
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = AbacusConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert_eq!(AbacusConfig::from_toml_str(&rendered).unwrap(), config);
    }
}
