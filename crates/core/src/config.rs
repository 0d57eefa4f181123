use std::{collections::HashMap, fmt, path::PathBuf, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{
    cycle::{CycleCatalog, CycleSpec},
    error::InvalidCycleConfig,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cycle variants to poll, by name
    #[serde(default = "default_variants")]
    pub variants: Vec<String>,

    /// Seconds between two evaluations of the same variant
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Default tracing filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for the hourly rotated log files
    #[serde(default = "default_compute_dir")]
    pub log_dir: PathBuf,

    /// Number of rotated log files to keep
    #[serde(default = "default_log_max_files")]
    pub log_max_files: usize,

    /// Directory for the hourly CSV records of profitable cycles
    #[serde(default = "default_compute_dir")]
    pub records_dir: PathBuf,

    #[serde(default)]
    pub binance: BinanceConfig,

    /// Extra cycle variants, or overrides of the built-in ones
    #[serde(default)]
    pub cycles: HashMap<String, CycleSpec>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BinanceConfig {
    /// Only needed for rate limits; the book ticker is a public endpoint
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    /// REST endpoint override, e.g. for the testnet
    pub api_url: Option<String>,
}

impl fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

fn default_variants() -> Vec<String> {
    vec!["ada-1000".to_string(), "wif-100".to_string()]
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_compute_dir() -> PathBuf {
    PathBuf::from("logs/compute")
}

fn default_log_max_files() -> usize {
    240
}

impl Default for Config {
    fn default() -> Self {
        Self {
            variants: default_variants(),
            poll_interval_secs: default_poll_interval_secs(),
            log_level: default_log_level(),
            log_dir: default_compute_dir(),
            log_max_files: default_log_max_files(),
            records_dir: default_compute_dir(),
            binance: BinanceConfig::default(),
            cycles: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from `quadra.yaml` (optional) and `QUADRA_` prefixed env vars.
    ///
    /// Nested keys use `__`, e.g. `QUADRA_BINANCE__API_KEY`.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::new()
            .merge(Yaml::file("quadra.yaml"))
            .merge(Env::prefixed("QUADRA_").split("__"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// The built-in variants plus everything under `cycles`.
    pub fn catalog(&self) -> Result<CycleCatalog, InvalidCycleConfig> {
        CycleCatalog::builtin().extend(self.cycles.clone())
    }
}
