//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - built-in defaults
//! - `kong.toml` in the working directory
//! - environment variables (`KONG_*` prefix)
//!
//! ## Example
//!
//! ```toml
//! # kong.toml
//! [oracle]
//! binary = "caesar.bdd"
//! bdd_timeout_secs = 60
//!
//! [reducer]
//! binary = "reduce"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! KONG_ORACLE__BDD_TIMEOUT_SECS=120
//! KONG_REDUCER__BINARY=shrink
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Top-level configuration for a Kong invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub oracle: OracleConfig,
    pub reducer: ReducerConfig,
    pub checker: CheckerConfig,
    pub units: UnitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the base oracle (`caesar.bdd`) invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Oracle binary name or path.
    #[serde(default = "default_oracle_binary")]
    pub binary: String,

    /// Time limit (seconds) for marking-graph exploration, passed through
    /// verbatim as `CAESAR_BDD_TIMEOUT`.
    #[serde(default)]
    pub bdd_timeout_secs: Option<u64>,

    /// Iteration limit for marking-graph exploration, passed through
    /// verbatim as `CAESAR_BDD_ITERATIONS`.
    #[serde(default)]
    pub bdd_iterations: Option<u64>,
}

/// Settings for the structural reducer invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReducerConfig {
    /// Primary reducer binary (`reduce`).
    #[serde(default = "default_reducer_binary")]
    pub binary: String,

    /// Fallback reducer binary used when `-sk`/`--shrink` is set or the
    /// primary binary is not on `PATH`.
    #[serde(default = "default_reducer_fallback")]
    pub fallback_binary: String,

    #[serde(default = "default_redundant_limit")]
    pub redundant_limit: u32,
    #[serde(default = "default_redundant_time")]
    pub redundant_time: u32,
    #[serde(default = "default_inv_limit")]
    pub inv_limit: u32,
    #[serde(default = "default_inv_time")]
    pub inv_time: u32,
}

/// Settings for the reachability checker (`sift`) invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    #[serde(default = "default_checker_binary")]
    pub binary: String,
}

/// Settings for the NUPN conversion tool (`ndrio`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitsConfig {
    #[serde(default = "default_units_binary")]
    pub binary: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_oracle_binary() -> String {
    "caesar.bdd".to_string()
}
fn default_reducer_binary() -> String {
    "reduce".to_string()
}
fn default_reducer_fallback() -> String {
    "shrink".to_string()
}
fn default_checker_binary() -> String {
    "sift".to_string()
}
fn default_units_binary() -> String {
    "ndrio".to_string()
}
fn default_redundant_limit() -> u32 {
    650
}
fn default_redundant_time() -> u32 {
    10
}
fn default_inv_limit() -> u32 {
    1000
}
fn default_inv_time() -> u32 {
    10
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            binary: default_oracle_binary(),
            bdd_timeout_secs: None,
            bdd_iterations: None,
        }
    }
}

impl Default for ReducerConfig {
    fn default() -> Self {
        ReducerConfig {
            binary: default_reducer_binary(),
            fallback_binary: default_reducer_fallback(),
            redundant_limit: default_redundant_limit(),
            redundant_time: default_redundant_time(),
            inv_limit: default_inv_limit(),
            inv_time: default_inv_time(),
        }
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            binary: default_checker_binary(),
        }
    }
}

impl Default for UnitsConfig {
    fn default() -> Self {
        UnitsConfig {
            binary: default_units_binary(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            oracle: OracleConfig::default(),
            reducer: ReducerConfig::default(),
            checker: CheckerConfig::default(),
            units: UnitsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration, merging in order: built-in defaults,
    /// `kong.toml` in the working directory, then `KONG_*` env vars.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file("kong.toml"))
            .merge(Env::prefixed("KONG_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("KONG_").split("__"))
            .extract()
    }
}
