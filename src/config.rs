//! Configuration for the fleet CLIs
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (fleet.toml)
//! - Environment variables (FLEET_*)
//!
//! ## Example config file (fleet.toml):
//! ```toml
//! [corpus]
//! schemas_dir = "./schemas"
//! instances_dir = "./instances"
//!
//! [export]
//! output = "generated/relationships.json"
//! pretty = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the fleet tools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Corpus locations
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Relationship export settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Where the schema and instance trees live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Schema tree root; absent means the compiled-in canonical set
    #[serde(default)]
    pub schemas_dir: Option<PathBuf>,

    /// Instance tree root
    #[serde(default = "default_instances_dir")]
    pub instances_dir: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            schemas_dir: None,
            instances_dir: default_instances_dir(),
        }
    }
}

fn default_instances_dir() -> PathBuf {
    PathBuf::from("instances")
}

/// Relationship snapshot export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Where the car -> engines mapping is written
    #[serde(default = "default_export_output")]
    pub output: PathBuf,

    /// Pretty-print the exported JSON
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output: default_export_output(),
            pretty: true,
        }
    }
}

fn default_export_output() -> PathBuf {
    PathBuf::from("generated/relationships.json")
}

fn default_true() -> bool {
    true
}

impl FleetConfig {
    /// Layer defaults, `fleet.toml` (if present), and `FLEET_*` env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Same layering, with an explicit config file path.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::from(path.clone())),
            None => builder.add_source(File::with_name("fleet").required(false)),
        };
        builder
            .add_source(Environment::with_prefix("FLEET").separator("__"))
            .build()?
            .try_deserialize()
    }
}
