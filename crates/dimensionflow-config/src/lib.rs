//! DimensionFlow configuration
//!
//! A single YAML file carries the account credentials, compute provider
//! settings and the resource templates:
//!
//! ```yaml
//! credentials:
//!   username: admin
//!   password: secret
//!   region: dd-eu
//! compute:
//!   server_concurrency: 2
//! templates:
//!   - name: workers
//!     datacenter: NA12
//!     networkName: Cluster-Network
//!     instanceNamePrefix: cluster1
//! ```

pub mod error;

pub use error::*;

use dimensionflow_cloud::Credentials;
use dimensionflow_compute::{ComputeSettings, ResourceTemplate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "DIMENSIONFLOW_CONFIG_PATH";

const CANDIDATES: [&str; 2] = ["dimensionflow.local.yaml", "dimensionflow.yaml"];

/// Loaded configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub credentials: Option<Credentials>,

    pub compute: ComputeSettings,

    pub templates: Vec<ResourceTemplate>,
}

impl ProviderConfig {
    pub fn from_yaml_str(content: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content, path)
    }

    pub fn template(&self, name: &str) -> Result<&ResourceTemplate> {
        self.templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ConfigError::TemplateNotFound(name.to_string()))
    }
}

/// Discover and load the configuration file
pub fn load_config() -> Result<ProviderConfig> {
    let path = find_config_file()?;
    ProviderConfig::load(&path)
}

/// DimensionFlow configuration directory, created when absent
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("dimensionflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Locate the configuration file.
///
/// Search order:
/// 1. `DIMENSIONFLOW_CONFIG_PATH` (direct path)
/// 2. current directory: `dimensionflow.local.yaml`, `dimensionflow.yaml`
/// 3. `./.dimensionflow/` with the same candidates
/// 4. `<config dir>/dimensionflow/dimensionflow.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} points at {} which does not exist",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;

    if let Some(path) = first_existing(&current_dir) {
        return Ok(path);
    }

    let project_dir = current_dir.join(".dimensionflow");
    if project_dir.is_dir() {
        if let Some(path) = first_existing(&project_dir) {
            return Ok(path);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("dimensionflow").join("dimensionflow.yaml");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}
