use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::transport::Endpoints;

// =============================================================================
// File config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
//   config.toml:     [server]
//                    base_url = "http://10.0.0.5:5000"
//
//   env var:         DRIVER_CONSOLE_SERVER__BASE_URL=http://10.0.0.5:5000
//                    (double underscore = nesting)

const ENV_PREFIX: &str = "DRIVER_CONSOLE_";

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub endpoints: EndpointsFileConfig,
    #[serde(default)]
    pub log: LogFileConfig,
}

/// Lives under `[server]` in config.toml.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Endpoint paths (lives under `[endpoints]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointsFileConfig {
    #[serde(default = "default_state_feed")]
    pub state_feed: String,
    #[serde(default = "default_driver_name")]
    pub driver_name: String,
    #[serde(default = "default_register_driver")]
    pub register_driver: String,
}

impl Default for EndpointsFileConfig {
    fn default() -> Self {
        Self {
            state_feed: default_state_feed(),
            driver_name: default_driver_name(),
            register_driver: default_register_driver(),
        }
    }
}

/// State log tunables (lives under `[log]` in config.toml).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LogFileConfig {
    /// Maximum retained log entries; 0 keeps everything.
    #[serde(default)]
    pub max_entries: usize,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}
fn default_state_feed() -> String {
    "/state_feed".to_string()
}
fn default_driver_name() -> String {
    "/get_driver_name".to_string()
}
fn default_register_driver() -> String {
    "/register_driver".to_string()
}

/// Layer defaults → `config.toml` in `config_dir` → `DRIVER_CONSOLE_*` env vars.
pub fn load_config(config_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_dir.join("config.toml")))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

// =============================================================================
// Runtime config (derived from FileConfig + CLI overrides)
// =============================================================================

#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    pub base_url: String,
    pub endpoints: Endpoints,
    /// `None` = unbounded log.
    pub max_log_entries: Option<usize>,
}

impl ConsoleConfig {
    pub fn from_file(fc: &FileConfig) -> Self {
        Self {
            base_url: fc.server.base_url.clone(),
            endpoints: Endpoints {
                state_feed: fc.endpoints.state_feed.clone(),
                driver_name: fc.endpoints.driver_name.clone(),
                register_driver: fc.endpoints.register_driver.clone(),
            },
            max_log_entries: (fc.log.max_entries > 0).then_some(fc.log.max_entries),
        }
    }

    /// Load from `config_dir` (or the default location) and apply the CLI server override.
    pub fn load(config_dir: Option<PathBuf>, server: Option<String>) -> Result<Self> {
        let dir = match config_dir {
            Some(dir) => dir,
            None => default_config_dir()?,
        };
        let fc: FileConfig = load_config(&dir)
            .extract()
            .with_context(|| format!("Invalid configuration in {}", dir.display()))?;

        let mut config = Self::from_file(&fc);
        if let Some(server) = server {
            config.base_url = server;
        }
        Ok(config)
    }
}

pub fn default_config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not find config directory")?;
    Ok(base.join("driver_console"))
}
