use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tessera_evaluator::RenderOptions;

pub const DEFAULT_CONFIG_NAME: &str = "tessera.config.json";

/// Tessera configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding `<id>.json` component records
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    /// Log level used when `--verbose` is not given
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Render session options
    #[serde(default)]
    pub render: RenderOptions,
}

fn default_store_dir() -> String {
    "components".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("{}: {}", config_path.display(), e))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Absolute path to the component store
    pub fn get_store_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.store_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            log_level: default_log_level(),
            render: RenderOptions::default(),
        }
    }
}
