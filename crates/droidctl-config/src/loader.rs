use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use droidctl_core::DroidError;

use crate::schema::DroidConfig;

/// Loads the droidctl configuration and keeps a shared snapshot of it.
pub struct ConfigLoader {
    config: Arc<RwLock<DroidConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > DROIDCTL_CONFIG env > ~/.droidctl/droidctl.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("DROIDCTL_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".droidctl")
            .join("droidctl.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> droidctl_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            Self::read_file(&config_path)?
        } else {
            debug!(?config_path, "config file not found, using defaults");
            DroidConfig::default()
        };

        let config = Self::apply_env_overrides(config, |k| std::env::var(k).ok());

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(reason) => {
                return Err(DroidError::ConfigValidation {
                    field: config_path.display().to_string(),
                    reason,
                });
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> DroidConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for callers that outlive the loader.
    pub fn shared(&self) -> Arc<RwLock<DroidConfig>> {
        Arc::clone(&self.config)
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn read_file(path: &Path) -> droidctl_core::Result<DroidConfig> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str::<DroidConfig>(&raw).map_err(|e| {
            DroidError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply env var overrides (DROIDCTL_ADB_PATH, DROIDCTL_LOG_LEVEL, DROIDCTL_LOG_FORMAT).
    ///
    /// `lookup` resolves a variable name to its value.
    pub fn apply_env_overrides<F>(mut config: DroidConfig, lookup: F) -> DroidConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DROIDCTL_ADB_PATH") {
            config.bridge.adb_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("DROIDCTL_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(v) = lookup("DROIDCTL_LOG_FORMAT") {
            config.logging.format = v;
        }
        config
    }

    /// Reload the config from disk.
    pub fn reload(&self) -> droidctl_core::Result<()> {
        if !self.config_path.exists() {
            return Err(DroidError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let new_config = Self::read_file(&self.config_path)?;
        let new_config = Self::apply_env_overrides(new_config, |k| std::env::var(k).ok());
        new_config
            .validate()
            .map_err(|reason| DroidError::ConfigValidation {
                field: self.config_path.display().to_string(),
                reason,
            })?;
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }
}
