//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/progwalk/progwalk.toml`
//! 3. Local config: `<dir>/.progwalk.toml`
//! 4. Environment variables: `PROGWALK_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::expand_env_vars;

/// Session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Offer the `probably` meta-answer on binary questions
    pub offer_probably: bool,
    /// Sessions idle longer than this are evicted
    pub idle_timeout_secs: u64,
}

impl SessionConfig {
    /// Idle timeout as a duration, `None` when it exceeds what chrono can represent.
    pub fn idle_timeout(&self) -> Option<chrono::Duration> {
        i64::try_from(self.idle_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            offer_probably: true,
            idle_timeout_secs: 1800,
        }
    }
}

/// Raw session config for intermediate parsing (`None` → inherit from base).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSessionConfig {
    pub offer_probably: Option<bool>,
    pub idle_timeout_secs: Option<u64>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub tree_path: Option<PathBuf>,
    #[serde(default)]
    pub session: RawSessionConfig,
}

/// Unified configuration for progwalk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Generated decision tree (JSON document)
    pub tree_path: PathBuf,
    /// Session settings
    pub session: SessionConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tree_path: default_tree_path(),
            session: SessionConfig::default(),
        }
    }
}

/// Default tree location: `<XDG data dir>/progwalk/tree.json`.
fn default_tree_path() -> PathBuf {
    ProjectDirs::from("", "", "progwalk")
        .map(|dirs| dirs.data_dir().join("tree.json"))
        .unwrap_or_else(|| PathBuf::from("tree.json"))
}

/// Get the XDG config directory for progwalk.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "progwalk").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("progwalk.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".progwalk.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.tree_path.to_string_lossy().as_ref());
        self.tree_path = PathBuf::from(expanded);
    }

    /// Merge overlay config onto self (base): overlay wins where specified.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            tree_path: overlay
                .tree_path
                .clone()
                .unwrap_or_else(|| self.tree_path.clone()),
            session: SessionConfig {
                offer_probably: overlay
                    .session
                    .offer_probably
                    .unwrap_or(self.session.offer_probably),
                idle_timeout_secs: overlay
                    .session
                    .idle_timeout_secs
                    .unwrap_or(self.session.idle_timeout_secs),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.progwalk.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Local config
        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.session.idle_timeout().is_none() {
            return Err(ApplicationError::Config {
                message: format!(
                    "session.idle_timeout_secs out of range: {}",
                    self.session.idle_timeout_secs
                ),
            });
        }
        Ok(())
    }

    /// Apply PROGWALK_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("PROGWALK").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("tree_path") {
            settings.tree_path = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("session.offer_probably") {
            settings.session.offer_probably = val;
        }
        if let Ok(val) = config.get_int("session.idle_timeout_secs") {
            settings.session.idle_timeout_secs =
                u64::try_from(val).map_err(|_| ApplicationError::Config {
                    message: format!("session.idle_timeout_secs must not be negative: {val}"),
                })?;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# progwalk configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/progwalk/progwalk.toml
#   Local:  <dir>/.progwalk.toml
#   Env:    PROGWALK_* environment variables (PROGWALK_SESSION__OFFER_PROBABLY=false)

# Generated decision tree (JSON)
# tree_path = "~/.local/share/progwalk/tree.json"

[session]
# Offer "probably" on yes/no questions (follows both branches)
# offer_probably = true

# Evict sessions idle for longer than this many seconds
# idle_timeout_secs = 1800
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
