use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG: &str = "SCROLLSHADE_CONFIG";
pub const ENV_CONFIG_DIR: &str = "SCROLLSHADE_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "scrollshade";
const APPLICATION: &str = "scrollshade";

const DEFAULT_CONFIG_FILE: &str = "scene.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

/// Where the scene configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` or `SCROLLSHADE_CONFIG`; must exist.
    Explicit(PathBuf),
    /// `<config dir>/scene.toml`.
    Default(PathBuf),
    /// Nothing on disk; built-in defaults apply.
    BuiltIn,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(path) | Self::Default(path) => Some(path),
            Self::BuiltIn => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Explicit(path) => path.display().to_string(),
            Self::Default(path) => format!("{} (default location)", path.display()),
            Self::BuiltIn => "built-in defaults".to_string(),
        }
    }
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn default_config_file(&self) -> PathBuf {
        self.config_dir.join(DEFAULT_CONFIG_FILE)
    }

    /// Picks the configuration file: an explicit path wins, then the default
    /// location if it exists, otherwise built-in defaults.
    pub fn resolve_config(&self, explicit: Option<&Path>) -> ConfigSource {
        if let Some(path) = explicit {
            return ConfigSource::Explicit(path.to_path_buf());
        }
        let default = self.default_config_file();
        if default.is_file() {
            ConfigSource::Default(default)
        } else {
            ConfigSource::BuiltIn
        }
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
