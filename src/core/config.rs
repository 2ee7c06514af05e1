//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::workspace::Workspace;

/// gk configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Acting username
    pub user: Option<String>,

    /// SQLite database path
    pub database: Option<String>,

    /// Project code to act on
    pub project: Option<String>,

    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load_for(workspace: Option<&Workspace>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/gk/config.yaml)
        if let Some(global) = Self::global_config_path().and_then(|p| Self::from_file(&p)) {
            config.merge(global);
        }

        // 3. Workspace config (.gk/config.yaml)
        if let Some(local) = workspace.and_then(|ws| Self::from_file(&ws.config_path())) {
            config.merge(local);
        }

        // 4. Environment variables
        config.merge(Self::from_env(|key| std::env::var(key).ok()));

        config
    }

    /// Read one config file; missing or malformed files are skipped
    pub fn from_file(path: &Path) -> Option<Config> {
        let contents = std::fs::read_to_string(path).ok()?;
        let blank = contents
            .lines()
            .map(str::trim)
            .all(|l| l.is_empty() || l.starts_with('#'));
        if blank {
            return Some(Config::default());
        }
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
                None
            }
        }
    }

    fn from_env(var: impl Fn(&str) -> Option<String>) -> Config {
        Config {
            user: var("GK_USER"),
            database: var("GK_DATABASE"),
            project: var("GK_PROJECT"),
            default_format: None,
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "gk")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.project.is_some() {
            self.project = other.project;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_later_layers_win() {
        let mut config = Config {
            user: Some("global".to_string()),
            database: Some("global.db".to_string()),
            ..Config::default()
        };
        config.merge(Config {
            user: Some("local".to_string()),
            project: Some("P1".to_string()),
            ..Config::default()
        });

        assert_eq!(config.user.as_deref(), Some("local"));
        assert_eq!(config.database.as_deref(), Some("global.db"));
        assert_eq!(config.project.as_deref(), Some("P1"));
    }

    #[test]
    fn test_env_layer() {
        let env = Config::from_env(|key| match key {
            "GK_USER" => Some("jsmith".to_string()),
            _ => None,
        });
        assert_eq!(env.user.as_deref(), Some("jsmith"));
        assert!(env.database.is_none());
    }

    #[test]
    fn test_workspace_file_is_read() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path(), false).unwrap();
        assert_eq!(Config::from_file(&ws.config_path()), Some(Config::default()));

        std::fs::write(ws.config_path(), "user: nadzor\nproject: BR-1\n").unwrap();
        let config = Config::from_file(&ws.config_path()).unwrap();
        assert_eq!(config.user.as_deref(), Some("nadzor"));
        assert_eq!(config.project.as_deref(), Some("BR-1"));

        assert!(Config::from_file(&tmp.path().join("missing.yaml")).is_none());
    }
}
