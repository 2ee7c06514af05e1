//! Workspace discovery and layout

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the directory that marks a workspace root
pub const WORKSPACE_DIR: &str = ".gk";

/// Default database location, relative to the workspace root
pub const DEFAULT_DATABASE: &str = ".gk/gk.db";

/// A directory holding a construction book (`.gk/`)
#[derive(Debug)]
pub struct Workspace {
    /// Root directory of the workspace (parent of .gk/)
    root: PathBuf,
}

impl Workspace {
    /// Find the workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, WorkspaceError> {
        let current =
            std::env::current_dir().map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find the workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(WorkspaceError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create `.gk/` with a default config at the given path
    ///
    /// With `force`, an existing `.gk/` is reused and its config rewritten.
    pub fn init(path: &Path, force: bool) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let gk_dir = root.join(WORKSPACE_DIR);
        if gk_dir.exists() && !force {
            return Err(WorkspaceError::AlreadyExists(root));
        }

        std::fs::create_dir_all(&gk_dir).map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        std::fs::write(gk_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# Construction book workspace configuration

# Acting username (can be overridden with --user or GK_USER)
# user: ""

# SQLite database, relative to the workspace root
# database: .gk/gk.db

# Project code to act on (default: the first project)
# project: ""

# Default output format (auto, json, yaml, tsv, csv, id)
# default_format: auto
"#
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .gk directory
    pub fn gk_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.gk_dir().join("config.yaml")
    }

    /// Resolve a database path; relative paths are taken from the root
    pub fn database_path(&self, configured: Option<&str>) -> PathBuf {
        let path = Path::new(configured.unwrap_or(DEFAULT_DATABASE));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Errors that can occur while locating a workspace
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("not a gk workspace (searched from {searched_from:?}). Run 'gk init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("gk workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
