//! Validator configuration
//!
//! Defaults mirror the deployment the tool was written for. Every value can be
//! overridden from a YAML file, and the binaries layer CLI flags / env vars on top.

use crate::error::{ValidatorError, ValidatorResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Root folder holding client data (the reference workbook lives under it)
pub const CLIENT_DATA_PATH: &str = "./data/mycarbon";

/// Sheet validated when none is chosen
pub const DEFAULT_SCOPE: &str = "TestScope";

/// Excel table read when none is chosen and the rules name none
pub const DEFAULT_TABLE: &str = "TestScopeCalcs";

/// Stylesheet inlined into HTML reports when present
pub const DEFAULT_CSS_PATH: &str = "assets/styles.css";

/// Logo shown on the upload page when present
pub const DEFAULT_LOGO_PATH: &str = "assets/logo.png";

/// Location of the reference workbook below a client data folder
pub fn validations_path(base_path: Option<&Path>) -> PathBuf {
    let base = base_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CLIENT_DATA_PATH));
    base.join("Validations").join("validations.xlsx")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory the JSON API may read workbooks from
    pub file_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            file_root: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// Resolve a workbook path sent to the JSON API.
    ///
    /// Relative paths are taken from `file_root`. Paths with `..` components,
    /// or that end up outside the root once symlinks are followed, are refused
    /// with `AccessDenied`. A missing file inside the root is an IO error.
    pub fn resolve_file(&self, requested: &str) -> ValidatorResult<PathBuf> {
        let requested_path = Path::new(requested);
        let denied = || ValidatorError::AccessDenied {
            path: requested.to_string(),
        };

        if requested_path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(denied());
        }

        let root = fs::canonicalize(&self.file_root).map_err(|e| {
            ValidatorError::Config(format!(
                "Cannot open file root {}: {}",
                self.file_root.display(),
                e
            ))
        })?;

        let candidate = if requested_path.is_absolute() {
            requested_path.to_path_buf()
        } else {
            root.join(requested_path)
        };
        if !candidate.starts_with(&root) && !candidate.starts_with(&self.file_root) {
            return Err(denied());
        }

        let resolved = fs::canonicalize(&candidate)?;
        if !resolved.starts_with(&root) {
            tracing::warn!("Refused {}: resolves outside {}", requested, root.display());
            return Err(denied());
        }
        Ok(resolved)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub client_data_path: PathBuf,
    pub default_scope: String,
    pub default_table: String,
    pub css_path: Option<PathBuf>,
    pub logo_path: Option<PathBuf>,
    pub server: ServerConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            client_data_path: PathBuf::from(CLIENT_DATA_PATH),
            default_scope: DEFAULT_SCOPE.to_string(),
            default_table: DEFAULT_TABLE.to_string(),
            css_path: Some(PathBuf::from(DEFAULT_CSS_PATH)),
            logo_path: Some(PathBuf::from(DEFAULT_LOGO_PATH)),
            server: ServerConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Parse a YAML config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> ValidatorResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ValidatorError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> ValidatorResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ValidatorConfig = serde_yaml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> ValidatorResult<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validations_path(&self) -> PathBuf {
        validations_path(Some(&self.client_data_path))
    }

    /// Stylesheet contents, if the configured file exists and is readable
    pub fn stylesheet(&self) -> Option<String> {
        let path = self.css_path.as_ref()?;
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(path) {
            Ok(css) => Some(css),
            Err(e) => {
                tracing::warn!("Cannot read stylesheet {}: {}", path.display(), e);
                None
            }
        }
    }

    fn check(&self) -> ValidatorResult<()> {
        if self.default_scope.trim().is_empty() {
            return Err(ValidatorError::Config(
                "default_scope must not be empty".to_string(),
            ));
        }
        if self.server.host.trim().is_empty() {
            return Err(ValidatorError::Config(
                "server.host must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
