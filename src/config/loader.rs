//! Configuration Loader (Figment-based)
//!
//! Merge order, later wins:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/docloop/config.toml`)
//! 3. Project config (`./docloop.toml`)
//! 4. Environment (`DOCLOOP_WORKFLOW_MAX_RETRIES` → `workflow.max_retries`)
//!
//! CLI flags are applied on top by the caller.

use directories::BaseDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::types::Config;
use crate::types::{DocError, Result};

const APP_DIR: &str = "docloop";
const CONFIG_FILE: &str = "config.toml";
const PROJECT_CONFIG_FILE: &str = "docloop.toml";
const ENV_PREFIX: &str = "DOCLOOP_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain
    pub fn load() -> Result<Config> {
        let global = Self::global_config_path();
        let figment = Self::layered(global.as_deref(), &Self::project_config_path())
            .merge(Self::env_provider());
        Self::extract(figment)
    }

    /// Load defaults overlaid with a single file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Self::extract(Self::layered(None, path))
    }

    fn layered(global: Option<&Path>, project: &Path) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global) = global
            && global.exists()
        {
            debug!("Loading global config from: {}", global.display());
            figment = figment.merge(Toml::file(global));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        figment
    }

    fn env_provider() -> Env {
        Env::prefixed(ENV_PREFIX).map(|key| env_key_path(key.as_str()).into())
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| DocError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Paths
    // =========================================================================

    pub fn global_dir() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.config_dir().join(APP_DIR))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write the default config to `path`; existing files are kept unless
    /// `force` is set. Returns whether a file was written.
    pub fn init_at(path: &Path, force: bool) -> Result<bool> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(false);
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, Self::default_config_toml()?)?;
        info!("Created config: {}", path.display());
        Ok(true)
    }

    pub fn init_global(force: bool) -> Result<(PathBuf, bool)> {
        let path = Self::global_config_path().ok_or_else(|| {
            DocError::Config("Cannot determine global config directory".to_string())
        })?;
        let written = Self::init_at(&path, force)?;
        Ok((path, written))
    }

    pub fn init_project(force: bool) -> Result<(PathBuf, bool)> {
        let path = Self::project_config_path();
        let written = Self::init_at(&path, force)?;
        Ok((path, written))
    }

    fn default_config_toml() -> Result<String> {
        let body = toml::to_string_pretty(&Config::default())?;
        Ok(format!(
            "# docloop configuration\n\
             # Project ./{} overrides the global file; DOCLOOP_* variables override both.\n\
             # API keys are read from the environment (e.g. OPENAI_API_KEY).\n\n{}",
            PROJECT_CONFIG_FILE, body
        ))
    }
}

/// `workflow_max_retries` → `workflow.max_retries`
fn env_key_path(key: &str) -> String {
    key.to_lowercase().replacen('_', ".", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_env_key_path() {
        assert_eq!(env_key_path("WORKFLOW_MAX_RETRIES"), "workflow.max_retries");
        assert_eq!(env_key_path("llm_model"), "llm.model");
        assert_eq!(env_key_path("generation_request_timeout_secs"), "generation.request_timeout_secs");
    }

    #[test]
    fn test_project_overrides_global() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join("docloop.toml");
        fs::write(&global, "[workflow]\nmax_retries = 5\nmax_outline_depth = 4\n").unwrap();
        fs::write(&project, "[workflow]\nmax_retries = 2\n").unwrap();

        let config = ConfigLoader::extract(ConfigLoader::layered(Some(&global), &project)).unwrap();
        assert_eq!(config.workflow.max_retries, 2);
        assert_eq!(config.workflow.max_outline_depth, 4);
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.workflow.max_retries, 3);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docloop.toml");
        fs::write(&path, "[workflow]\nmax_retries = 0\n").unwrap();
        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(DocError::Config(_))
        ));
    }

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(ConfigLoader::init_at(&path, false).unwrap());
        assert!(!ConfigLoader::init_at(&path, false).unwrap());
        assert!(ConfigLoader::init_at(&path, true).unwrap());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("[workflow]"));
        assert!(!written.contains("api_key"));
        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.generation.transient_retries, 2);
    }
}
