use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const BACKEND_URL_ENV: &str = "TR4CTION_BACKEND_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub backend_url: Option<String>,
    /// Forces production behaviour (no diagnostic logging of error bodies).
    /// When unset it is inferred from the backend host.
    pub production: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content).map_err(|e| CoreError::io(path, e))?;
        Ok(())
    }

    pub fn save_backend_url(url: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.backend_url = Some(url.to_string());
        config.save()
    }

    /// Backend base URL: CLI flag, then `TR4CTION_BACKEND_URL`, then the file, then the default.
    pub fn resolve_backend_url(&self, cli_override: Option<&str>) -> String {
        let env = std::env::var(BACKEND_URL_ENV).ok();
        self.resolve_backend_url_with(cli_override, env.as_deref())
    }

    pub fn resolve_backend_url_with(&self, cli_override: Option<&str>, env: Option<&str>) -> String {
        let url = cli_override
            .or(env)
            .or(self.backend_url.as_deref())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_BACKEND_URL);
        url.trim_end_matches('/').to_string()
    }

    /// Anything that is not a loopback backend counts as production.
    pub fn is_production(&self, backend_url: &str) -> bool {
        if let Some(flag) = self.production {
            return flag;
        }
        match reqwest::Url::parse(backend_url) {
            Ok(url) => !matches!(url.host_str(), Some("localhost") | Some("127.0.0.1")),
            Err(_) => true,
        }
    }

    /// `~/.config/tr4ction` (or the platform equivalent).
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CoreError::config("Could not determine config directory"))?;

        Ok(config_dir.join("tr4ction"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            backend_url: Some("http://example.org/api".into()),
            production: Some(false),
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn backend_url_precedence() {
        let config = Config {
            backend_url: Some("http://file/".into()),
            production: None,
        };
        assert_eq!(
            config.resolve_backend_url_with(Some("http://cli/"), Some("http://env")),
            "http://cli"
        );
        assert_eq!(config.resolve_backend_url_with(None, Some("http://env")), "http://env");
        assert_eq!(config.resolve_backend_url_with(None, None), "http://file");
        assert_eq!(
            Config::new().resolve_backend_url_with(None, Some("  ")),
            DEFAULT_BACKEND_URL
        );
    }

    #[test]
    fn production_inferred_from_host() {
        let config = Config::new();
        assert!(!config.is_production("http://127.0.0.1:8000"));
        assert!(!config.is_production("http://localhost:8000/api"));
        assert!(config.is_production("http://3.235.65.249/api"));

        let forced = Config {
            backend_url: None,
            production: Some(false),
        };
        assert!(!forced.is_production("https://agent.example.com"));
    }
}
