use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "CITADEL_API_URL";

pub const DEFAULT_BASE_URL: &str = "https://rickandmortyapi.com/api/";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub cache: CacheConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
  /// Root of the catalog API; resource paths are joined onto it
  pub base_url: String,
  /// Per-request timeout
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout_secs: 10,
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
  /// Disable to run without any local persistence
  pub enabled: bool,
  /// SQLite file (default: $XDG_DATA_HOME/citadel/cache.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
  /// `EnvFilter` directive, used when RUST_LOG is unset
  pub level: String,
  /// Log to this file instead of stderr
  pub file: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "warn".to_string(),
      file: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./citadel.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/citadel/config.yaml
  ///
  /// Built-in defaults are used when no file is found. `CITADEL_API_URL`
  /// overrides the base URL in every case.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
      config.apply_api_url(url);
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("citadel.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("citadel").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file deserializes to unit, not to an empty mapping
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  fn apply_api_url(&mut self, url: String) {
    let url = url.trim();
    if !url.is_empty() {
      self.api.base_url = url.to_string();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.api.timeout_secs, 10);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.path, None);
    assert_eq!(config.log.level, "warn");
  }

  #[test]
  fn test_partial_file_keeps_other_defaults() {
    let config = Config::parse(
      "api:\n  timeout_secs: 3\ncache:\n  enabled: false\nlog:\n  file: /tmp/citadel.log\n",
    )
    .unwrap();

    assert_eq!(config.api.timeout_secs, 3);
    assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    assert!(!config.cache.enabled);
    assert_eq!(config.log.level, "warn");
    assert_eq!(config.log.file, Some(PathBuf::from("/tmp/citadel.log")));
  }

  #[test]
  fn test_empty_file_is_default() {
    assert_eq!(Config::parse("  \n").unwrap(), Config::default());
  }

  #[test]
  fn test_invalid_yaml_is_an_error() {
    assert!(Config::parse("api: [unclosed").is_err());
  }

  #[test]
  fn test_load_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "api:\n  base_url: http://localhost:9000/api/").unwrap();

    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.api.base_url, "http://localhost:9000/api/");
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");
    let err = Config::load(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_api_url_override_ignores_blank() {
    let mut config = Config::default();
    config.apply_api_url("   ".to_string());
    assert_eq!(config.api.base_url, DEFAULT_BASE_URL);

    config.apply_api_url(" http://mirror.test/api ".to_string());
    assert_eq!(config.api.base_url, "http://mirror.test/api");
  }
}
