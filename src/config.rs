use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::gateway::DEFAULT_CACHE_TTL_SECS;

/// Environment variable that overrides `api.base_url`.
pub const BASE_URL_ENV: &str = "CLEANDESK_API_URL";

/// Environment variable holding the bearer token handed out by the identity provider.
pub const TOKEN_ENV: &str = "CLEANDESK_API_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub base_url: String,
  /// Seconds a GET response stays cached
  #[serde(default = "default_cache_ttl_secs")]
  pub cache_ttl_secs: u64,
  /// Per-request timeout; unset means wait indefinitely
  #[serde(default)]
  pub request_timeout_secs: Option<u64>,
  /// Field the API wraps payloads in (e.g. "data"); unwrapped by a response interceptor
  #[serde(default)]
  pub envelope_field: Option<String>,
}

fn default_cache_ttl_secs() -> u64 {
  DEFAULT_CACHE_TTL_SECS.unsigned_abs()
}

/// Convert a TTL in whole seconds, rejecting values chrono cannot represent.
pub fn ttl_from_secs(secs: u64) -> Result<chrono::Duration> {
  i64::try_from(secs)
    .ok()
    .and_then(chrono::Duration::try_seconds)
    .ok_or_else(|| eyre!("TTL of {} seconds is out of range", secs))
}

impl ApiConfig {
  fn from_base_url(base_url: String) -> Self {
    Self {
      base_url,
      cache_ttl_secs: default_cache_ttl_secs(),
      request_timeout_secs: None,
      envelope_field: None,
    }
  }

  pub fn cache_ttl(&self) -> Result<chrono::Duration> {
    ttl_from_secs(self.cache_ttl_secs)
  }

  pub fn request_timeout(&self) -> Option<Duration> {
    self.request_timeout_secs.map(Duration::from_secs)
  }
}

impl Config {
  /// Load configuration from file and environment.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./cleandesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cleandesk/config.yaml
  ///
  /// The base URL comes from `base_url_override`, then `CLEANDESK_API_URL`,
  /// then the file. Either override is enough on its own when no file exists.
  pub fn load(explicit_path: Option<&Path>, base_url_override: Option<String>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let url_override = base_url_override.or_else(|| {
      std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|u| !u.trim().is_empty())
    });

    let config = match (path, url_override) {
      (Some(p), url_override) => {
        let mut config = Self::load_from_path(&p)?;
        if let Some(url) = url_override {
          config.api.base_url = url;
        }
        config
      }
      (None, Some(url)) => Config {
        api: ApiConfig::from_base_url(url),
      },
      (None, None) => {
        return Err(eyre!(
          "No configuration found. Create ~/.config/cleandesk/config.yaml or set {}.",
          BASE_URL_ENV
        ))
      }
    };

    config.validated()
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("cleandesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("cleandesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  fn validated(mut self) -> Result<Self> {
    let trimmed = self.api.base_url.trim().trim_end_matches('/').to_string();
    let url = Url::parse(&trimmed)
      .map_err(|e| eyre!("Invalid API base URL '{}': {}", self.api.base_url, e))?;

    if !matches!(url.scheme(), "http" | "https") {
      return Err(eyre!(
        "API base URL must be http or https, got '{}'",
        url.scheme()
      ));
    }

    self
      .api
      .cache_ttl()
      .map_err(|e| eyre!("Invalid api.cache_ttl_secs: {}", e))?;

    self.api.base_url = trimmed;
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_yaml_uses_defaults() {
    let config = Config::from_yaml("api:\n  base_url: https://api.example.com/v1/\n")
      .and_then(Config::validated)
      .expect("valid config");

    assert_eq!(config.api.base_url, "https://api.example.com/v1");
    assert_eq!(config.api.cache_ttl_secs, 60);
    assert_eq!(config.api.request_timeout(), None);
    assert_eq!(config.api.envelope_field, None);
  }

  #[test]
  fn test_full_yaml() {
    let yaml = r#"
api:
  base_url: http://localhost:8080
  cache_ttl_secs: 15
  request_timeout_secs: 30
  envelope_field: data
"#;
    let config = Config::from_yaml(yaml)
      .and_then(Config::validated)
      .expect("valid config");

    assert_eq!(
      config.api.cache_ttl().expect("ttl in range"),
      chrono::Duration::seconds(15)
    );
    assert_eq!(config.api.request_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(config.api.envelope_field.as_deref(), Some("data"));
  }

  #[test]
  fn test_rejects_non_http_base_url() {
    let config = Config {
      api: ApiConfig::from_base_url("ftp://files.example.com".to_string()),
    };
    assert!(config.validated().is_err());
  }

  #[test]
  fn test_rejects_garbage_base_url() {
    let config = Config {
      api: ApiConfig::from_base_url("not a url".to_string()),
    };
    assert!(config.validated().is_err());
  }

  #[test]
  fn test_rejects_out_of_range_cache_ttl() {
    let result = Config::from_yaml(
      "api:\n  base_url: https://api.example.com\n  cache_ttl_secs: 9000000000000\n",
    )
    .and_then(Config::validated);
    assert!(result.is_err());
  }

  #[test]
  fn test_ttl_from_secs_bounds() {
    assert_eq!(
      ttl_from_secs(300).expect("in range"),
      chrono::Duration::seconds(300)
    );
    assert!(ttl_from_secs(9_000_000_000_000).is_err());
    assert!(ttl_from_secs(u64::MAX).is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let result = Config::load(
      Some(Path::new("/definitely/not/here/cleandesk.yaml")),
      Some("https://api.example.com".to_string()),
    );
    assert!(result.is_err());
  }

  #[test]
  fn test_explicit_file_with_override() {
    let path = std::env::temp_dir().join(format!("cleandesk-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "api:\n  base_url: https://file.example.com\n  cache_ttl_secs: 5\n")
      .expect("write temp config");

    let config = Config::load(Some(&path), Some("https://flag.example.com/".to_string()));
    std::fs::remove_file(&path).ok();

    let config = config.expect("valid config");
    assert_eq!(config.api.base_url, "https://flag.example.com");
    assert_eq!(config.api.cache_ttl_secs, 5);
  }
}
