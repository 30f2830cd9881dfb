use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

fn default_api_host() -> String {
    "0.0.0.0".into()
}

fn default_api_port() -> u16 {
    8123
}

/// Upstream JSONPlaceholder API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_content_base_url")]
    pub base_url: String,
    #[serde(default = "default_content_timeout_secs")]
    pub timeout_secs: u64,
}

impl ContentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            base_url: default_content_base_url(),
            timeout_secs: default_content_timeout_secs(),
        }
    }
}

fn default_content_base_url() -> String {
    crate::provider::DEFAULT_BASE_URL.into()
}

fn default_content_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load YAML from disk (falling back to defaults when the file is absent),
    /// substitute $(VAR)/${VAR} with env vars, then apply env overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut cfg = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            Self::from_yaml_str(&raw)?
        } else {
            info!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let expanded = expand_env_placeholders(raw)?;
        Ok(serde_yaml::from_str(&expanded)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("HOST") {
            self.api.host = host;
        }

        if let Ok(port) = std::env::var("PORT") {
            self.api.port = port
                .parse()
                .map_err(|_| AppError::Config(format!("PORT is not a valid port: {}", port)))?;
        }

        if let Ok(url) = std::env::var("CONTENT_BASE_URL") {
            self.content.base_url = url;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.api.port == 0 {
            return Err(AppError::Config("api.port cannot be 0".to_string()));
        }

        if self.content.base_url.trim().is_empty() {
            return Err(AppError::Config(
                "content.base_url cannot be empty".to_string(),
            ));
        }

        if self.content.timeout_secs == 0 {
            return Err(AppError::Config(
                "content.timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Expand $(VAR) and ${VAR} placeholders using environment variables.
/// "$$" is a literal '$'. A referenced variable that is unset is an error.
fn expand_env_placeholders(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let close = match after.chars().next() {
            Some('$') => {
                out.push('$');
                rest = &after[1..];
                continue;
            }
            Some('(') => ')',
            Some('{') => '}',
            _ => {
                out.push('$');
                rest = after;
                continue;
            }
        };

        let end = after.find(close).ok_or_else(|| {
            AppError::Config(format!(
                "unterminated env placeholder: missing '{}'",
                close
            ))
        })?;
        let var = &after[1..end];
        let value = std::env::var(var)
            .map_err(|_| AppError::Config(format!("missing environment variable: {}", var)))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
