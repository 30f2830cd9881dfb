use crate::error::{AppError, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mcp: McpConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    pub server_url: String,
    #[serde(default = "default_mcp_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
}

impl McpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
}

fn default_mcp_timeout_secs() -> u64 {
    30
}

fn default_health_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Groq,
    HuggingFace,
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "groq" => Ok(ProviderKind::Groq),
            "huggingface" => Ok(ProviderKind::HuggingFace),
            other => Err(AppError::Config(format!("unknown LLM provider: {}", other))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Groq => "groq",
            ProviderKind::HuggingFace => "huggingface",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    #[serde(default)]
    pub api_key: String,
    /// Falls back to the provider's default model when absent.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        Ok(serde_yaml::from_str(&expanded)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("MCP_SERVER_URL") {
            self.mcp.server_url = url;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.llm.model = Some(model);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.mcp.server_url.trim().is_empty() {
            return Err(AppError::Config(
                "mcp.server_url cannot be empty".to_string(),
            ));
        }

        if self.llm.api_key.trim().is_empty() {
            return Err(AppError::Config(format!(
                "llm.api_key is required for provider {}",
                self.llm.provider
            )));
        }

        if self.mcp.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(AppError::Config("timeouts must be positive".to_string()));
        }

        Ok(())
    }
}

/// Expand `$(VAR)` and `${VAR}` from the environment; `$$` is a literal `$`.
fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\$|\$\(([A-Za-z_][A-Za-z0-9_]*)\)|\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| AppError::Config(e.to_string()))?;

    let mut result = String::with_capacity(content.len());
    let mut last = 0;

    for cap in re.captures_iter(content) {
        let whole = cap.get(0).map_or(0..0, |m| m.range());
        result.push_str(&content[last..whole.start]);
        result.push_str(&substitution(&cap)?);
        last = whole.end;
    }

    result.push_str(&content[last..]);
    Ok(result)
}

fn substitution(cap: &Captures<'_>) -> Result<String> {
    match cap.get(1).or_else(|| cap.get(2)) {
        Some(name) => std::env::var(name.as_str()).map_err(|_| {
            AppError::Config(format!("missing environment variable: {}", name.as_str()))
        }),
        None => Ok("$".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const MINIMAL: &str = "mcp:\n  server_url: http://localhost:8123\nllm:\n  provider: groq\n  api_key: k\n";

    #[test]
    #[serial]
    fn test_expand_env_vars() {
        std::env::set_var("AGENT_TEST_VAR", "test_value");

        let output = expand_env_vars("a: $(AGENT_TEST_VAR)\nb: ${AGENT_TEST_VAR}").unwrap();
        assert_eq!(output, "a: test_value\nb: test_value");

        std::env::remove_var("AGENT_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_escape() {
        assert_eq!(expand_env_vars("cost: $$10").unwrap(), "cost: $10");
    }

    #[test]
    fn test_expand_env_vars_not_found() {
        let err = expand_env_vars("secret: $(AGENT_NONEXISTENT_VAR)").unwrap_err();
        assert!(err.to_string().contains("AGENT_NONEXISTENT_VAR"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.mcp.timeout(), Duration::from_secs(30));
        assert_eq!(config.mcp.health_timeout(), Duration::from_secs(5));
        assert_eq!(config.llm.provider, ProviderKind::Groq);
        assert_eq!(config.llm.model, None);
        assert_eq!(config.llm.max_tokens, 2048);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.agent.system_prompt.is_none());
    }

    #[test]
    fn test_validate_rejects_empty_api_key() {
        let config = Config::from_yaml_str(
            "mcp:\n  server_url: http://localhost:8123\nllm:\n  provider: openai\n",
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_server_url() {
        let config =
            Config::from_yaml_str("mcp:\n  server_url: \"\"\nllm:\n  provider: openai\n  api_key: k\n")
                .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("LLM_PROVIDER", "HuggingFace");
        std::env::set_var("LLM_MODEL", "tiny-model");

        let mut config = Config::from_yaml_str(MINIMAL).unwrap();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.llm.provider, ProviderKind::HuggingFace);
        assert_eq!(config.llm.model.as_deref(), Some("tiny-model"));

        std::env::remove_var("LLM_PROVIDER");
        std::env::remove_var("LLM_MODEL");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!("anthropic".parse::<ProviderKind>().is_err());
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
    }
}
