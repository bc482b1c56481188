use thiserror::Error;

use crate::config_env::{
    optional_trimmed_env, parse_bool_env, parse_f32_env, parse_u64_env, trimmed_env_or,
};
use crate::llm::OpenAiGatewayConfig;
use crate::llm::openai::{DEFAULT_CHAT_COMPLETIONS_URL, DEFAULT_TIMEOUT_MS};
use crate::session::{ChatModel, DEFAULT_TEMPERATURE, SessionSettings};

pub const DEFAULT_CLASSIFIER_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid number in env var {0}")]
    ParseFloat(String),
    #[error("invalid boolean in env var {0}")]
    ParseBool(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to load .env file: {0}")]
    Dotenv(String),
}

#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    /// `None` disables every model-dependent turn.
    pub api_key: Option<String>,
    pub chat_completions_url: String,
    pub timeout_ms: u64,
    pub classifier_model: String,
    pub default_settings: SessionSettings,
    pub workflows_enabled: bool,
}

impl NavigatorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let chat_completions_url =
            trimmed_env_or("OPENAI_CHAT_COMPLETIONS_URL", DEFAULT_CHAT_COMPLETIONS_URL);
        if !chat_completions_url.starts_with("http://")
            && !chat_completions_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidConfiguration(
                "OPENAI_CHAT_COMPLETIONS_URL must start with http:// or https://".to_string(),
            ));
        }

        let default_model = trimmed_env_or("NAVIGATOR_DEFAULT_MODEL", ChatModel::default().as_str())
            .parse::<ChatModel>()
            .map_err(|err| {
                ConfigError::InvalidConfiguration(format!("NAVIGATOR_DEFAULT_MODEL: {err}"))
            })?;
        let default_temperature =
            parse_f32_env("NAVIGATOR_DEFAULT_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        let default_settings =
            SessionSettings::new(default_model, default_temperature).map_err(|err| {
                ConfigError::InvalidConfiguration(format!("NAVIGATOR_DEFAULT_TEMPERATURE: {err}"))
            })?;

        Ok(Self {
            api_key: optional_trimmed_env("OPENAI_API_KEY"),
            chat_completions_url,
            timeout_ms: parse_u64_env("OPENAI_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            classifier_model: trimmed_env_or(
                "NAVIGATOR_CLASSIFIER_MODEL",
                DEFAULT_CLASSIFIER_MODEL,
            ),
            default_settings,
            workflows_enabled: parse_bool_env("NAVIGATOR_WORKFLOWS_ENABLED", false)?,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Gateway settings, or `None` when no credential is configured.
    pub fn gateway_config(&self) -> Option<OpenAiGatewayConfig> {
        self.api_key.as_ref().map(|api_key| OpenAiGatewayConfig {
            chat_completions_url: self.chat_completions_url.clone(),
            api_key: api_key.clone(),
            timeout_ms: self.timeout_ms,
        })
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            chat_completions_url: DEFAULT_CHAT_COMPLETIONS_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            classifier_model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            default_settings: SessionSettings::default(),
            workflows_enabled: false,
        }
    }
}

pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::{ConfigError, DEFAULT_CLASSIFIER_MODEL, NavigatorConfig};
    use crate::session::ChatModel;

    const KEYS: [&str; 7] = [
        "OPENAI_API_KEY",
        "OPENAI_CHAT_COMPLETIONS_URL",
        "OPENAI_TIMEOUT_MS",
        "NAVIGATOR_CLASSIFIER_MODEL",
        "NAVIGATOR_DEFAULT_MODEL",
        "NAVIGATOR_DEFAULT_TEMPERATURE",
        "NAVIGATOR_WORKFLOWS_ENABLED",
    ];

    fn clear_env() {
        for key in KEYS {
            // SAFETY: tests touching the environment are serialized.
            unsafe { std::env::remove_var(key) };
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::set_var(key, value) };
    }

    #[test]
    #[serial]
    fn defaults_apply_without_any_env() {
        clear_env();

        let config = NavigatorConfig::from_env().expect("config should load");

        assert!(config.api_key.is_none());
        assert!(!config.has_credential());
        assert!(config.gateway_config().is_none());
        assert_eq!(config.timeout_ms, 60_000);
        assert_eq!(config.classifier_model, DEFAULT_CLASSIFIER_MODEL);
        assert_eq!(config.default_settings.model(), ChatModel::Gpt4oMini);
        assert!((config.default_settings.temperature() - 0.7).abs() < f32::EPSILON);
        assert!(!config.workflows_enabled);
    }

    #[test]
    #[serial]
    fn blank_api_key_counts_as_missing() {
        clear_env();
        set_env("OPENAI_API_KEY", "   ");

        let config = NavigatorConfig::from_env().expect("config should load");

        assert!(config.api_key.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn reads_overrides_and_builds_gateway_config() {
        clear_env();
        set_env("OPENAI_API_KEY", " sk-test ");
        set_env("OPENAI_CHAT_COMPLETIONS_URL", "http://127.0.0.1:9000/v1/chat");
        set_env("OPENAI_TIMEOUT_MS", "1500");
        set_env("NAVIGATOR_DEFAULT_MODEL", "gpt-4o");
        set_env("NAVIGATOR_DEFAULT_TEMPERATURE", "0.2");
        set_env("NAVIGATOR_WORKFLOWS_ENABLED", "yes");

        let config = NavigatorConfig::from_env().expect("config should load");
        let gateway = config.gateway_config().expect("gateway config should exist");

        assert_eq!(gateway.api_key, "sk-test");
        assert_eq!(gateway.chat_completions_url, "http://127.0.0.1:9000/v1/chat");
        assert_eq!(gateway.timeout_ms, 1500);
        assert_eq!(config.default_settings.model(), ChatModel::Gpt4o);
        assert!(config.workflows_enabled);
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_invalid_values() {
        clear_env();
        set_env("OPENAI_TIMEOUT_MS", "soon");
        assert!(matches!(
            NavigatorConfig::from_env(),
            Err(ConfigError::ParseInt(key)) if key == "OPENAI_TIMEOUT_MS"
        ));

        clear_env();
        set_env("NAVIGATOR_WORKFLOWS_ENABLED", "maybe");
        assert!(matches!(
            NavigatorConfig::from_env(),
            Err(ConfigError::ParseBool(_))
        ));

        clear_env();
        set_env("NAVIGATOR_DEFAULT_TEMPERATURE", "1.5");
        assert!(matches!(
            NavigatorConfig::from_env(),
            Err(ConfigError::InvalidConfiguration(_))
        ));

        clear_env();
        set_env("NAVIGATOR_DEFAULT_MODEL", "gpt-5");
        assert!(matches!(
            NavigatorConfig::from_env(),
            Err(ConfigError::InvalidConfiguration(_))
        ));

        clear_env();
        set_env("OPENAI_CHAT_COMPLETIONS_URL", "ftp://example.com");
        assert!(matches!(
            NavigatorConfig::from_env(),
            Err(ConfigError::InvalidConfiguration(_))
        ));
        clear_env();
    }
}
