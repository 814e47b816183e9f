use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown provider '{0}', expected 'openai' or 'gemini'")]
    UnknownProvider(String),
    #[error("{0} must be set when the {1} provider is selected")]
    MissingCredentials(&'static str, ProviderKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub image_model: String,
    pub chat_model: String,
}

/// Read once at startup and passed by reference into every component;
/// nothing reads the environment after this.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub image_provider: ProviderKind,
    pub chat_provider: ProviderKind,
    pub openai: ProviderSettings,
    pub gemini: ProviderSettings,
    pub chat_temperature: f32,
    pub port: u16,
    pub app_env: String,
    pub storage_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let image_provider = read_provider("PROVIDER")?.unwrap_or(ProviderKind::OpenAi);
        let chat_provider = read_provider("CHAT_PROVIDER")?.unwrap_or(image_provider);

        let openai = ProviderSettings {
            api_key: non_empty(env::var("OPENAI_API_KEY").ok()),
            base_url: env_or("OPENAI_API_BASE", "https://api.openai.com/v1"),
            image_model: env_or("OPENAI_IMAGE_MODEL", "dall-e-3"),
            chat_model: env_or("OPENAI_CHAT_MODEL", "gpt-4o-mini"),
        };
        let gemini = ProviderSettings {
            api_key: non_empty(env::var("GEMINI_API_KEY").ok()),
            base_url: env_or("GEMINI_API_BASE", "https://generativelanguage.googleapis.com/v1beta"),
            image_model: env_or("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image-preview"),
            chat_model: env_or("GEMINI_CHAT_MODEL", "gemini-1.5-flash"),
        };

        let config = Self {
            image_provider,
            chat_provider,
            openai,
            gemini,
            chat_temperature: env::var("CHAT_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.7),
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080),
            app_env: env_or("APP_ENV", "development"),
            storage_dir: PathBuf::from(env_or("STORAGE_DIR", "./storage")),
        };

        for kind in [config.image_provider, config.chat_provider] {
            if config.settings(kind).api_key.is_none() {
                let var = match kind {
                    ProviderKind::OpenAi => "OPENAI_API_KEY",
                    ProviderKind::Gemini => "GEMINI_API_KEY",
                };
                return Err(ConfigError::MissingCredentials(var, kind));
            }
        }
        Ok(config)
    }

    pub fn settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Gemini => &self.gemini,
        }
    }
}

fn read_provider(var: &str) -> Result<Option<ProviderKind>, ConfigError> {
    match non_empty(env::var(var).ok()) {
        Some(value) => value.parse().map(Some),
        None => Ok(None),
    }
}

fn env_or(var: &str, default: &str) -> String {
    non_empty(env::var(var).ok()).unwrap_or_else(|| default.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn provider_kind_parses_known_values() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!(" openai ".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
    }

    #[test]
    fn provider_kind_rejects_unknown_values() {
        let err = "stability".parse::<ProviderKind>().unwrap_err();
        assert!(err.to_string().contains("stability"));
    }

    #[test]
    fn settings_returns_the_matching_block() {
        let config = AppConfig {
            image_provider: ProviderKind::OpenAi,
            chat_provider: ProviderKind::Gemini,
            openai: ProviderSettings {
                api_key: Some("sk-a".into()),
                base_url: "https://api.openai.com/v1".into(),
                image_model: "dall-e-3".into(),
                chat_model: "gpt-4o-mini".into(),
            },
            gemini: ProviderSettings {
                api_key: Some("g-b".into()),
                base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
                image_model: "gemini-2.5-flash-image-preview".into(),
                chat_model: "gemini-1.5-flash".into(),
            },
            chat_temperature: 0.7,
            port: 8080,
            app_env: "test".into(),
            storage_dir: "./storage".into(),
        };
        assert_eq!(config.settings(ProviderKind::OpenAi).api_key.as_deref(), Some("sk-a"));
        assert_eq!(config.settings(ProviderKind::Gemini).api_key.as_deref(), Some("g-b"));
    }
}
