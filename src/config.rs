//! Startup configuration
//!
//! Read once from the environment (after loading `.env`, if present).
//! A missing completion credential is fatal before any session starts.

use crate::llm::OpenAIModel;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MODEL: OpenAIModel = OpenAIModel::GPT4oMini;
const DEFAULT_MAX_TOKENS: u32 = 200;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Please set OPENAI_API_KEY in your environment or .env file")]
    MissingApiKey,
    #[error("Unsupported model {0:?}")]
    UnknownModel(String),
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Settings the assistant needs before the first turn
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub openai_api_key: String,
    pub model: OpenAIModel,
    /// Chat-completions endpoint override (proxies, compatible gateways)
    pub endpoint: Option<String>,
    pub completion: CompletionSettings,
    pub timeout: Duration,
}

/// Per-request completion knobs handed to the session runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSettings {
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: None,
        }
    }
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is normal; the variables may come from the shell
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let openai_api_key = lookup("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let model = match lookup("ASSISTANT_MODEL") {
            Some(name) => {
                OpenAIModel::from_api_name(name.trim()).ok_or(ConfigError::UnknownModel(name))?
            }
            None => DEFAULT_MODEL,
        };

        let max_tokens =
            parse_positive(&lookup, "ASSISTANT_MAX_TOKENS")?.unwrap_or(DEFAULT_MAX_TOKENS);
        let timeout_secs =
            parse_positive(&lookup, "ASSISTANT_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            openai_api_key,
            model,
            endpoint: lookup("OPENAI_BASE_URL").filter(|u| !u.trim().is_empty()),
            completion: CompletionSettings {
                max_tokens,
                system_prompt: lookup("ASSISTANT_SYSTEM_PROMPT").filter(|s| !s.trim().is_empty()),
            },
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(Some(n)),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}
