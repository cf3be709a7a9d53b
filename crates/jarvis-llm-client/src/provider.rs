use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backends the facade can route to. `Mock` is always registered (see
/// `jarvis-llm`'s registry bootstrap) so a deployment with zero provider
/// credentials configured still has a working default route for tests and
/// local development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    Mock,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Mock => "mock",
        }
    }

    /// Name of the environment variable that, if set, supplies this
    /// provider's API key. `Mock` has none — it never needs credentials.
    pub fn api_key_env_var(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Google => Some("GOOGLE_API_KEY"),
            Self::Mock => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ModelRefParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "google" => Ok(Self::Google),
            "mock" => Ok(Self::Mock),
            other => Err(ModelRefParseError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelRefParseError {
    #[error("model reference must be in `provider/model` form, got '{0}'")]
    MissingSeparator(String),
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("model name cannot be empty")]
    EmptyModel,
}

/// A fully-qualified model reference, e.g. `openai/gpt-4o-mini`. The
/// provider registry keys route tables by [`Provider`] and passes `model`
/// straight through to the backend client unexamined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: Provider,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ModelRefParseError> {
        let (provider_raw, model_raw) = raw
            .split_once('/')
            .ok_or_else(|| ModelRefParseError::MissingSeparator(raw.to_string()))?;
        if model_raw.trim().is_empty() {
            return Err(ModelRefParseError::EmptyModel);
        }
        Ok(Self {
            provider: provider_raw.parse()?,
            model: model_raw.to_string(),
        })
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}
