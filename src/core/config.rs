use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAR_BUDGET: usize = 4000;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 500;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}: missing required environment variable")]
    Missing(&'static str),

    #[error("{name}: invalid value {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{0}: must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_org_id: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u32,
    pub summary_char_budget: usize,
    pub summary_max_tokens: u32,
    pub max_upload_bytes: usize,
    pub provider_timeout: Duration,
    pub provider_max_retries: usize,
    pub body_always_base64: bool,
}

impl AppConfig {
    /// Configuration with every tunable at its default.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            openai_api_key: api_key.into(),
            openai_org_id: None,
            openai_model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max_requests: 1,
            summary_char_budget: DEFAULT_CHAR_BUDGET,
            summary_max_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            provider_timeout: Duration::from_secs(25),
            provider_max_retries: 2,
            body_always_base64: false,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let mut config = Self::with_api_key(api_key);

        config.openai_org_id = lookup("OPENAI_ORG_ID").filter(|v| !v.is_empty());
        if let Some(model) = lookup("OPENAI_MODEL").filter(|v| !v.is_empty()) {
            config.openai_model = model;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL").filter(|v| !v.is_empty()) {
            config.openai_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(secs) = parse_positive::<u64, _>(&lookup, "RATE_LIMIT_WINDOW_SECS")? {
            config.rate_limit_window = Duration::from_secs(secs);
        }
        if let Some(cap) = parse_positive::<u32, _>(&lookup, "RATE_LIMIT_MAX_REQUESTS")? {
            config.rate_limit_max_requests = cap;
        }
        if let Some(budget) = parse_positive::<usize, _>(&lookup, "SUMMARY_CHAR_BUDGET")? {
            config.summary_char_budget = budget;
        }
        if let Some(tokens) = parse_positive::<u32, _>(&lookup, "SUMMARY_MAX_TOKENS")? {
            config.summary_max_tokens = tokens;
        }
        if let Some(bytes) = parse_positive::<usize, _>(&lookup, "MAX_UPLOAD_BYTES")? {
            config.max_upload_bytes = bytes;
        }
        if let Some(secs) = parse_positive::<u64, _>(&lookup, "PROVIDER_TIMEOUT_SECS")? {
            config.provider_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("PROVIDER_MAX_RETRIES") {
            config.provider_max_retries = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PROVIDER_MAX_RETRIES",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup("BODY_ALWAYS_BASE64") {
            config.body_always_base64 = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        Ok(config)
    }
}

fn parse_positive<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + PartialEq + Default,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let value: T = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.clone(),
    })?;
    if value == T::default() {
        return Err(ConfigError::Zero(name));
    }
    Ok(Some(value))
}
