use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_API_HOSTNAME: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_LANGUAGE: &str = "English";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is missing. Set it in the environment or add it to .env")]
    Missing(&'static str),
    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub google_api_key: String,
    pub model: String,
    pub temperature: f32,
    pub api_hostname: String,
    pub language: String,
    // When set, replaces the rendered tutor prompt entirely
    pub system_message: Option<String>,
    pub provider_timeout: Duration,
    pub max_sessions: Option<usize>,
    pub session_ttl: Option<Duration>,
    pub max_message_chars: usize,
}

impl AppConfig {
    /// Load configuration from the process environment. A `.env` file
    /// in the working directory is loaded first if it exists, values
    /// already in the environment take precedence.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Treat blank values the same as unset ones
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let google_api_key = get(API_KEY_VAR)
            .map(|v| v.trim().to_string())
            .ok_or(ConfigError::Missing(API_KEY_VAR))?;
        let model = get("TUTOR_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_hostname =
            get("TUTOR_API_HOSTNAME").unwrap_or_else(|| DEFAULT_API_HOSTNAME.to_string());
        let language = get("TUTOR_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let system_message = get("TUTOR_SYSTEM_MESSAGE");
        let temperature =
            parse_var("TUTOR_TEMPERATURE", get("TUTOR_TEMPERATURE"))?.unwrap_or(DEFAULT_TEMPERATURE);
        let provider_timeout = Duration::from_secs(
            parse_var::<u64>("TUTOR_PROVIDER_TIMEOUT_SECS", get("TUTOR_PROVIDER_TIMEOUT_SECS"))?
                .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
        );
        let max_sessions = parse_var::<usize>("TUTOR_MAX_SESSIONS", get("TUTOR_MAX_SESSIONS"))?;
        let session_ttl = parse_var::<u64>("TUTOR_SESSION_TTL_SECS", get("TUTOR_SESSION_TTL_SECS"))?
            .map(Duration::from_secs);
        let max_message_chars = parse_var::<usize>("TUTOR_MAX_MESSAGE_CHARS", get("TUTOR_MAX_MESSAGE_CHARS"))?
            .unwrap_or(DEFAULT_MAX_MESSAGE_CHARS);

        if provider_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "TUTOR_PROVIDER_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        // Gemini accepts temperatures from 0.0 to 2.0
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                var: "TUTOR_TEMPERATURE",
                value: temperature.to_string(),
                reason: "must be between 0.0 and 2.0".to_string(),
            });
        }
        if max_message_chars == 0 {
            return Err(ConfigError::Invalid {
                var: "TUTOR_MAX_MESSAGE_CHARS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if max_sessions == Some(0) {
            return Err(ConfigError::Invalid {
                var: "TUTOR_MAX_SESSIONS",
                value: "0".to_string(),
                reason: "leave unset for an unbounded store".to_string(),
            });
        }

        Ok(Self {
            google_api_key,
            model,
            temperature,
            api_hostname,
            language,
            system_message,
            provider_timeout,
            max_sessions,
            session_ttl,
            max_message_chars,
        })
    }
}

fn parse_var<T>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                var,
                value: v.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
