//! Bot configuration.
//!
//! Built once at start-up from the environment (and a `.env` file when present)
//! and handed to each client constructor. Nothing reads the environment after
//! this point.

use crate::actors::messages::AppError;
use crate::brain::analyzer::FailurePolicy;
use crate::brain::tokenizer::Language;
use crate::logging::LogFormat;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

const DEFAULT_DB_PATH: &str = "data/utterlog.sqlite";
const DEFAULT_PARTITION: &str = "UtteranceLog";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BACKOFF_MS: u64 = 500;

/// Connection settings for the intent classification service.
#[derive(Debug, Clone, Validate)]
pub struct LuisConfig {
    #[validate(length(min = 1))]
    pub app_id: String,
    #[validate(length(min = 1))]
    pub prediction_key: String,
    /// Prediction endpoint, e.g. `https://westus.api.cognitive.microsoft.com/`.
    #[validate(url)]
    pub endpoint: String,
    /// `production` or `staging`.
    #[validate(length(min = 1))]
    pub slot: String,
}

/// Connection settings for the sentiment service.
#[derive(Debug, Clone, Validate)]
pub struct TextAnalyticsConfig {
    #[validate(url)]
    pub endpoint: String,
    #[validate(length(min = 1))]
    pub key: String,
    /// Language code sent with every document.
    #[validate(length(min = 2))]
    pub language: String,
}

/// Where enrichment records are persisted.
#[derive(Debug, Clone, Validate)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    /// Partition (container) the records are written under.
    #[validate(length(min = 1))]
    pub partition: String,
}

/// Retry behaviour for outbound analysis calls. Zero retries means fail fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based). Linear backoff.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

/// Complete process configuration.
#[derive(Debug, Clone, Validate)]
pub struct BotConfig {
    #[validate(nested)]
    pub luis: LuisConfig,
    #[validate(nested)]
    pub text_analytics: TextAnalyticsConfig,
    #[validate(nested)]
    pub storage: StorageConfig,
    pub language: Language,
    pub failure_policy: FailurePolicy,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl BotConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn load() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// Reads and validates the configuration from the process environment only.
    pub fn from_env() -> Result<Self, AppError> {
        let language: Language = parse_or("UTTERLOG_LANGUAGE", Language::English)?;

        let config = Self {
            luis: LuisConfig {
                app_id: required("LUIS_APP_ID")?,
                prediction_key: required("LUIS_PREDICTION_KEY")?,
                endpoint: required("LUIS_ENDPOINT")?,
                slot: optional("LUIS_SLOT").unwrap_or_else(|| "production".to_string()),
            },
            text_analytics: TextAnalyticsConfig {
                endpoint: required("AZURE_TEXT_ANALYTICS_ENDPOINT")?,
                key: required("AZURE_TEXT_ANALYTICS_KEY")?,
                language: language.code().to_string(),
            },
            storage: StorageConfig {
                db_path: optional("UTTERLOG_DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
                partition: optional("UTTERLOG_PARTITION")
                    .unwrap_or_else(|| DEFAULT_PARTITION.to_string()),
            },
            language,
            failure_policy: parse_or("UTTERLOG_FAILURE_POLICY", FailurePolicy::Abort)?,
            retry: RetryPolicy {
                max_retries: parse_or("UTTERLOG_MAX_RETRIES", 0)?,
                backoff: Duration::from_millis(parse_or(
                    "UTTERLOG_RETRY_BACKOFF_MS",
                    DEFAULT_BACKOFF_MS,
                )?),
            },
            request_timeout: Duration::from_secs(parse_or(
                "UTTERLOG_REQUEST_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            log_format: parse_or("UTTERLOG_LOG_FORMAT", LogFormat::Pretty)?,
        };

        config.validate()?;
        if config.request_timeout.is_zero() {
            return Err(AppError::Config(
                "UTTERLOG_REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &str) -> Result<String, AppError> {
    optional(name).ok_or_else(|| AppError::Config(format!("{} is not set", name)))
}

fn parse_or<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [(&str, Option<&str>); 5] = [
        ("LUIS_APP_ID", Some("00000000-0000-0000-0000-000000000000")),
        ("LUIS_PREDICTION_KEY", Some("prediction-key")),
        ("LUIS_ENDPOINT", Some("https://westus.api.cognitive.microsoft.com/")),
        ("AZURE_TEXT_ANALYTICS_ENDPOINT", Some("https://sentiment.cognitiveservices.azure.com")),
        ("AZURE_TEXT_ANALYTICS_KEY", Some("analytics-key")),
    ];

    #[test]
    fn test_defaults_applied() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("LUIS_SLOT", None),
            ("UTTERLOG_DB_PATH", None),
            ("UTTERLOG_PARTITION", None),
            ("UTTERLOG_LANGUAGE", None),
            ("UTTERLOG_FAILURE_POLICY", None),
            ("UTTERLOG_MAX_RETRIES", None),
            ("UTTERLOG_RETRY_BACKOFF_MS", None),
            ("UTTERLOG_REQUEST_TIMEOUT_SECS", None),
            ("UTTERLOG_LOG_FORMAT", None),
        ]);
        temp_env::with_vars(vars, || {
            let config = BotConfig::from_env().expect("config should load");
            assert_eq!(config.luis.slot, "production");
            assert_eq!(config.storage.partition, "UtteranceLog");
            assert_eq!(config.storage.db_path, PathBuf::from(DEFAULT_DB_PATH));
            assert_eq!(config.language, Language::English);
            assert_eq!(config.text_analytics.language, "en");
            assert_eq!(config.failure_policy, FailurePolicy::Abort);
            assert_eq!(config.retry.max_retries, 0);
            assert_eq!(config.request_timeout, Duration::from_secs(30));
            assert_eq!(config.log_format, LogFormat::Pretty);
        });
    }

    #[test]
    fn test_missing_required_variable_is_named() {
        let mut vars = REQUIRED.to_vec();
        vars[1] = ("LUIS_PREDICTION_KEY", None);
        temp_env::with_vars(vars, || {
            let err = BotConfig::from_env().unwrap_err();
            assert!(matches!(err, AppError::Config(ref msg) if msg.contains("LUIS_PREDICTION_KEY")));
        });
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars[2] = ("LUIS_ENDPOINT", Some("not a url"));
        temp_env::with_vars(vars, || {
            assert!(matches!(BotConfig::from_env(), Err(AppError::Config(_))));
        });
    }

    #[test]
    fn test_overrides_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("UTTERLOG_LANGUAGE", Some("fr")),
            ("UTTERLOG_FAILURE_POLICY", Some("substitute")),
            ("UTTERLOG_MAX_RETRIES", Some("2")),
            ("UTTERLOG_RETRY_BACKOFF_MS", Some("10")),
            ("UTTERLOG_LOG_FORMAT", Some("json")),
        ]);
        temp_env::with_vars(vars, || {
            let config = BotConfig::from_env().expect("config should load");
            assert_eq!(config.language, Language::French);
            assert_eq!(config.text_analytics.language, "fr");
            assert_eq!(config.failure_policy, FailurePolicy::Substitute);
            assert_eq!(config.retry.max_retries, 2);
            assert_eq!(config.retry.delay_for(3), Duration::from_millis(30));
            assert_eq!(config.log_format, LogFormat::Json);
        });
    }

    #[test]
    fn test_bad_number_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("UTTERLOG_MAX_RETRIES", Some("many")));
        temp_env::with_vars(vars, || {
            let err = BotConfig::from_env().unwrap_err();
            assert!(matches!(err, AppError::Config(ref msg) if msg.contains("UTTERLOG_MAX_RETRIES")));
        });
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("UTTERLOG_REQUEST_TIMEOUT_SECS", Some("0")));
        temp_env::with_vars(vars, || {
            assert!(BotConfig::from_env().is_err());
        });
    }
}
