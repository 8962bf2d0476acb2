// src/config.rs
use crate::errors::AnalysisError;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Settings resolved once at start-up and handed to the services that need
/// them.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
    pub strict_cardinality: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("bind_addr", &self.bind_addr)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("strict_cardinality", &self.strict_cardinality)
            .finish()
    }
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Result<Self, AnalysisError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AnalysisError::Configuration(
                "API key is not defined or is empty".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            strict_cardinality: false,
        })
    }

    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .or_else(|| lookup("API_KEY"))
            .unwrap_or_default();
        let mut config = Self::new(api_key)?;

        if let Some(model) = lookup("GEMINI_MODEL").filter(|v| !v.trim().is_empty()) {
            config.model = model;
        }
        if let Some(base_url) = lookup("GEMINI_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = lookup("ANALYSIS_TIMEOUT_SECS") {
            let secs: u64 = parse_value("ANALYSIS_TIMEOUT_SECS", &secs)?;
            if secs == 0 {
                return Err(AnalysisError::Configuration(
                    "ANALYSIS_TIMEOUT_SECS must be greater than zero".to_string(),
                ));
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(addr) = lookup("BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            config.bind_addr = addr;
        }
        if let Some(max) = lookup("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_value("MAX_UPLOAD_BYTES", &max)?;
        }
        if let Some(strict) = lookup("STRICT_CARDINALITY") {
            config.strict_cardinality = parse_bool("STRICT_CARDINALITY", &strict)?;
        }

        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AnalysisError> {
    raw.trim()
        .parse()
        .map_err(|_| AnalysisError::Configuration(format!("{} has an invalid value: {}", key, raw)))
}

pub(crate) fn parse_bool(key: &str, raw: &str) -> Result<bool, AnalysisError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(AnalysisError::Configuration(format!(
            "{} has an invalid value: {}",
            key, raw
        ))),
    }
}
