use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Clone)]
pub struct Config {
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub port: u16,
    pub rust_log: String,
    pub templates_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub latex_compiler: String,
    pub generation_timeout: Duration,
    pub generation_max_retries: u32,
    pub compile_timeout: Duration,
    pub cors: CorsOrigins,
    pub rate_limits: RateLimits,
    pub retention: RetentionPolicy,
    pub max_upload_bytes: usize,
}

/// Which browser origins may call the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

/// Per-endpoint request ceilings, counted per client address over `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub generate_per_window: u32,
    pub edit_per_window: u32,
    pub health_per_window: u32,
    pub window: Duration,
}

/// What happens to a request's artifacts once the response is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Remove every artifact on every exit path of the request.
    DeleteImmediately,
    /// Keep artifacts on disk; a background sweep removes files older than this.
    RetainFor(Duration),
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let retention_hours: u64 = parse_var(&lookup, "ARTIFACT_RETENTION_HOURS", 0)?;
        let retention = if retention_hours == 0 {
            RetentionPolicy::DeleteImmediately
        } else {
            RetentionPolicy::RetainFor(Duration::from_secs(retention_hours * 60 * 60))
        };

        Ok(Config {
            google_api_key: require(&lookup, "GOOGLE_API_KEY")?,
            gemini_model: var("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            gemini_api_base: var("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            port: parse_var(&lookup, "PORT", 8000)?,
            rust_log: var("RUST_LOG", "info"),
            templates_dir: PathBuf::from(var("TEMPLATES_DIR", "templates")),
            outputs_dir: PathBuf::from(var("OUTPUTS_DIR", "outputs")),
            latex_compiler: var("LATEX_COMPILER", "pdflatex"),
            generation_timeout: Duration::from_secs(parse_var(
                &lookup,
                "GENERATION_TIMEOUT_SECS",
                120,
            )?),
            generation_max_retries: parse_var(&lookup, "GENERATION_MAX_RETRIES", 3)?,
            compile_timeout: Duration::from_secs(parse_var(&lookup, "COMPILE_TIMEOUT_SECS", 60)?),
            cors: parse_origins(&var("CORS_ALLOWED_ORIGINS", "*")),
            rate_limits: RateLimits {
                generate_per_window: parse_var(&lookup, "RATE_LIMIT_GENERATE_PER_MINUTE", 10)?,
                edit_per_window: parse_var(&lookup, "RATE_LIMIT_EDIT_PER_MINUTE", 10)?,
                health_per_window: parse_var(&lookup, "RATE_LIMIT_HEALTH_PER_MINUTE", 5)?,
                window: Duration::from_secs(60),
            },
            retention,
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
        })
    }

    /// Timeout for one HTTP attempt, so a hung attempt still leaves room for retries
    /// inside `generation_timeout`.
    pub fn generation_attempt_timeout(&self) -> Duration {
        self.generation_timeout / self.generation_max_retries.max(1)
    }
}

// The API key must never reach a log line.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("google_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_api_base", &self.gemini_api_base)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .field("templates_dir", &self.templates_dir)
            .field("outputs_dir", &self.outputs_dir)
            .field("latex_compiler", &self.latex_compiler)
            .field("generation_timeout", &self.generation_timeout)
            .field("generation_max_retries", &self.generation_max_retries)
            .field("compile_timeout", &self.compile_timeout)
            .field("cors", &self.cors)
            .field("rate_limits", &self.rate_limits)
            .field("retention", &self.retention)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

fn parse_origins(raw: &str) -> CorsOrigins {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsOrigins::Any
    } else {
        CorsOrigins::List(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = config_from(&[("GOOGLE_API_KEY", "secret")]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.latex_compiler, "pdflatex");
        assert_eq!(config.templates_dir, PathBuf::from("templates"));
        assert_eq!(config.outputs_dir, PathBuf::from("outputs"));
        assert_eq!(config.cors, CorsOrigins::Any);
        assert_eq!(config.retention, RetentionPolicy::DeleteImmediately);
        assert_eq!(config.rate_limits.generate_per_window, 10);
        assert_eq!(config.rate_limits.health_per_window, 5);
        assert_eq!(config.generation_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_blank_api_key_fails() {
        assert!(config_from(&[("GOOGLE_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_invalid_port_fails() {
        let err = config_from(&[("GOOGLE_API_KEY", "k"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_origin_list_parsed() {
        let config = config_from(&[
            ("GOOGLE_API_KEY", "k"),
            (
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:3000, https://resume.example.com",
            ),
        ])
        .unwrap();
        assert_eq!(
            config.cors,
            CorsOrigins::List(vec![
                "http://localhost:3000".to_string(),
                "https://resume.example.com".to_string()
            ])
        );
    }

    #[test]
    fn test_wildcard_anywhere_in_list_means_any() {
        assert_eq!(parse_origins("http://a.test,*"), CorsOrigins::Any);
        assert_eq!(parse_origins(""), CorsOrigins::Any);
    }

    #[test]
    fn test_retention_hours() {
        let config =
            config_from(&[("GOOGLE_API_KEY", "k"), ("ARTIFACT_RETENTION_HOURS", "6")]).unwrap();
        assert_eq!(
            config.retention,
            RetentionPolicy::RetainFor(Duration::from_secs(6 * 3600))
        );
    }

    #[test]
    fn test_attempt_timeout_splits_generation_budget() {
        let config = config_from(&[("GOOGLE_API_KEY", "k")]).unwrap();
        assert_eq!(config.generation_attempt_timeout(), Duration::from_secs(40));

        let config = config_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("GENERATION_TIMEOUT_SECS", "30"),
            ("GENERATION_MAX_RETRIES", "0"),
        ])
        .unwrap();
        assert_eq!(config.generation_attempt_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = config_from(&[("GOOGLE_API_KEY", "super-secret-key")]).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
