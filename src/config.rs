//! Backend endpoints, credentials, and filesystem locations.

use std::path::PathBuf;

/// Application name used for the data directory.
pub const APP_NAME: &str = "Zabuni";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Google Generative Language API endpoint (the `v1` surface, not beta).
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Pinned model revision: the `-001` suffix keeps output shape stable.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-001";

/// Environment variable holding the Google API key.
pub const GEMINI_API_KEY_ENV: &str = "GOOGLE_GENAI_API_KEY";

/// OpenRouter API endpoint.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Cheap default for the fallback path; see
/// [`AVAILABLE_MODELS`](crate::providers::AVAILABLE_MODELS) for alternatives.
pub const DEFAULT_OPENROUTER_MODEL: &str = "anthropic/claude-3-haiku";

/// Environment variable holding the OpenRouter API key.
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Per-call HTTP timeout for analysis backends.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "zabuni=info"
}

/// Application data directory (~/Zabuni).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .expect("Cannot determine home directory")
        .join(APP_NAME)
}

/// Default location of the persistent analysis cache.
pub fn default_cache_path() -> PathBuf {
    app_data_dir().join("analysis_cache.db")
}

/// Connection settings for one analysis backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Endpoint base URL, with or without a trailing slash.
    pub base_url: String,
    /// API key. May be empty: the backend rejects the call and the
    /// fallback chain moves on.
    pub api_key: String,
    /// Model identifier to request.
    pub model: String,
    /// Per-call HTTP timeout in seconds.
    pub timeout_secs: u64,
}

/// Full wiring for the production analysis chain.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub gemini: BackendConfig,
    pub openrouter: BackendConfig,
    /// Where the SQLite result cache lives.
    pub cache_path: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gemini: BackendConfig {
                base_url: GEMINI_BASE_URL.to_string(),
                api_key: String::new(),
                model: DEFAULT_GEMINI_MODEL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            openrouter: BackendConfig {
                base_url: OPENROUTER_BASE_URL.to_string(),
                api_key: String::new(),
                model: DEFAULT_OPENROUTER_MODEL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            cache_path: default_cache_path(),
        }
    }
}

impl AnalysisConfig {
    /// Defaults plus API keys from the environment. A missing variable
    /// leaves the key empty; that backend then fails fast and the chain
    /// falls back.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var(GEMINI_API_KEY_ENV) {
            config.gemini.api_key = key;
        }
        if let Ok(key) = std::env::var(OPENROUTER_API_KEY_ENV) {
            config.openrouter.api_key = key;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_is_under_home() {
        let dir = app_data_dir();
        assert!(dir.ends_with(APP_NAME));
    }

    #[test]
    fn cache_path_is_inside_data_dir() {
        let path = default_cache_path();
        assert!(path.starts_with(app_data_dir()));
        assert_eq!(path.file_name().unwrap(), "analysis_cache.db");
    }

    #[test]
    fn default_config_points_at_production_endpoints() {
        let config = AnalysisConfig::default();
        assert_eq!(config.gemini.base_url, GEMINI_BASE_URL);
        assert_eq!(config.gemini.model, "gemini-1.5-flash-001");
        assert_eq!(config.openrouter.base_url, OPENROUTER_BASE_URL);
        assert_eq!(config.openrouter.model, "anthropic/claude-3-haiku");
        assert_eq!(config.gemini.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn default_keys_are_empty() {
        let config = AnalysisConfig::default();
        assert!(config.gemini.api_key.is_empty());
        assert!(config.openrouter.api_key.is_empty());
    }
}
