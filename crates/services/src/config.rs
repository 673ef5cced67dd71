use std::env;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:4649";
pub const DEFAULT_LANGUAGE_CODE: &str = "es";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 6;

/// Where the activity picker lives and how long to wait for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivitySourceConfig {
    pub endpoint: String,
    pub request_timeout: Duration,
}

impl Default for ActivitySourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ActivitySourceConfig {
    /// Reads `STUDY_API_ENDPOINT` and `STUDY_HTTP_TIMEOUT_SECS`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let endpoint = env::var("STUDY_API_ENDPOINT")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.into());
        let request_timeout = env::var("STUDY_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs);
        Self {
            endpoint,
            request_timeout,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Knobs for the study loop itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudyConfig {
    /// Language code sent along with every result report.
    pub language_code: String,
    /// Upper bound on simultaneous media downloads during preload.
    pub max_concurrent_fetches: usize,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            language_code: DEFAULT_LANGUAGE_CODE.into(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

impl StudyConfig {
    /// Reads `STUDY_LANG` and `STUDY_PRELOAD_CONCURRENCY`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let language_code = env::var("STUDY_LANG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.language_code);
        let max_concurrent_fetches = env::var("STUDY_PRELOAD_CONCURRENCY")
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(defaults.max_concurrent_fetches);
        Self::default()
            .with_language_code(language_code)
            .with_max_concurrent_fetches(max_concurrent_fetches)
    }

    #[must_use]
    pub fn with_language_code(mut self, code: impl Into<String>) -> Self {
        self.language_code = code.into();
        self
    }

    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }
}
