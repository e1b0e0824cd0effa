//! SDK configuration and retry policy.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::{ClientError, ClientResult};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "ONBOARDING_API_KEY";

/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "ONBOARDING_BASE_URL";

/// Environment variable selecting the data directory.
pub const ENV_DATA_DIR: &str = "ONBOARDING_DATA_DIR";

/// Configuration for retry with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub multiplier: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 10_000,
            multiplier: 2,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay_ms: u64, max_delay_ms: u64, multiplier: u64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            max_delay_ms,
            multiplier,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(1, 0, 0, 1)
    }

    /// Calculate delay for a given attempt number (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        self.initial_delay_ms
            .saturating_mul(self.multiplier.saturating_pow(attempt))
            .min(self.max_delay_ms)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// attempts run out.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `op`.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {}ms: {}",
                        what,
                        attempt + 1,
                        self.max_attempts,
                        delay,
                        error
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Configuration of an [`OnboardingClient`](crate::OnboardingClient).
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// API key sent with every request.
    pub api_key: String,
    /// Backend base URL.
    pub base_url: String,
    /// Directory for persisted state; in-memory when `None`.
    pub data_dir: Option<PathBuf>,
    /// Events per upload request.
    pub batch_size: usize,
    /// Maximum queued events; the oldest are dropped beyond this.
    pub max_queue: usize,
    /// Interval of the background flush task.
    pub flush_interval: Duration,
    /// Age after which a cached config is reported as stale.
    pub cache_ttl: Duration,
    /// Retry policy for network calls.
    pub retry: RetryConfig,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self::new("")
    }
}

impl SdkConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: None,
            batch_size: 20,
            max_queue: 1000,
            flush_interval: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            retry: RetryConfig::default(),
        }
    }

    /// Read configuration from `ONBOARDING_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the API key is missing.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the API key is missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ClientResult<Self> {
        let api_key = lookup(ENV_API_KEY)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ClientError::Config(format!("{ENV_API_KEY} is not set")))?;
        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        config.data_dir = lookup(ENV_DATA_DIR).map(PathBuf::from);
        Ok(config)
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Persist state under `data_dir`.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Set the upload batch size (at least 1).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the queue bound (at least 1).
    #[must_use]
    pub fn with_max_queue(mut self, max_queue: usize) -> Self {
        self.max_queue = max_queue.max(1);
        self
    }

    /// Set the background flush interval.
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the cache TTL.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.delay_for_attempt(0), 200);
        assert_eq!(config.delay_for_attempt(1), 400);
        assert_eq!(config.delay_for_attempt(10), 10_000);
    }

    #[test]
    fn test_delay_saturates() {
        let config = RetryConfig::new(100, u64::MAX / 2, u64::MAX, 4);
        assert_eq!(config.delay_for_attempt(60), u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_transient_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = RetryConfig::default()
            .run("test op", || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ClientError::Api {
                        status: 503,
                        message: "busy".into(),
                    })
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.expect("should succeed"), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_permanent_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: ClientResult<()> = RetryConfig::default()
            .run("test op", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::Api {
                    status: 400,
                    message: "bad".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_KEY, "key-123"),
            (ENV_BASE_URL, "https://flows.example.com"),
            (ENV_DATA_DIR, "/tmp/onboarding"),
        ]
        .into_iter()
        .collect();
        let config =
            SdkConfig::from_lookup(|name| vars.get(name).map(|v| (*v).to_string())).expect("config");
        assert_eq!(config.api_key, "key-123");
        assert_eq!(config.base_url, "https://flows.example.com");
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/onboarding")));
    }

    #[test]
    fn test_from_lookup_requires_api_key() {
        let result = SdkConfig::from_lookup(|_| None);
        assert!(matches!(result, Err(ClientError::Config(_))));

        let blank = SdkConfig::from_lookup(|name| (name == ENV_API_KEY).then(|| "  ".to_string()));
        assert!(blank.is_err());
    }

    #[test]
    fn test_builder_clamps() {
        let config = SdkConfig::new("k").with_batch_size(0).with_max_queue(0);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.max_queue, 1);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
