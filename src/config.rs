//! Configuration types for the vectorizing service.
//!
//! All runtime behaviour is controlled through [`ServiceConfig`], built via
//! its [`ServiceConfigBuilder`]. Object-storage settings live in the nested
//! [`StorageConfig`]. Both are built once at process start and shared
//! read-only by every request.

use crate::error::ConfigError;
use std::fmt;

/// Default region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Environment name under which the test bucket replaces the primary one.
pub const TEST_ENVIRONMENT: &str = "test";

/// Configuration for the conversion pipeline and the HTTP server.
///
/// # Example
/// ```rust
/// use vectorizing::{ServiceConfig, StorageConfig};
///
/// let config = ServiceConfig::builder()
///     .storage(StorageConfig::new("vector-markup"))
///     .download_timeout_secs(10)
///     .build()
///     .unwrap();
/// assert_eq!(config.download_timeout_secs, 10);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Timeout for fetching remote images, in seconds. `0` disables it. Default: 30.
    pub download_timeout_secs: u64,

    /// Timeout for a single strategy run, in seconds. `0` disables it. Default: 120.
    pub solve_timeout_secs: u64,

    /// `User-Agent` sent when fetching remote images.
    pub user_agent: String,

    /// Largest accepted request body in bytes. Default: 32 MiB.
    ///
    /// Embedded base64 images travel inside the JSON body, so this also caps
    /// the size of a data-URI input.
    pub max_payload_bytes: usize,

    /// Deployment environment name, e.g. "development", "production", "test".
    pub environment: String,

    /// Object storage settings.
    pub storage: StorageConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: 30,
            solve_timeout_secs: 120,
            user_agent: format!("Vectorizing/{}", env!("CARGO_PKG_VERSION")),
            max_payload_bytes: 32 * 1024 * 1024,
            environment: "development".to_string(),
            storage: StorageConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Bucket that persisted markup is written to in the current environment.
    pub fn target_bucket(&self) -> &str {
        self.storage.target_bucket(&self.environment)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn solve_timeout_secs(mut self, secs: u64) -> Self {
        self.config.solve_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn max_payload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_payload_bytes = bytes.max(1024);
        self
    }

    pub fn environment(mut self, env: impl Into<String>) -> Self {
        self.config.environment = env.into();
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let c = &self.config;
        if c.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "user_agent",
                reason: "must not be empty".into(),
            });
        }
        if c.environment.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "APP_ENV",
                reason: "must not be empty".into(),
            });
        }
        c.storage.validate()?;
        Ok(self.config)
    }
}

// ── Storage ──────────────────────────────────────────────────────────────

/// Settings for the S3-compatible object store holding generated markup.
#[derive(Clone, Default)]
pub struct StorageConfig {
    /// Primary bucket. Required.
    pub bucket: String,

    /// Bucket used instead of `bucket` when the environment is `test`.
    pub test_bucket: Option<String>,

    pub access_key: Option<String>,

    pub secret_key: Option<String>,

    /// Signing region. Default: `us-east-1`.
    pub region: Option<String>,

    /// Endpoint override, e.g. `http://127.0.0.1:9000` for a local store.
    /// Default: `https://s3.{region}.wasabisys.com`.
    pub endpoint: Option<String>,
}

impl StorageConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    pub fn with_test_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.test_bucket = Some(bucket.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn region(&self) -> &str {
        self.region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
    }

    /// Base URL of the object store, without a trailing slash.
    pub fn endpoint_url(&self) -> String {
        match self.endpoint.as_deref().filter(|e| !e.is_empty()) {
            Some(e) => e.trim_end_matches('/').to_string(),
            None => format!("https://s3.{}.wasabisys.com", self.region()),
        }
    }

    /// Resolve the bucket for an environment name.
    pub fn target_bucket(&self, environment: &str) -> &str {
        match self.test_bucket.as_deref() {
            Some(test) if environment == TEST_ENVIRONMENT && !test.is_empty() => test,
            _ => &self.bucket,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Missing("S3_BUCKET"));
        }
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(ConfigError::Invalid {
                name: "WASABI_ACCESS_KEY",
                reason: "access key and secret key must be set together".into(),
            });
        }
        if let Some(endpoint) = self.endpoint.as_deref() {
            reqwest::Url::parse(endpoint).map_err(|e| ConfigError::Invalid {
                name: "S3_ENDPOINT",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("bucket", &self.bucket)
            .field("test_bucket", &self.test_bucket)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region())
            .field("endpoint", &self.endpoint_url())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ServiceConfig::default();
        assert_eq!(c.download_timeout_secs, 30);
        assert_eq!(c.solve_timeout_secs, 120);
        assert!(c.user_agent.starts_with("Vectorizing/"));
        assert_eq!(c.environment, "development");
    }

    #[test]
    fn build_requires_bucket() {
        let err = ServiceConfig::builder().build().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("S3_BUCKET")));
    }

    #[test]
    fn build_rejects_half_credentials() {
        let mut storage = StorageConfig::new("b");
        storage.access_key = Some("AKIA".into());
        let err = ServiceConfig::builder().storage(storage).build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn build_rejects_bad_endpoint() {
        let storage = StorageConfig::new("b").with_endpoint("not a url");
        assert!(ServiceConfig::builder().storage(storage).build().is_err());
    }

    #[test]
    fn payload_limit_has_floor() {
        let c = ServiceConfig::builder()
            .storage(StorageConfig::new("b"))
            .max_payload_bytes(1)
            .build()
            .unwrap();
        assert_eq!(c.max_payload_bytes, 1024);
    }

    #[test]
    fn endpoint_defaults_to_region() {
        let s = StorageConfig::new("b").with_region("eu-central-1");
        assert_eq!(s.endpoint_url(), "https://s3.eu-central-1.wasabisys.com");
        assert_eq!(
            StorageConfig::new("b").endpoint_url(),
            "https://s3.us-east-1.wasabisys.com"
        );
        let s = StorageConfig::new("b").with_endpoint("http://127.0.0.1:9000/");
        assert_eq!(s.endpoint_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_bucket_only_in_test_environment() {
        let s = StorageConfig::new("prod").with_test_bucket("scratch");
        assert_eq!(s.target_bucket("production"), "prod");
        assert_eq!(s.target_bucket("test"), "scratch");
        assert_eq!(StorageConfig::new("prod").target_bucket("test"), "prod");

        let c = ServiceConfig::builder()
            .storage(s)
            .environment("test")
            .build()
            .unwrap();
        assert_eq!(c.target_bucket(), "scratch");
    }

    #[test]
    fn debug_redacts_secrets() {
        let s = StorageConfig::new("b").with_credentials("AKIAEXAMPLE", "very-secret");
        let dbg = format!("{:?}", s);
        assert!(!dbg.contains("very-secret"));
        assert!(!dbg.contains("AKIAEXAMPLE"));
        assert!(dbg.contains("<redacted>"));
    }
}
