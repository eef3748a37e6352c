/**
 * ============================================================================
 * DELIVERY CONFIGURATION MODULE
 * ============================================================================
 *
 * PURPOSE: Configuration schema, defaults, and validation
 *
 * A DeliveryConfig is built once by the host and moved into a Coordinator.
 * The core reads no environment variables and no config files; loading
 * settings from disk is left to the host application.
 *
 * DEFAULTS:
 * - credentials: none (posting without them is fatal)
 * - queue_path: ~/.pocketlife-queue.json
 * - request_timeout_seconds: 10
 *
 * ============================================================================
 */

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the durable queue under the user's home directory
pub const QUEUE_FILE_NAME: &str = ".pocketlife-queue.json";

/// Hard deadline for a single HTTP attempt
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/**
 * Destination credentials for the telemetry endpoint
 * The password is redacted from Debug output so it never reaches logs
 */
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub endpoint: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            endpoint: endpoint.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/**
 * Complete delivery configuration
 */
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryConfig {
    // Basic-auth credentials and endpoint URL
    pub credentials: Option<Credentials>,

    // Location of the line-delimited durable queue
    #[serde(default = "default_queue_path")]
    pub queue_path: PathBuf,

    // Per-attempt HTTP timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/**
 * Resolve the well-known queue location
 * Falls back to the working directory when no home directory is known
 */
pub fn default_queue_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(QUEUE_FILE_NAME),
        None => {
            log::warn!("Home directory unavailable, keeping queue in working directory");
            PathBuf::from(QUEUE_FILE_NAME)
        }
    }
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            queue_path: default_queue_path(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl DeliveryConfig {
    /**
     * Config with credentials and every other setting at its default
     */
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Some(Credentials::new(username, password, hostname)),
            ..Self::default()
        }
    }

    pub fn with_queue_path(mut self, queue_path: impl Into<PathBuf>) -> Self {
        self.queue_path = queue_path.into();
        self
    }

    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /**
     * Validate configuration values
     * Missing credentials are not a validation error; they are only fatal
     * once something is actually posted.
     */
    pub fn validate(&self) -> Result<(), String> {
        if let Some(credentials) = &self.credentials {
            if !credentials.endpoint.starts_with("http://")
                && !credentials.endpoint.starts_with("https://")
            {
                return Err("endpoint must start with http:// or https://".to_string());
            }
        }

        if self.request_timeout_seconds < 1 || self.request_timeout_seconds > MAX_REQUEST_TIMEOUT_SECS {
            return Err(format!(
                "request_timeout_seconds must be between 1 and {}",
                MAX_REQUEST_TIMEOUT_SECS
            ));
        }

        if self.queue_path.as_os_str().is_empty() {
            return Err("queue_path must not be empty".to_string());
        }

        Ok(())
    }
}
