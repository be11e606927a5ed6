//! Fetch configuration loaded from environment variables.
//!
//! Defaults are safe for production use: HTTPS only, 30 second timeout.

use std::time::Duration;

/// Default upper bound on a single fetch (100 MiB).
pub const DEFAULT_MAX_FETCH_BYTES: u64 = 100 * 1024 * 1024;

/// Default fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Upper bound on a whole fetch, connect to last byte.
    /// Env: `COLIS_FETCH_TIMEOUT_SECS`
    /// Default: `30`
    pub timeout: Duration,

    /// Largest ciphertext accepted from storage.
    /// Env: `COLIS_MAX_FETCH_BYTES`
    /// Default: 100 MiB
    pub max_bytes: u64,

    /// Env: `COLIS_USER_AGENT`
    /// Default: `colis/<crate version>`
    pub user_agent: String,

    /// Also serve plain `http://` pointers. Local development only.
    /// Env: `COLIS_ALLOW_HTTP` (true/false)
    /// Default: `false`
    pub allow_http: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_bytes: DEFAULT_MAX_FETCH_BYTES,
            user_agent: format!("colis/{}", env!("CARGO_PKG_VERSION")),
            allow_http: false,
        }
    }
}

impl FetchConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("COLIS_FETCH_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %val,
                    "Invalid COLIS_FETCH_TIMEOUT_SECS, using default"
                ),
            }
        }

        if let Some(val) = lookup("COLIS_MAX_FETCH_BYTES") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => config.max_bytes = n,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid COLIS_MAX_FETCH_BYTES, using default"
                ),
            }
        }

        if let Some(ua) = lookup("COLIS_USER_AGENT") {
            if !ua.is_empty() {
                config.user_agent = ua;
            }
        }

        if let Some(val) = lookup("COLIS_ALLOW_HTTP") {
            config.allow_http = val == "true" || val == "1";
        }

        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_allow_http(mut self, allow_http: bool) -> Self {
        self.allow_http = allow_http;
        self
    }
}
