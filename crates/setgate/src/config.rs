use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;

use crate::error::SessionError;
use crate::profile::BrowserProfile;
use crate::retry::RetryPolicy;

/// How long harvested session cookies stay reusable.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status codes treated as a bot-detection block. 452 is a non-standard
/// code the SET edge returns alongside the usual 403.
pub const DEFAULT_BLOCK_STATUSES: &[u16] = &[403, 452];

pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Configurable options for the session layer.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Simulated browser identity; also part of the session cache key.
    pub profile: BrowserProfile,

    /// TTL applied to freshly warmed session records.
    pub session_ttl: Duration,

    /// Overall timeout for each HTTP request.
    pub request_timeout: Duration,

    /// Connection timeout (time to establish the initial connection).
    pub connect_timeout: Duration,

    /// Transport-level retry behavior for connect/timeout failures.
    pub retry: RetryPolicy,

    /// Status codes interpreted as a bot-detection block on the real
    /// request. Injectable: upstream has changed this set before.
    pub block_statuses: Vec<u16>,

    /// Maximum redirect hops followed while accumulating cookies.
    pub max_redirects: usize,

    /// Session store directory. `None` resolves to `~/.setgate/sessions`.
    pub store_dir: Option<PathBuf>,

    /// Optional pause before each outgoing request, for burst smoothing.
    pub rate_limit_delay: Option<Duration>,

    /// Supplement harvested cookies with synthetic browser-footprint
    /// cookies.
    pub decoy_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            profile: BrowserProfile::default(),
            session_ttl: DEFAULT_SESSION_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry: RetryPolicy::default(),
            block_statuses: DEFAULT_BLOCK_STATUSES.to_vec(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            store_dir: None,
            rate_limit_delay: None,
            decoy_cookies: true,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: BrowserProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_block_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.block_statuses = statuses;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(dir.into());
        self
    }

    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = Some(delay);
        self
    }

    pub fn with_decoy_cookies(mut self, enabled: bool) -> Self {
        self.decoy_cookies = enabled;
        self
    }

    /// Whether `status` means the upstream's bot detection rejected us.
    pub fn is_block_status(&self, status: StatusCode) -> bool {
        self.block_statuses.contains(&status.as_u16())
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.session_ttl.is_zero() {
            return Err(SessionError::configuration(
                "session_ttl must be greater than zero",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(SessionError::configuration(
                "request_timeout must be greater than zero",
            ));
        }
        if self.block_statuses.is_empty() {
            return Err(SessionError::configuration(
                "block_statuses must list at least one status code",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.block_statuses, vec![403, 452]);
        assert!(config.decoy_cookies);
        assert!(config.store_dir.is_none());
    }

    #[test]
    fn builder_chain_applies_every_field() {
        let config = SessionConfig::new()
            .with_profile(BrowserProfile::Safari17)
            .with_session_ttl(Duration::from_secs(60))
            .with_block_statuses(vec![429])
            .with_max_redirects(2)
            .with_store_dir("/tmp/setgate-test")
            .with_rate_limit_delay(Duration::from_millis(250))
            .with_decoy_cookies(false);

        assert_eq!(config.profile, BrowserProfile::Safari17);
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.block_statuses, vec![429]);
        assert_eq!(config.max_redirects, 2);
        assert_eq!(config.store_dir.as_deref().unwrap().to_str(), Some("/tmp/setgate-test"));
        assert_eq!(config.rate_limit_delay, Some(Duration::from_millis(250)));
        assert!(!config.decoy_cookies);
    }

    #[test]
    fn validate_rejects_degenerate_values() {
        assert!(
            SessionConfig::new()
                .with_session_ttl(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            SessionConfig::new()
                .with_block_statuses(Vec::new())
                .validate()
                .is_err()
        );
        assert!(
            SessionConfig::new()
                .with_request_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn block_status_matching_uses_the_configured_set() {
        let config = SessionConfig::new().with_block_statuses(vec![452]);
        assert!(config.is_block_status(StatusCode::from_u16(452).unwrap()));
        assert!(!config.is_block_status(StatusCode::FORBIDDEN));

        let default = SessionConfig::default();
        assert!(default.is_block_status(StatusCode::FORBIDDEN));
        assert!(!default.is_block_status(StatusCode::TOO_MANY_REQUESTS));
    }
}
