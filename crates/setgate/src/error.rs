use crate::retry::is_retryable_reqwest_error;

/// Errors surfaced by the session layer.
///
/// Storage failures never appear here: the session store absorbs them and
/// degrades to cache-miss behavior. A bot-block response is not an error
/// either; it comes back as an ordinary [`GateResponse`](crate::GateResponse)
/// whose status the caller can inspect.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("warmup failed for site `{site}`: {reason}")]
    Warmup { site: String, reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("retries exhausted after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: u32, reason: String },

    #[error("redirect limit of {limit} exceeded while fetching {url}")]
    TooManyRedirects { url: String, limit: usize },

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("unknown site `{site}` (not registered)")]
    UnknownSite { site: String },

    #[error("failed to decode response body: {reason}")]
    Decode { reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl SessionError {
    pub fn warmup(site: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Warmup {
            site: site.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_site(site: impl Into<String>) -> Self {
        Self::UnknownSite { site: site.into() }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Whether a caller-level retry has any chance of succeeding.
    ///
    /// Warmup failures are usually transient upstream conditions and worth a
    /// later retry; exhausted transport retries and local misconfiguration
    /// are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Warmup { .. } => true,
            Self::Network { source } => is_retryable_reqwest_error(source),
            Self::RetriesExhausted { .. }
            | Self::TooManyRedirects { .. }
            | Self::InvalidUrl { .. }
            | Self::UnknownSite { .. }
            | Self::Decode { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => false,
        }
    }
}
