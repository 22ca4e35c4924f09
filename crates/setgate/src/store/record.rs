//! Cached session records and their cache keys.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Bumped when the on-disk layout changes; older files are treated as misses.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// A warmed-up session for one site and browser profile.
///
/// The cookie payload is stored exactly as it will be sent in the `Cookie`
/// request header. It is opaque to the store: invalid or stale cookies are
/// discovered by the site responding with a block status, not by inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub schema: u32,
    pub site: String,
    pub profile: String,
    pub cookie_payload: String,
    /// Unix timestamp (seconds) when the warmup completed.
    pub captured_at: i64,
    /// Unix timestamp (seconds) after which the record is a cache miss.
    pub expires_at: i64,
}

impl SessionRecord {
    pub fn new(
        site: impl Into<String>,
        profile: impl Into<String>,
        cookie_payload: impl Into<String>,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            schema: RECORD_SCHEMA_VERSION,
            site: site.into(),
            profile: profile.into(),
            cookie_payload: cookie_payload.into(),
            captured_at: now,
            expires_at: now + ttl_secs,
        }
    }

    /// Cache key for a site/profile pair, e.g. `set_chrome120`.
    pub fn cache_key(site: &str, profile: &str) -> String {
        format!("{site}_{profile}")
    }

    pub fn key(&self) -> String {
        Self::cache_key(&self.site, &self.profile)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.expires_at
    }

    /// Expired records and records with nothing to send are both unusable.
    pub fn is_usable(&self) -> bool {
        !self.is_expired() && !self.cookie_payload.is_empty()
    }

    /// Seconds since the warmup that produced this record.
    pub fn age_secs(&self) -> i64 {
        (Utc::now().timestamp() - self.captured_at).max(0)
    }

    /// Seconds until expiry, zero when already expired.
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now().timestamp()).max(0)
    }
}
