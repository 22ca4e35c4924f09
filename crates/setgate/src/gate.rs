//! Per-site session gate.
//!
//! The gate guarantees three things: every outgoing request carries a
//! usable cookie payload, at most one warmup is in flight per site, and a
//! bot-detection block triggers exactly one invalidate-rewarm-retry cycle.
//! The per-site mutex covers credential resolution only; the outbound data
//! request runs outside it so traffic is never serialized through the lock.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::config::SessionConfig;
use crate::cookie;
use crate::error::SessionError;
use crate::response::GateResponse;
use crate::site::{SiteWarmup, WarmupContext};
use crate::store::{SessionRecord, SessionStore};
use crate::transport::HttpTransport;

/// Where a gate currently stands with its site.
///
/// Diagnostic view of the lifecycle; `Failed` is sticky only until the next
/// call, which starts over from a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    /// No warmup attempted yet in this process.
    Uninitialized,
    /// A warmup is in flight; concurrent callers wait on the mutex.
    Warming,
    /// A usable record exists, from cache or a fresh warmup.
    Ready,
    /// The last warmup failed; the error went to the caller.
    Failed,
}

struct GateState {
    phase: GatePhase,
}

/// Per-request knobs for [`SiteGate::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers merged over the profile's API header set.
    pub headers: HeaderMap,
    /// Some endpoints only answer when a `landing_url` cookie naming the
    /// page the "user" came from rides along. Off by default.
    pub landing_page: Option<String>,
    /// Disable the one-shot rewarm on a block status.
    pub skip_block_retry: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_landing_page(mut self, url: impl Into<String>) -> Self {
        self.landing_page = Some(url.into());
        self
    }

    pub fn without_block_retry(mut self) -> Self {
        self.skip_block_retry = true;
        self
    }
}

/// One site's session lifecycle: cache lookup, deduplicated warmup, and
/// one-shot block recovery.
pub struct SiteGate {
    site: Arc<dyn SiteWarmup>,
    store: Arc<SessionStore>,
    transport: Arc<HttpTransport>,
    config: Arc<SessionConfig>,
    state: Mutex<GateState>,
}

impl SiteGate {
    pub fn new(
        site: Arc<dyn SiteWarmup>,
        store: Arc<SessionStore>,
        transport: Arc<HttpTransport>,
        config: Arc<SessionConfig>,
    ) -> Self {
        Self {
            site,
            store,
            transport,
            config,
            state: Mutex::new(GateState {
                phase: GatePhase::Uninitialized,
            }),
        }
    }

    pub fn site_key(&self) -> &str {
        self.site.key()
    }

    pub async fn phase(&self) -> GatePhase {
        self.state.lock().await.phase
    }

    /// GET `url` with this site's session cookies attached.
    ///
    /// On a block status the gate refreshes the session and retries exactly
    /// once; a second block comes back as a normal response so the caller
    /// can see the status and body. Warmup failures are the only errors
    /// specific to this layer.
    #[instrument(skip(self, options), fields(site = %self.site.key()))]
    pub async fn request(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<GateResponse, SessionError> {
        let record = self.resolve().await?;
        let response = self.send(url, options, &record).await?;

        if !response.blocked(&self.config) || options.skip_block_retry {
            return Ok(response);
        }

        warn!(
            status = response.status.as_u16(),
            url, "bot block detected; refreshing session and retrying once"
        );
        let record = self.rewarm_after_block(&record).await?;
        let retried = self.send(url, options, &record).await?;
        if retried.blocked(&self.config) {
            warn!(
                status = retried.status.as_u16(),
                url, "still blocked after session refresh; returning response as-is"
            );
        }
        Ok(retried)
    }

    /// Make sure a usable session exists, warming up if needed.
    ///
    /// With `force` the cached record is dropped first. Returns the record
    /// in effect afterwards.
    pub async fn warm(&self, force: bool) -> Result<SessionRecord, SessionError> {
        if !force {
            return self.resolve().await;
        }
        let mut state = self.state.lock().await;
        self.store
            .invalidate(self.site.key(), self.config.profile.tag())
            .await;
        self.warm_locked(&mut state).await
    }

    /// Drop the cached session. The next request warms up from scratch.
    pub async fn invalidate(&self) -> bool {
        let mut state = self.state.lock().await;
        state.phase = GatePhase::Uninitialized;
        self.store
            .invalidate(self.site.key(), self.config.profile.tag())
            .await
    }

    /// Credential resolution, the only step under the per-site mutex.
    async fn resolve(&self) -> Result<SessionRecord, SessionError> {
        let mut state = self.state.lock().await;
        if let Some(record) = self
            .store
            .get(self.site.key(), self.config.profile.tag())
            .await
        {
            state.phase = GatePhase::Ready;
            return Ok(record);
        }
        self.warm_locked(&mut state).await
    }

    /// Recovery cycle after a block: invalidate, rewarm, hand back the
    /// replacement record.
    ///
    /// Checks the cache again under the lock first: when several in-flight
    /// requests get blocked on the same stale record, only the first one
    /// rewarms and the rest reuse its result.
    async fn rewarm_after_block(
        &self,
        used: &SessionRecord,
    ) -> Result<SessionRecord, SessionError> {
        let mut state = self.state.lock().await;

        if let Some(current) = self
            .store
            .get(self.site.key(), self.config.profile.tag())
            .await
        {
            if current.captured_at != used.captured_at
                || current.cookie_payload != used.cookie_payload
            {
                debug!("session already refreshed by another caller; reusing");
                state.phase = GatePhase::Ready;
                return Ok(current);
            }
        }

        self.store
            .invalidate(self.site.key(), self.config.profile.tag())
            .await;
        self.warm_locked(&mut state).await
    }

    async fn warm_locked(&self, state: &mut GateState) -> Result<SessionRecord, SessionError> {
        state.phase = GatePhase::Warming;
        let ctx = WarmupContext {
            transport: &self.transport,
            config: &self.config,
        };
        match self.site.warm(&ctx).await {
            Ok(record) => {
                self.store.put(&record).await;
                state.phase = GatePhase::Ready;
                Ok(record)
            }
            Err(e) => {
                state.phase = GatePhase::Failed;
                Err(e)
            }
        }
    }

    /// The real data request, issued outside the mutex.
    async fn send(
        &self,
        url: &str,
        options: &RequestOptions,
        record: &SessionRecord,
    ) -> Result<GateResponse, SessionError> {
        let mut headers = self.config.profile.api_headers(&self.site.api_referer());
        headers.extend(options.headers.clone());

        let payload = match &options.landing_page {
            Some(page) => {
                cookie::append_cookie(&record.cookie_payload, cookie::LANDING_URL_COOKIE, page)
            }
            None => record.cookie_payload.clone(),
        };

        self.transport.get(url, &headers, Some(&payload)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::BrowserProfile;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    struct StubSite {
        calls: Arc<AtomicU32>,
        fail_first: bool,
    }

    impl StubSite {
        fn new() -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    calls: Arc::clone(&calls),
                    fail_first: false,
                },
                calls,
            )
        }

        fn failing_once() -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    calls: Arc::clone(&calls),
                    fail_first: true,
                },
                calls,
            )
        }
    }

    #[async_trait::async_trait]
    impl SiteWarmup for StubSite {
        fn key(&self) -> &'static str {
            "set"
        }

        fn landing_url(&self) -> String {
            "https://stub.invalid/en/home".to_string()
        }

        async fn warm(&self, _ctx: &WarmupContext<'_>) -> Result<SessionRecord, SessionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(SessionError::warmup("set", "stub landing unreachable"));
            }
            Ok(SessionRecord::new(
                "set",
                BrowserProfile::Chrome120.tag(),
                format!("sid=warm{n}"),
                3600,
            ))
        }
    }

    fn build_gate(site: StubSite, dir: &TempDir) -> (SiteGate, Arc<SessionStore>) {
        let config = Arc::new(SessionConfig::default());
        let store = Arc::new(SessionStore::new(Some(dir.path().to_path_buf())).unwrap());
        let transport = Arc::new(HttpTransport::new(&config).unwrap());
        let gate = SiteGate::new(Arc::new(site), Arc::clone(&store), transport, config);
        (gate, store)
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_warmup() {
        let dir = TempDir::new().unwrap();
        let (site, calls) = StubSite::new();
        let (gate, _store) = build_gate(site, &dir);

        let (a, b) = tokio::join!(gate.warm(false), gate.warm(false));
        let a = a.unwrap();
        let b = b.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.cookie_payload, b.cookie_payload);
        assert_eq!(gate.phase().await, GatePhase::Ready);
    }

    #[tokio::test]
    async fn cached_record_short_circuits_warmup() {
        let dir = TempDir::new().unwrap();
        let (site, calls) = StubSite::new();
        let (gate, store) = build_gate(site, &dir);
        store
            .put(&SessionRecord::new("set", "chrome120", "sid=cached", 3600))
            .await;

        let record = gate.warm(false).await.unwrap();

        assert_eq!(record.cookie_payload, "sid=cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(gate.phase().await, GatePhase::Ready);
    }

    #[tokio::test]
    async fn expired_record_forces_fresh_warmup() {
        let dir = TempDir::new().unwrap();
        let (site, calls) = StubSite::new();
        let (gate, store) = build_gate(site, &dir);
        store
            .put(&SessionRecord::new("set", "chrome120", "sid=stale", -10))
            .await;

        let record = gate.warm(false).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(record.cookie_payload, "sid=warm0");
    }

    #[tokio::test]
    async fn failed_warmup_surfaces_then_next_call_recovers() {
        let dir = TempDir::new().unwrap();
        let (site, calls) = StubSite::failing_once();
        let (gate, _store) = build_gate(site, &dir);

        let err = gate.warm(false).await.unwrap_err();
        assert!(matches!(err, SessionError::Warmup { .. }));
        assert_eq!(gate.phase().await, GatePhase::Failed);

        let record = gate.warm(false).await.unwrap();
        assert_eq!(record.cookie_payload, "sid=warm1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(gate.phase().await, GatePhase::Ready);
    }

    #[tokio::test]
    async fn force_warm_replaces_a_valid_record() {
        let dir = TempDir::new().unwrap();
        let (site, calls) = StubSite::new();
        let (gate, store) = build_gate(site, &dir);
        store
            .put(&SessionRecord::new("set", "chrome120", "sid=old", 3600))
            .await;

        let record = gate.warm(true).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(record.cookie_payload, "sid=warm0");
        let on_disk = store.get("set", "chrome120").await.unwrap();
        assert_eq!(on_disk.cookie_payload, "sid=warm0");
    }

    #[tokio::test]
    async fn invalidate_resets_phase_and_store() {
        let dir = TempDir::new().unwrap();
        let (site, _calls) = StubSite::new();
        let (gate, store) = build_gate(site, &dir);

        gate.warm(false).await.unwrap();
        assert_eq!(gate.phase().await, GatePhase::Ready);

        assert!(gate.invalidate().await);
        assert_eq!(gate.phase().await, GatePhase::Uninitialized);
        assert!(store.get("set", "chrome120").await.is_none());
    }

    #[tokio::test]
    async fn request_options_builders_compose() {
        let options = RequestOptions::new()
            .with_header(
                HeaderName::from_static("x-client-uuid"),
                HeaderValue::from_static("abc-123"),
            )
            .with_landing_page("https://www.set.or.th/en/market/product/stock/quote/PTT/price")
            .without_block_retry();

        assert_eq!(options.headers.len(), 1);
        assert!(options.landing_page.as_deref().unwrap().ends_with("/price"));
        assert!(options.skip_block_retry);
    }
}
