//! Site definitions: where to warm up and how to address each exchange.

mod set;
mod tfex;

pub use set::{SET_BASE_URL, SET_LANDING_URL, SetSite};
pub use tfex::{TFEX_BASE_URL, TFEX_LANDING_URL, TfexSite};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::cookie;
use crate::error::SessionError;
use crate::store::SessionRecord;
use crate::transport::HttpTransport;

/// Everything a warmup needs that is owned by the gate, not the site.
pub struct WarmupContext<'a> {
    pub transport: &'a HttpTransport,
    pub config: &'a SessionConfig,
}

/// A site that hands out anti-bot cookies on its landing page.
///
/// The default [`warm`](SiteWarmup::warm) visits the landing page as a
/// browser navigation, harvests every `Set-Cookie` across the redirect
/// chain, and assembles the payload that later rides on API requests.
/// Sites with a different bootstrap can override it.
#[async_trait]
pub trait SiteWarmup: Send + Sync {
    /// Short lowercase identifier used in cache keys and logs, e.g. `set`.
    fn key(&self) -> &'static str;

    /// The page a browser would land on; this is what hands out cookies.
    fn landing_url(&self) -> String;

    /// Referer for API calls. The landing page unless the site needs else.
    fn api_referer(&self) -> String {
        self.landing_url()
    }

    /// Site-specific headers merged into the warmup navigation.
    fn extra_headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    async fn warm(&self, ctx: &WarmupContext<'_>) -> Result<SessionRecord, SessionError> {
        let site = self.key();
        let profile = ctx.config.profile;
        let url = self.landing_url();
        debug!(site, profile = %profile, url, "warming session");

        let mut headers = profile.navigation_headers();
        headers.extend(self.extra_headers());

        let response = ctx
            .transport
            .get(&url, &headers, None)
            .await
            .map_err(|e| SessionError::warmup(site, e.to_string()))?;

        if !response.status.is_success() {
            return Err(SessionError::warmup(
                site,
                format!("landing request returned HTTP {}", response.status),
            ));
        }

        let harvested = cookie::parse_set_cookies(&response.headers);
        if harvested.is_empty() {
            // A landing page that sets nothing cannot have issued a session;
            // decoys alone will not get past the bot filter.
            return Err(SessionError::warmup(site, "landing response set no cookies"));
        }

        let base = if ctx.config.decoy_cookies {
            cookie::decoy_cookie_pairs()
        } else {
            Vec::new()
        };
        let payload = cookie::assemble_payload(&base, &harvested);

        info!(
            site,
            profile = %profile,
            harvested = harvested.len(),
            elapsed_ms = response.elapsed.as_millis() as u64,
            "session warmup complete"
        );

        let ttl = i64::try_from(ctx.config.session_ttl.as_secs()).unwrap_or(i64::MAX);
        Ok(SessionRecord::new(site, profile.tag(), payload, ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use std::time::Duration;

    struct TestSite {
        base: String,
    }

    impl SiteWarmup for TestSite {
        fn key(&self) -> &'static str {
            "set"
        }

        fn landing_url(&self) -> String {
            format!("{}/en/home", self.base)
        }
    }

    fn quick_config() -> SessionConfig {
        SessionConfig::default().with_retry(RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            jitter: false,
        })
    }

    async fn run_warm(
        server: &mockito::Server,
        config: &SessionConfig,
    ) -> Result<SessionRecord, SessionError> {
        let transport = HttpTransport::new(config).unwrap();
        let site = TestSite {
            base: server.url(),
        };
        let ctx = WarmupContext {
            transport: &transport,
            config,
        };
        site.warm(&ctx).await
    }

    #[tokio::test]
    async fn warm_harvests_landing_cookies() {
        let mut server = mockito::Server::new_async().await;
        let landing = server
            .mock("GET", "/en/home")
            .match_header("user-agent", mockito::Matcher::Regex("Mozilla".into()))
            .with_status(200)
            .with_header("set-cookie", "visid_incap_2046605=abc; Path=/; HttpOnly")
            .with_header("set-cookie", "incap_ses_357_2046605=def; Path=/")
            .with_body("<html></html>")
            .create_async()
            .await;

        let config = quick_config().with_decoy_cookies(false);
        let record = run_warm(&server, &config).await.unwrap();

        landing.assert_async().await;
        assert_eq!(record.site, "set");
        assert_eq!(record.profile, "chrome120");
        assert!(record.cookie_payload.contains("visid_incap_2046605=abc"));
        assert!(record.cookie_payload.contains("incap_ses_357_2046605=def"));
        assert!(record.is_usable());
    }

    #[tokio::test]
    async fn warm_prepends_decoys_when_enabled() {
        let mut server = mockito::Server::new_async().await;
        let _landing = server
            .mock("GET", "/en/home")
            .with_status(200)
            .with_header("set-cookie", "incap_ses_357_2046605=real")
            .create_async()
            .await;

        let config = quick_config().with_decoy_cookies(true);
        let record = run_warm(&server, &config).await.unwrap();

        // Decoys lead, the harvested value replaces the synthetic one in place.
        assert!(record.cookie_payload.starts_with("__lt__cid="));
        assert!(record.cookie_payload.contains("incap_ses_357_2046605=real"));
        assert!(!record.cookie_payload.contains("incap_ses_357_2046605=real; incap_ses_357_2046605"));
    }

    #[tokio::test]
    async fn warm_fails_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _landing = server
            .mock("GET", "/en/home")
            .with_status(503)
            .create_async()
            .await;

        let err = run_warm(&server, &quick_config()).await.unwrap_err();
        match err {
            SessionError::Warmup { site, reason } => {
                assert_eq!(site, "set");
                assert!(reason.contains("503"));
            }
            other => panic!("expected Warmup, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn warm_fails_when_landing_sets_no_cookies() {
        let mut server = mockito::Server::new_async().await;
        let _landing = server
            .mock("GET", "/en/home")
            .with_status(200)
            .with_body("<html>static mirror</html>")
            .create_async()
            .await;

        // Even with decoys enabled a cookie-less landing is a failed warmup.
        let config = quick_config().with_decoy_cookies(true);
        let err = run_warm(&server, &config).await.unwrap_err();
        assert!(matches!(err, SessionError::Warmup { .. }));
    }
}
