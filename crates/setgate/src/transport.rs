//! HTTP transport for warmup and data requests.
//!
//! Redirects are followed manually: the bot-detection layer sets its
//! cookies on the redirect responses themselves, and reqwest's automatic
//! redirect handling drops those intermediate `Set-Cookie` headers. Each
//! hop's cookies are both forwarded to the next hop and surfaced to the
//! caller on the final [`GateResponse`].

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use tracing::{debug, trace};
use url::Url;

use crate::config::SessionConfig;
use crate::cookie;
use crate::error::SessionError;
use crate::response::GateResponse;
use crate::retry::{RetryAction, RetryPolicy, is_retryable_reqwest_error, retry_with_backoff};

fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate may have installed one first; not a problem.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Shared HTTP client wrapper used by every site gate.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    retry: RetryPolicy,
    max_redirects: usize,
    rate_limit_delay: Option<Duration>,
}

impl HttpTransport {
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        install_rustls_provider();

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
            max_redirects: config.max_redirects,
            rate_limit_delay: config.rate_limit_delay,
        })
    }

    /// Issue a GET with the given header set and optional cookie payload.
    ///
    /// Transport failures (connect, timeout, body read) are retried per the
    /// configured policy. HTTP statuses are never retried here; they come
    /// back in the [`GateResponse`] for the gate or the caller to judge.
    pub async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        cookie_payload: Option<&str>,
    ) -> Result<GateResponse, SessionError> {
        if let Some(delay) = self.rate_limit_delay {
            trace!(delay_ms = delay.as_millis() as u64, "rate limit pause");
            tokio::time::sleep(delay).await;
        }

        retry_with_backoff(&self.retry, |attempt| async move {
            if attempt > 0 {
                debug!(url, attempt, "retrying request");
            }
            match self.execute_once(url, headers, cookie_payload).await {
                Ok(response) => RetryAction::Success(response),
                Err(SessionError::Network { source }) if is_retryable_reqwest_error(&source) => {
                    RetryAction::Retry(SessionError::Network { source })
                }
                Err(err) => RetryAction::Fail(err),
            }
        })
        .await
    }

    /// One full request including the manual redirect chain.
    async fn execute_once(
        &self,
        url: &str,
        headers: &HeaderMap,
        cookie_payload: Option<&str>,
    ) -> Result<GateResponse, SessionError> {
        let started = Instant::now();
        let mut current =
            Url::parse(url).map_err(|e| SessionError::invalid_url(url, e.to_string()))?;
        let mut payload = cookie_payload.map(str::to_owned);
        let mut hop_set_cookies: Vec<HeaderValue> = Vec::new();
        let mut hops = 0usize;

        loop {
            let mut request = self.client.get(current.clone()).headers(headers.clone());
            if let Some(ref p) = payload {
                let value = HeaderValue::from_str(p).map_err(|e| {
                    SessionError::internal(format!("cookie payload not header-safe: {e}"))
                })?;
                request = request.header(header::COOKIE, value);
            }

            let response = request.send().await?;
            let status = response.status();

            for value in response.headers().get_all(header::SET_COOKIE) {
                hop_set_cookies.push(value.clone());
            }

            if !status.is_redirection() {
                return self
                    .finish(response, status, hop_set_cookies, current, started)
                    .await;
            }

            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    SessionError::invalid_url(current.as_str(), "redirect without Location header")
                })?;
            let next = current.join(location).map_err(|e| {
                SessionError::invalid_url(location, format!("unresolvable redirect target: {e}"))
            })?;

            hops += 1;
            if hops > self.max_redirects {
                return Err(SessionError::TooManyRedirects {
                    url: url.to_string(),
                    limit: self.max_redirects,
                });
            }

            // A browser sends cookies a hop just set when it follows the
            // redirect; Incapsula relies on exactly that.
            let harvested = cookie::parse_set_cookies(response.headers());
            if !harvested.is_empty() {
                let mut merged = payload.unwrap_or_default();
                for (name, value) in &harvested {
                    merged = cookie::append_cookie(&merged, name, value);
                }
                payload = Some(merged);
            }

            debug!(
                from = %current,
                to = %next,
                status = status.as_u16(),
                cookies = harvested.len(),
                "following redirect"
            );
            current = next;
        }
    }

    async fn finish(
        &self,
        response: reqwest::Response,
        status: StatusCode,
        hop_set_cookies: Vec<HeaderValue>,
        final_url: Url,
        started: Instant,
    ) -> Result<GateResponse, SessionError> {
        let mut headers = response.headers().clone();
        let body = response.bytes().await?;

        // Replay the whole chain's Set-Cookie entries in arrival order so
        // later hops win when a name repeats.
        headers.remove(header::SET_COOKIE);
        for value in hop_set_cookies {
            headers.append(header::SET_COOKIE, value);
        }

        Ok(GateResponse {
            status,
            headers,
            body,
            final_url: final_url.into(),
            elapsed: started.elapsed(),
        })
    }
}
