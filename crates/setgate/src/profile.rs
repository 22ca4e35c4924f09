//! Simulated browser identities.
//!
//! A profile bundles the User-Agent and the two header sets a real browser
//! would send: the navigation set used for the warmup page visit and the
//! XHR set used for the actual JSON API calls. The profile tag is part of
//! the session cache key so cookies harvested under one fingerprint are
//! never replayed under another.

use std::fmt;
use std::str::FromStr;

use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::debug;

use crate::error::SessionError;

/// A simulated browser/client fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserProfile {
    /// Chrome 120 on macOS (default).
    #[default]
    Chrome120,
    /// Chrome 116 on macOS.
    Chrome116,
    /// Edge 120 on Windows.
    Edge120,
    /// Safari 17 on macOS.
    Safari17,
}

impl BrowserProfile {
    /// Cache-key segment for this profile, e.g. `"chrome120"`.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Chrome120 => "chrome120",
            Self::Chrome116 => "chrome116",
            Self::Edge120 => "edge120",
            Self::Safari17 => "safari17",
        }
    }

    pub fn user_agent(&self) -> &'static str {
        match self {
            Self::Chrome120 => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            }
            Self::Chrome116 => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36"
            }
            Self::Edge120 => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0"
            }
            Self::Safari17 => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15"
            }
        }
    }

    /// Client-hint brand list. Safari does not send `Sec-Ch-Ua` headers.
    fn sec_ch_ua(&self) -> Option<&'static str> {
        match self {
            Self::Chrome120 => {
                Some(r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#)
            }
            Self::Chrome116 => {
                Some(r#""Chromium";v="116", "Not)A;Brand";v="24", "Google Chrome";v="116""#)
            }
            Self::Edge120 => {
                Some(r#""Not_A Brand";v="8", "Chromium";v="120", "Microsoft Edge";v="120""#)
            }
            Self::Safari17 => None,
        }
    }

    fn sec_ch_ua_platform(&self) -> &'static str {
        match self {
            Self::Edge120 => "\"Windows\"",
            _ => "\"macOS\"",
        }
    }

    /// Header set for the warmup page visit, matching a top-level browser
    /// navigation.
    ///
    /// `Accept-Encoding` is intentionally absent: reqwest adds it (and
    /// transparently decompresses) for the features compiled in, as long as
    /// the header is not overridden.
    pub fn navigation_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(self.user_agent()),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(header::DNT, HeaderValue::from_static("1"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );
        headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
        headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        self.insert_client_hints(&mut headers);
        headers
    }

    /// Header set for the JSON API calls, matching a same-origin XHR issued
    /// from `referer`.
    pub fn api_headers(&self, referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(self.user_agent()),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,th-TH;q=0.8,th;q=0.7"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert("priority", HeaderValue::from_static("u=1, i"));
        match HeaderValue::from_str(referer) {
            Ok(value) => {
                headers.insert(header::REFERER, value);
            }
            Err(e) => {
                debug!(error = %e, referer, "Invalid referer value; skipping");
            }
        }
        headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
        self.insert_client_hints(&mut headers);
        headers
    }

    fn insert_client_hints(&self, headers: &mut HeaderMap) {
        if let Some(brands) = self.sec_ch_ua() {
            headers.insert("sec-ch-ua", HeaderValue::from_static(brands));
            headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
            headers.insert(
                "sec-ch-ua-platform",
                HeaderValue::from_static(self.sec_ch_ua_platform()),
            );
        }
    }
}

impl fmt::Display for BrowserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BrowserProfile {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chrome120" => Ok(Self::Chrome120),
            "chrome116" => Ok(Self::Chrome116),
            "edge120" => Ok(Self::Edge120),
            "safari17" => Ok(Self::Safari17),
            other => Err(SessionError::configuration(format!(
                "unknown browser profile `{other}` (expected one of: chrome120, chrome116, edge120, safari17)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_through_from_str() {
        for profile in [
            BrowserProfile::Chrome120,
            BrowserProfile::Chrome116,
            BrowserProfile::Edge120,
            BrowserProfile::Safari17,
        ] {
            assert_eq!(profile.tag().parse::<BrowserProfile>().unwrap(), profile);
        }
        assert!("netscape4".parse::<BrowserProfile>().is_err());
    }

    #[test]
    fn navigation_headers_look_like_a_page_visit() {
        let headers = BrowserProfile::Chrome120.navigation_headers();
        assert_eq!(headers.get("sec-fetch-dest").unwrap(), "document");
        assert_eq!(headers.get("sec-fetch-mode").unwrap(), "navigate");
        assert_eq!(headers.get(header::UPGRADE_INSECURE_REQUESTS).unwrap(), "1");
        assert!(headers.get(header::ACCEPT_ENCODING).is_none());
        assert!(
            headers
                .get(header::ACCEPT)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );
    }

    #[test]
    fn api_headers_look_like_same_origin_xhr() {
        let headers = BrowserProfile::Chrome120.api_headers("https://www.set.or.th/en/home");
        assert_eq!(headers.get("sec-fetch-mode").unwrap(), "cors");
        assert_eq!(headers.get("sec-fetch-dest").unwrap(), "empty");
        assert_eq!(
            headers.get(header::REFERER).unwrap(),
            "https://www.set.or.th/en/home"
        );
        assert_eq!(
            headers.get(header::ACCEPT).unwrap(),
            "application/json, text/plain, */*"
        );
    }

    #[test]
    fn safari_sends_no_client_hints() {
        let headers = BrowserProfile::Safari17.api_headers("https://www.set.or.th/en/home");
        assert!(headers.get("sec-ch-ua").is_none());
        assert!(headers.get("sec-ch-ua-platform").is_none());

        let chrome = BrowserProfile::Chrome120.api_headers("https://www.set.or.th/en/home");
        assert!(chrome.get("sec-ch-ua").is_some());
    }
}
