//! Cookie parsing, payload assembly, and decoy synthesis.
//!
//! The session layer stores cookies as an opaque payload string of
//! `name=value` pairs joined by `"; "`, the exact form sent in a `Cookie`
//! request header. Helpers here convert between `Set-Cookie` response
//! headers and that payload, and synthesize the browser-footprint decoy
//! cookies the SET/TFEX bot-detection layer expects from a real session.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use rand::RngExt;
use reqwest::header::{self, HeaderMap};
use rustc_hash::FxHashMap;
use uuid::Uuid;

/// Pseudo-cookie carrying the landing page URL for endpoints with stricter
/// bot-detection rules. Attached per request, never persisted.
pub const LANDING_URL_COOKIE: &str = "landing_url";

// Incapsula site identifiers observed on www.set.or.th.
const INCAP_SITE_ID_PRIMARY: u32 = 2_046_605;
const INCAP_SITE_ID_SECONDARY: u32 = 2_771_851;

// Cookie-consent acceptance date replayed in SET_COOKIE_POLICY.
const COOKIE_POLICY_DATE: &str = "20231111093657";

/// Parse cookies from `Set-Cookie` response headers.
///
/// Attributes (`Path`, `Expires`, ...) are discarded; only the leading
/// `name=value` pair of each header is kept. Later headers win on name
/// collision.
pub fn parse_set_cookies(headers: &HeaderMap) -> FxHashMap<String, String> {
    let mut cookies = FxHashMap::default();

    for value in headers.get_all(header::SET_COOKIE) {
        if let Ok(cookie_str) = value.to_str() {
            // Parse "name=value; Path=...; ..."
            if let Some(kv) = cookie_str.split(';').next() {
                let parts: Vec<&str> = kv.splitn(2, '=').collect();
                if parts.len() == 2 && !parts[0].trim().is_empty() {
                    cookies.insert(parts[0].trim().to_string(), parts[1].to_string());
                }
            }
        }
    }

    cookies
}

/// Extract a specific cookie value from a cookie payload string.
///
/// # Example
/// ```
/// use setgate::cookie::extract_cookie_value;
///
/// let payload = "charlot=abc123; visit_time=42";
/// assert_eq!(extract_cookie_value(payload, "charlot"), Some("abc123".to_string()));
/// assert_eq!(extract_cookie_value(payload, "incap_ses"), None);
/// ```
pub fn extract_cookie_value(payload: &str, name: &str) -> Option<String> {
    for cookie in payload.split(';') {
        let parts: Vec<&str> = cookie.trim().splitn(2, '=').collect();
        if parts.len() == 2 && parts[0] == name {
            return Some(parts[1].to_string());
        }
    }
    None
}

/// Assemble a cookie payload from an ordered base set and harvested cookies.
///
/// Base pairs keep their order; a harvested cookie with the same name
/// replaces the base value in place. Harvested cookies without a base
/// counterpart are appended. Harvested values always win: real upstream
/// cookies must never be shadowed by synthetic ones.
pub fn assemble_payload(
    base: &[(String, String)],
    harvested: &FxHashMap<String, String>,
) -> String {
    let mut remaining = harvested.clone();
    let mut parts: Vec<String> = Vec::with_capacity(base.len() + remaining.len());

    for (name, value) in base {
        let value = remaining.remove(name).unwrap_or_else(|| value.clone());
        parts.push(format!("{name}={value}"));
    }
    for (name, value) in remaining {
        parts.push(format!("{name}={value}"));
    }

    parts.join("; ")
}

/// Insert or replace a single cookie in an existing payload string.
pub fn append_cookie(payload: &str, name: &str, value: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut replaced = false;

    for cookie in payload.split(';') {
        let trimmed = cookie.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.split_once('=') {
            Some((existing, _)) if existing == name => {
                parts.push(format!("{name}={value}"));
                replaced = true;
            }
            _ => parts.push(trimmed.to_string()),
        }
    }
    if !replaced {
        parts.push(format!("{name}={value}"));
    }

    parts.join("; ")
}

/// Synthesize browser-footprint decoy cookies.
///
/// Mirrors what a real browser session on www.set.or.th accumulates:
/// analytics and consent cookies first (they signal an organic visit), then
/// the Incapsula visitor/session identifiers, then session-activity
/// counters. Values are randomized per call; the pair order is part of the
/// fingerprint and is preserved all the way into the payload string.
pub fn decoy_cookie_pairs() -> Vec<(String, String)> {
    let mut rng = rand::rng();
    let now_ms = Utc::now().timestamp_millis();
    let now_s = Utc::now().timestamp();

    let ga_cookie = format!(
        "GA1.1.{}.{}",
        rng.random_range(1_000_000_000i64..=9_999_999_999),
        now_s - rng.random_range(3_600i64..86_400)
    );
    let fbp_cookie = format!(
        "fb.2.{}.{}",
        now_ms - rng.random_range(3_600_000i64..86_400_000),
        rng.random_range(100_000_000_000_000_000i64..=999_999_999_999_999_999)
    );
    let gcl_cookie = format!(
        "1.1.{}.{}",
        rng.random_range(1_000_000_000i64..=9_999_999_999),
        now_s - rng.random_range(3_600i64..86_400)
    );
    let uid_cookie = format!(
        "{:08X}.{:02X}",
        rng.random_range(0u32..=u32::MAX),
        rng.random_range(0u8..=u8::MAX)
    );
    let lt_sid = format!(
        "{}-{:08x}",
        &Uuid::new_v4().to_string()[..23],
        rng.random_range(0u32..=u32::MAX)
    );

    // GA4 session cookie; $g1$ marks an engaged session, which some
    // protected endpoints check for.
    let ga4_session_time = now_s - rng.random_range(60i64..3_600);
    let ga4_seq = rng.random_range(60u32..100);
    let ga4_cookie =
        format!("GS2.1.s{ga4_session_time}$o{ga4_seq}$g1$t{ga4_session_time}$j{ga4_seq}$l0$h0");

    let hj_session = serde_json::json!({
        "id": Uuid::new_v4().to_string(),
        "c": now_ms,
        "s": 0,
        "r": 0,
        "sb": 0,
        "sr": 0,
        "se": 0,
        "fs": 0,
        "sp": 0,
    });
    let hj_session_cookie = STANDARD.encode(hj_session.to_string());

    let visit_time = rng.random_range(10u32..=300);
    let api_counter = rng.random_range(1u32..=10);

    vec![
        ("__lt__cid".to_string(), Uuid::new_v4().to_string()),
        ("_fbp".to_string(), fbp_cookie),
        ("_ga".to_string(), ga_cookie),
        ("_tt_enable_cookie".to_string(), "1".to_string()),
        ("_gcl_au".to_string(), gcl_cookie),
        (
            "SET_COOKIE_POLICY".to_string(),
            COOKIE_POLICY_DATE.to_string(),
        ),
        ("_cbclose".to_string(), "1".to_string()),
        ("_cbclose23453".to_string(), "1".to_string()),
        ("_uid23453".to_string(), uid_cookie),
        ("_ctout23453".to_string(), "1".to_string()),
        ("__lt__sid".to_string(), lt_sid),
        ("_hjSession_3931504".to_string(), hj_session_cookie),
        ("charlot".to_string(), Uuid::new_v4().to_string()),
        (
            format!("nlbi_{INCAP_SITE_ID_PRIMARY}"),
            random_token(32, 40),
        ),
        (
            format!("visid_incap_{INCAP_SITE_ID_PRIMARY}"),
            random_token(48, 64),
        ),
        (
            format!("incap_ses_357_{INCAP_SITE_ID_PRIMARY}"),
            random_token(32, 48),
        ),
        (
            format!("visid_incap_{INCAP_SITE_ID_SECONDARY}"),
            random_token(48, 64),
        ),
        (
            format!("incap_ses_357_{INCAP_SITE_ID_SECONDARY}"),
            random_token(32, 48),
        ),
        ("visit_time".to_string(), visit_time.to_string()),
        ("_ga_6WS2P0P25V".to_string(), ga4_cookie.clone()),
        ("_ga_ET2H60H2CB".to_string(), ga4_cookie),
        ("api_call_counter".to_string(), api_counter.to_string()),
    ]
}

/// Random bytes base64-encoded and truncated, matching the shape of
/// Incapsula visitor/session tokens.
fn random_token(n_bytes: usize, keep: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..n_bytes)
        .map(|_| rng.random_range(0u8..=u8::MAX))
        .collect();
    let mut encoded = STANDARD.encode(&bytes);
    encoded.truncate(keep);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers_with_set_cookies(values: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for v in values {
            headers.append(header::SET_COOKIE, HeaderValue::from_str(v).unwrap());
        }
        headers
    }

    #[test]
    fn parse_set_cookies_strips_attributes() {
        let headers = headers_with_set_cookies(&[
            "incap_ses_357_2046605=abc123; Path=/; Secure",
            "visid_incap_2046605=xyz; expires=Sat, 01 Jan 2028 00:00:00 GMT; HttpOnly",
        ]);
        let cookies = parse_set_cookies(&headers);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["incap_ses_357_2046605"], "abc123");
        assert_eq!(cookies["visid_incap_2046605"], "xyz");
    }

    #[test]
    fn parse_set_cookies_last_value_wins() {
        let headers = headers_with_set_cookies(&["sid=first; Path=/", "sid=second; Path=/"]);
        let cookies = parse_set_cookies(&headers);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies["sid"], "second");
    }

    #[test]
    fn parse_set_cookies_ignores_malformed_entries() {
        let headers = headers_with_set_cookies(&["bare-token", "=orphan; Path=/", "ok=1"]);
        let cookies = parse_set_cookies(&headers);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies["ok"], "1");
    }

    #[test]
    fn assemble_payload_keeps_base_order_and_lets_harvested_win() {
        let base = vec![
            ("charlot".to_string(), "synthetic".to_string()),
            ("visit_time".to_string(), "42".to_string()),
        ];
        let mut harvested = FxHashMap::default();
        harvested.insert("charlot".to_string(), "real".to_string());
        harvested.insert("incap_ses_357_2046605".to_string(), "srv".to_string());

        let payload = assemble_payload(&base, &harvested);
        assert!(payload.starts_with("charlot=real; visit_time=42"));
        assert!(payload.contains("incap_ses_357_2046605=srv"));
    }

    #[test]
    fn append_cookie_inserts_and_replaces() {
        let payload = "a=1; b=2";
        let appended = append_cookie(payload, LANDING_URL_COOKIE, "https://example.com/page");
        assert_eq!(appended, "a=1; b=2; landing_url=https://example.com/page");

        let replaced = append_cookie(&appended, LANDING_URL_COOKIE, "https://example.com/other");
        assert_eq!(
            extract_cookie_value(&replaced, LANDING_URL_COOKIE),
            Some("https://example.com/other".to_string())
        );
        assert_eq!(replaced.matches(LANDING_URL_COOKIE).count(), 1);
    }

    #[test]
    fn decoy_pairs_cover_the_incapsula_footprint() {
        let pairs = decoy_cookie_pairs();
        let names: Vec<&str> = pairs.iter().map(|(n, _)| n.as_str()).collect();

        for expected in [
            "charlot",
            "nlbi_2046605",
            "visid_incap_2046605",
            "incap_ses_357_2046605",
            "visid_incap_2771851",
            "incap_ses_357_2771851",
            "visit_time",
            "api_call_counter",
            "_ga",
            "_fbp",
        ] {
            assert!(names.contains(&expected), "missing decoy {expected}");
        }
        // Analytics cookies lead, activity counters trail.
        assert_eq!(names.first(), Some(&"__lt__cid"));
        assert_eq!(names.last(), Some(&"api_call_counter"));
        assert!(pairs.iter().all(|(_, v)| !v.is_empty()));
    }

    #[test]
    fn decoy_values_are_randomized_per_call() {
        let a = decoy_cookie_pairs();
        let b = decoy_cookie_pairs();
        let charlot_a = a.iter().find(|(n, _)| n == "charlot").unwrap();
        let charlot_b = b.iter().find(|(n, _)| n == "charlot").unwrap();
        assert_ne!(charlot_a.1, charlot_b.1);
    }

    #[test]
    fn visit_time_stays_in_plausible_range() {
        for _ in 0..16 {
            let pairs = decoy_cookie_pairs();
            let visit: u32 = pairs
                .iter()
                .find(|(n, _)| n == "visit_time")
                .unwrap()
                .1
                .parse()
                .unwrap();
            assert!((10..=300).contains(&visit));
        }
    }
}
