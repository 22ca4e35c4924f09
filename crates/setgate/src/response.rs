use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::config::SessionConfig;
use crate::error::SessionError;

/// An owned snapshot of an upstream HTTP response.
///
/// Bodies are fully read before this type is produced, so a blocked or
/// failed response can be inspected repeatedly without touching the
/// connection again. `headers` carries the `Set-Cookie` entries of every
/// redirect hop, not just the final response.
#[derive(Debug, Clone)]
pub struct GateResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// URL the response was ultimately served from, after redirects.
    pub final_url: String,
    pub elapsed: Duration,
}

impl GateResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether this response carries one of the configured bot-block
    /// statuses. Blocks are data, not errors; callers decide what a
    /// persistent block means for them.
    pub fn blocked(&self, config: &SessionConfig) -> bool {
        config.is_block_status(self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SessionError> {
        serde_json::from_slice(&self.body).map_err(|e| SessionError::Decode {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(status: u16, body: &str) -> GateResponse {
        GateResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::copy_from_slice(body.as_bytes()),
            final_url: "https://www.set.or.th/api/set/stock/list".to_string(),
            elapsed: Duration::from_millis(12),
        }
    }

    #[test]
    fn json_decodes_into_typed_values() {
        #[derive(serde::Deserialize)]
        struct Listing {
            symbol: String,
        }
        let response = response_with(200, r#"{"symbol":"CPN"}"#);
        let listing: Listing = response.json().unwrap();
        assert_eq!(listing.symbol, "CPN");
        assert!(response.is_success());
    }

    #[test]
    fn json_decode_failure_is_reported_not_panicked() {
        let response = response_with(200, "<html>not json</html>");
        let result: Result<serde_json::Value, _> = response.json();
        assert!(matches!(result, Err(SessionError::Decode { .. })));
    }

    #[test]
    fn blocked_consults_the_configured_statuses() {
        let config = SessionConfig::default();
        assert!(response_with(403, "").blocked(&config));
        assert!(response_with(452, "").blocked(&config));
        assert!(!response_with(200, "").blocked(&config));
        assert!(!response_with(500, "").blocked(&config));
    }
}
