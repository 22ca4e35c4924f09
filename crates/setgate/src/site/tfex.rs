//! The Thailand Futures Exchange (www.tfex.co.th).

use super::SiteWarmup;

pub const TFEX_BASE_URL: &str = "https://www.tfex.co.th";
pub const TFEX_LANDING_URL: &str = "https://www.tfex.co.th/en/home";

/// TFEX shares SET's infrastructure and bot filter but hands out its own
/// session cookies, so it warms up independently.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfexSite;

impl SiteWarmup for TfexSite {
    fn key(&self) -> &'static str {
        "tfex"
    }

    fn landing_url(&self) -> String {
        TFEX_LANDING_URL.to_string()
    }
}
