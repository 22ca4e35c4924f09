//! The Stock Exchange of Thailand (www.set.or.th).

use super::SiteWarmup;

pub const SET_BASE_URL: &str = "https://www.set.or.th";
pub const SET_LANDING_URL: &str = "https://www.set.or.th/en/home";

/// SET's public site. The landing page sits behind Incapsula and issues the
/// `visid_incap_*` / `incap_ses_*` cookies the JSON API checks for.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetSite;

impl SiteWarmup for SetSite {
    fn key(&self) -> &'static str {
        "set"
    }

    fn landing_url(&self) -> String {
        SET_LANDING_URL.to_string()
    }
}
