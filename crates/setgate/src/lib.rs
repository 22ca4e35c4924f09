//! Session warmup and cookie caching for the SET and TFEX web APIs.
//!
//! The public market-data endpoints of the Stock Exchange of Thailand
//! (www.set.or.th) and the Thailand Futures Exchange (www.tfex.co.th) sit
//! behind a bot-detection layer that rejects clients without the cookies a
//! real browser picks up on the homepage. This crate automates that dance:
//! visit the landing page once with a browser-like header profile, harvest
//! the cookies it sets, cache them on disk with a TTL, and attach them to
//! every API request. When the upstream still answers with a block status,
//! the session is refreshed and the request retried exactly once.
//!
//! ## Component Overview
//!
//! - `config`: tunables for TTL, timeouts, retry, block statuses
//! - `profile`: simulated browser identities and their header sets
//! - `cookie`: `Set-Cookie` harvesting and cookie payload assembly
//! - `site`: per-site warmup definitions (SET, TFEX, or your own)
//! - `store`: disk-backed session cache, one JSON file per site/profile
//! - `gate`: the per-site state machine with block recovery
//! - `registry`: gates for all sites behind one entry point
//! - `transport`: reqwest wrapper with manual redirects and bounded retry
//!
//! ## Example
//!
//! ```rust,ignore
//! use setgate::{RequestOptions, SessionConfig, SessionRegistry};
//!
//! let registry = SessionRegistry::with_builtin_sites(SessionConfig::default())?;
//! let response = registry
//!     .request(
//!         "set",
//!         "https://www.set.or.th/api/set/stock/list",
//!         &RequestOptions::new(),
//!     )
//!     .await?;
//! let listing: serde_json::Value = response.json()?;
//! ```

pub mod config;
pub mod cookie;
pub mod error;
pub mod gate;
pub mod profile;
pub mod registry;
pub mod response;
pub mod retry;
pub mod site;
pub mod store;
pub mod transport;

pub use config::SessionConfig;
pub use error::SessionError;
pub use gate::{GatePhase, RequestOptions, SiteGate};
pub use profile::BrowserProfile;
pub use registry::SessionRegistry;
pub use response::GateResponse;
pub use retry::RetryPolicy;
pub use site::{SetSite, SiteWarmup, TfexSite, WarmupContext};
pub use store::{SessionRecord, SessionStore, StoreStats};
