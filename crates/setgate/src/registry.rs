//! Site registry: one gate per registered site, shared store and transport.
//!
//! Explicit object instead of process-global state so an application can run
//! several isolated registries (different cache directories, profiles) side
//! by side, and tests get full isolation for free.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::gate::{RequestOptions, SiteGate};
use crate::response::GateResponse;
use crate::site::{SetSite, SiteWarmup, TfexSite};
use crate::store::{SessionRecord, SessionStore};
use crate::transport::HttpTransport;

/// Owns the gates for every known site plus the store and transport they
/// share. Clone-free: hand out `Arc<SessionRegistry>` or borrow it.
pub struct SessionRegistry {
    gates: RwLock<HashMap<String, Arc<SiteGate>>>,
    store: Arc<SessionStore>,
    transport: Arc<HttpTransport>,
    config: Arc<SessionConfig>,
}

impl SessionRegistry {
    /// Build an empty registry from a validated configuration.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let store = Arc::new(SessionStore::new(config.store_dir.clone())?);
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self {
            gates: RwLock::new(HashMap::new()),
            store,
            transport,
            config: Arc::new(config),
        })
    }

    /// Registry with the two exchanges this crate ships support for.
    pub fn with_builtin_sites(config: SessionConfig) -> Result<Self, SessionError> {
        let registry = Self::new(config)?;
        registry.register(Arc::new(SetSite));
        registry.register(Arc::new(TfexSite));
        Ok(registry)
    }

    /// Add a site, replacing any previous registration under the same key.
    pub fn register(&self, site: Arc<dyn SiteWarmup>) -> Arc<SiteGate> {
        let key = site.key().to_string();
        let gate = Arc::new(SiteGate::new(
            site,
            Arc::clone(&self.store),
            Arc::clone(&self.transport),
            Arc::clone(&self.config),
        ));
        let previous = self.gates.write().insert(key.clone(), Arc::clone(&gate));
        if previous.is_some() {
            debug!(site = key, "replaced existing site registration");
        }
        gate
    }

    pub fn gate(&self, site: &str) -> Result<Arc<SiteGate>, SessionError> {
        self.gates
            .read()
            .get(site)
            .cloned()
            .ok_or_else(|| SessionError::unknown_site(site))
    }

    /// GET `url` through the named site's gate.
    pub async fn request(
        &self,
        site: &str,
        url: &str,
        options: &RequestOptions,
    ) -> Result<GateResponse, SessionError> {
        let gate = self.gate(site)?;
        gate.request(url, options).await
    }

    /// Ensure the named site has a live session; `force` drops any cached one.
    pub async fn warm(&self, site: &str, force: bool) -> Result<SessionRecord, SessionError> {
        let gate = self.gate(site)?;
        gate.warm(force).await
    }

    /// Drop the named site's cached session.
    pub async fn invalidate(&self, site: &str) -> Result<bool, SessionError> {
        let gate = self.gate(site)?;
        Ok(gate.invalidate().await)
    }

    /// Registered site keys, sorted.
    pub fn sites(&self) -> Vec<String> {
        let mut sites: Vec<String> = self.gates.read().keys().cloned().collect();
        sites.sort();
        sites
    }

    pub fn store(&self) -> Arc<SessionStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
