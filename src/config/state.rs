// Application state module
// Holds the immutable configuration plus the outbound capabilities shared by all requests

use std::sync::Arc;

use super::types::Config;
use crate::browser::{BrowserLauncher, ChromiumLauncher};
use crate::handler::target::TargetPolicy;
use crate::upstream::{HttpUpstream, Upstream};

/// Application state
pub struct AppState {
    pub config: Config,
    pub upstream: Arc<dyn Upstream>,
    pub launcher: Arc<dyn BrowserLauncher>,
    pub target_policy: TargetPolicy,
}

impl AppState {
    /// Build state with the real `reqwest` upstream and `chromiumoxide` launcher
    pub fn new(config: &Config) -> Result<Self, crate::upstream::ProxyError> {
        let upstream = HttpUpstream::new(&config.proxy)?;
        let launcher = ChromiumLauncher::new(config.render.browser_endpoint.clone());
        Ok(Self::with_capabilities(
            config,
            Arc::new(upstream),
            Arc::new(launcher),
        ))
    }

    /// Build state around caller-provided capabilities
    pub fn with_capabilities(
        config: &Config,
        upstream: Arc<dyn Upstream>,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Self {
        Self {
            config: config.clone(),
            upstream,
            launcher,
            target_policy: TargetPolicy::from_config(&config.proxy),
        }
    }
}
