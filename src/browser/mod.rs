//! Headless browser automation capability
//!
//! The render branch drives a remote browser through three small traits:
//! a launcher producing sessions, sessions producing pages, and pages that
//! can be configured, navigated and serialized. [`ChromiumLauncher`] binds
//! them to a remote Chrome over the DevTools protocol.

mod chromium;
mod idle;

pub use chromium::ChromiumLauncher;

use async_trait::async_trait;
use std::time::Duration;

/// Failure anywhere in the render sequence.
///
/// The `Display` text is what the caller sees after `Render failed: `.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),
    #[error("Failed to open page: {0}")]
    Page(String),
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("Navigation timed out after {0}ms")]
    Timeout(u128),
    #[error("Failed to read page content: {0}")]
    Content(String),
    #[error("Failed to close browser: {0}")]
    Close(String),
}

/// Fixed page size applied before navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// How long `goto` may take before it fails, and what counts as network idle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationOptions {
    /// Bound on navigation plus the idle wait
    pub timeout: Duration,
    /// Quiet period with no request in flight
    pub idle_window: Duration,
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Acquire a fresh browser session
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError>;
}

#[async_trait]
pub trait BrowserSession: Send {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, RenderError>;

    /// Tear the session down. Called exactly once per acquired session.
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}

#[async_trait]
pub trait BrowserPage: Send {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError>;
    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError>;
    /// Navigate and wait until the network is idle
    async fn goto(&mut self, url: &str, options: NavigationOptions) -> Result<(), RenderError>;
    /// Serialized document HTML
    async fn content(&mut self) -> Result<String, RenderError>;
}
