//! Render branch
//!
//! Drives one browser session per request: launch, new page, user agent,
//! viewport, navigation, serialization. The session is closed on every path
//! once it has been acquired.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::time::Duration;

use crate::browser::{BrowserLauncher, BrowserSession, NavigationOptions, RenderError, Viewport};
use crate::config::RenderConfig;
use crate::http;
use crate::logger;

/// Render `target` and wrap the outcome in a response
pub async fn render_target(
    target: &str,
    launcher: &dyn BrowserLauncher,
    config: &RenderConfig,
) -> Response<Full<Bytes>> {
    match render_html(target, launcher, config).await {
        Ok(html) => http::build_rendered_response(html, &config.rendered_by),
        Err(e) => {
            logger::log_render_failure(target, &e);
            http::build_render_failed_response(&e)
        }
    }
}

/// Fully rendered HTML of `target`
pub async fn render_html(
    target: &str,
    launcher: &dyn BrowserLauncher,
    config: &RenderConfig,
) -> Result<String, RenderError> {
    let mut session = launcher.launch().await?;
    let outcome = render_in_session(session.as_mut(), target, config).await;

    if let Err(e) = session.close().await {
        logger::log_warning(&format!("[Render] {target}: {e}"));
    }

    outcome
}

async fn render_in_session(
    session: &mut dyn BrowserSession,
    target: &str,
    config: &RenderConfig,
) -> Result<String, RenderError> {
    let mut page = session.new_page().await?;
    page.set_user_agent(&config.user_agent).await?;
    page.set_viewport(Viewport {
        width: config.viewport_width,
        height: config.viewport_height,
    })
    .await?;
    page.goto(
        target,
        NavigationOptions {
            timeout: Duration::from_millis(config.navigation_timeout_ms),
            idle_window: Duration::from_millis(config.network_idle_ms),
        },
    )
    .await?;
    page.content().await
}
