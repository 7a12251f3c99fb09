// chromiumoxide binding for the automation capability
// Connects to an already running (remote) Chrome; never spawns a local browser

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    SetUserAgentOverrideParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

use super::idle::{wait_for_network_idle, InFlight};
use super::{BrowserLauncher, BrowserPage, BrowserSession, NavigationOptions, RenderError, Viewport};
use crate::logger;

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Launches sessions against a DevTools endpoint.
///
/// `endpoint` is either a `ws://`/`wss://` debugger URL, used as is, or an
/// `http(s)://host:port` base whose `/json/version` advertises one.
pub struct ChromiumLauncher {
    endpoint: String,
}

impl ChromiumLauncher {
    pub const fn new(endpoint: String) -> Self {
        Self { endpoint }
    }

    async fn resolve_debugger_url(&self) -> Result<String, RenderError> {
        if self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://") {
            return Ok(self.endpoint.clone());
        }

        let version_url = format!("{}/json/version", self.endpoint.trim_end_matches('/'));
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(DISCOVERY_TIMEOUT)
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        let version: serde_json::Value = client
            .get(&version_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| RenderError::Launch(format!("{version_url}: {e}")))?
            .json()
            .await
            .map_err(|e| RenderError::Launch(format!("{version_url}: {e}")))?;

        let advertised = version["webSocketDebuggerUrl"].as_str().ok_or_else(|| {
            RenderError::Launch(format!("{version_url}: no webSocketDebuggerUrl"))
        })?;
        rebase_debugger_url(advertised, &self.endpoint)
    }
}

/// Chrome advertises its debugger URL with the address it bound to
/// (usually `127.0.0.1`); point it at the host we actually reached.
fn rebase_debugger_url(advertised: &str, endpoint: &str) -> Result<String, RenderError> {
    let mut debugger =
        Url::parse(advertised).map_err(|e| RenderError::Launch(format!("{advertised}: {e}")))?;
    let base = Url::parse(endpoint).map_err(|e| RenderError::Launch(format!("{endpoint}: {e}")))?;

    let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
    let rebased = debugger
        .set_scheme(scheme)
        .and_then(|()| debugger.set_host(base.host_str()).map_err(|_| ()))
        .and_then(|()| debugger.set_port(base.port()));
    rebased.map_err(|()| RenderError::Launch(format!("cannot rebase {advertised} onto {endpoint}")))?;
    Ok(debugger.to_string())
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        let debugger_url = self.resolve_debugger_url().await?;
        let (browser, mut handler) = Browser::connect(debugger_url)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // The CDP connection only makes progress while its handler is polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    logger::log_warning(&format!("[Render] CDP handler error: {e}"));
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
            pages: Vec::new(),
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    pages: Vec<Page>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Page(e.to_string()))?;
        self.pages.push(page.clone());
        Ok(Box::new(ChromiumPage { page }))
    }

    /// Closes the targets this session opened and drops the connection.
    /// The remote browser process itself stays up for other sessions.
    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        let Self {
            browser,
            handler_task,
            pages,
        } = *self;

        let mut first_error = None;
        for page in pages {
            if let Err(e) = page.close().await {
                first_error.get_or_insert(e);
            }
        }
        drop(browser);
        handler_task.abort();

        match first_error {
            Some(e) => Err(RenderError::Close(e.to_string())),
            None => Ok(()),
        }
    }
}

struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    /// Enable network events and count requests in flight until the trackers are aborted
    async fn track_network(
        &self,
        in_flight: &Arc<InFlight>,
    ) -> Result<Vec<JoinHandle<()>>, RenderError> {
        let subscribe = |e: CdpError| RenderError::Navigation(format!("network events: {e}"));

        self.page
            .execute(EnableParams::default())
            .await
            .map_err(subscribe)?;
        let sent = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(subscribe)?;
        let finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(subscribe)?;
        let failed = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(subscribe)?;

        Ok(vec![
            spawn_counter(sent, Arc::clone(in_flight), InFlight::started),
            spawn_counter(finished, Arc::clone(in_flight), InFlight::settled),
            spawn_counter(failed, Arc::clone(in_flight), InFlight::settled),
        ])
    }
}

fn spawn_counter<S>(mut events: S, in_flight: Arc<InFlight>, apply: fn(&InFlight)) -> JoinHandle<()>
where
    S: Stream + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while events.next().await.is_some() {
            apply(&in_flight);
        }
    })
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError> {
        self.page
            .execute(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(|e| RenderError::Page(e.to_string()))?;
        Ok(())
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(viewport.width))
            .height(i64::from(viewport.height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(RenderError::Page)?;
        self.page
            .execute(params)
            .await
            .map_err(|e| RenderError::Page(e.to_string()))?;
        Ok(())
    }

    async fn goto(&mut self, url: &str, options: NavigationOptions) -> Result<(), RenderError> {
        let in_flight = Arc::new(InFlight::default());
        let trackers = self.track_network(&in_flight).await?;

        let page = &self.page;
        let navigation = async {
            page.goto(url)
                .await
                .map_err(|e| RenderError::Navigation(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| RenderError::Navigation(e.to_string()))?;
            wait_for_network_idle(&in_flight, options.idle_window).await;
            Ok(())
        };

        let outcome = tokio::time::timeout(options.timeout, navigation).await;
        for tracker in trackers {
            tracker.abort();
        }

        outcome.unwrap_or(Err(RenderError::Timeout(options.timeout.as_millis())))
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.page
            .content()
            .await
            .map_err(|e| RenderError::Content(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebase_onto_configured_host() {
        let rebased = rebase_debugger_url(
            "ws://127.0.0.1:9222/devtools/browser/abc-123",
            "http://chrome:9223",
        )
        .expect("rebase");
        assert_eq!(rebased, "ws://chrome:9223/devtools/browser/abc-123");
    }

    #[test]
    fn test_rebase_https_uses_wss() {
        let rebased = rebase_debugger_url(
            "ws://localhost:9222/devtools/browser/abc",
            "https://browser.example",
        )
        .expect("rebase");
        assert_eq!(rebased, "wss://browser.example/devtools/browser/abc");
    }

    #[test]
    fn test_rebase_rejects_garbage() {
        assert!(matches!(
            rebase_debugger_url("not a url", "http://chrome:9222"),
            Err(RenderError::Launch(_))
        ));
    }

    #[tokio::test]
    async fn test_ws_endpoint_used_verbatim() {
        let launcher = ChromiumLauncher::new("ws://chrome:9222/devtools/browser/x".into());
        assert_eq!(
            launcher.resolve_debugger_url().await.expect("no discovery needed"),
            "ws://chrome:9222/devtools/browser/x"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_launch_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let launcher = ChromiumLauncher::new(format!("http://{addr}"));
        let err = launcher.launch().await.err().expect("nothing listening");
        assert!(matches!(err, RenderError::Launch(_)));
        assert!(err.to_string().starts_with("Failed to launch browser: "));
    }
}
