// In-memory upstream and browser used by handler tests

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use std::sync::{Arc, Mutex};

use crate::browser::{
    BrowserLauncher, BrowserPage, BrowserSession, NavigationOptions, RenderError, Viewport,
};
use crate::upstream::{ProxyError, Upstream, UpstreamRequest, UpstreamResponse};

pub async fn body_string(response: Response<Full<Bytes>>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("infallible body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Upstream that records every request and answers with a canned response
pub struct FakeUpstream {
    response: Option<UpstreamResponse>,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl FakeUpstream {
    pub const fn answering(response: UpstreamResponse) -> Self {
        Self {
            response: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every fetch fails as if the target were unreachable
    pub const fn unreachable() -> Self {
        Self {
            response: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn fetch(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ProxyError> {
        self.requests.lock().expect("lock").push(request);
        match &self.response {
            Some(response) => Ok(response.clone()),
            None => {
                let err = reqwest::Client::new()
                    .get("http://[::1")
                    .build()
                    .expect_err("malformed URL");
                Err(ProxyError::Request(err))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Launch,
    NewPage,
    Goto,
    Content,
    Close,
}

type CallLog = Arc<Mutex<Vec<String>>>;

/// Browser whose every step is appended to a shared call log
pub struct FakeLauncher {
    html: String,
    fail_at: Option<FailAt>,
    calls: CallLog,
}

impl FakeLauncher {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            fail_at: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_at(mut self, step: FailAt) -> Self {
        self.fail_at = Some(step);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

fn record(calls: &CallLog, call: String) {
    calls.lock().expect("lock").push(call);
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        record(&self.calls, "launch".to_string());
        if self.fail_at == Some(FailAt::Launch) {
            return Err(RenderError::Launch("connection refused".to_string()));
        }
        Ok(Box::new(FakeSession {
            html: self.html.clone(),
            fail_at: self.fail_at,
            calls: Arc::clone(&self.calls),
        }))
    }
}

struct FakeSession {
    html: String,
    fail_at: Option<FailAt>,
    calls: CallLog,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, RenderError> {
        record(&self.calls, "new_page".to_string());
        if self.fail_at == Some(FailAt::NewPage) {
            return Err(RenderError::Page("target crashed".to_string()));
        }
        Ok(Box::new(FakePage {
            html: self.html.clone(),
            fail_at: self.fail_at,
            calls: Arc::clone(&self.calls),
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        record(&self.calls, "close".to_string());
        if self.fail_at == Some(FailAt::Close) {
            return Err(RenderError::Close("socket closed".to_string()));
        }
        Ok(())
    }
}

struct FakePage {
    html: String,
    fail_at: Option<FailAt>,
    calls: CallLog,
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError> {
        record(&self.calls, format!("user_agent:{user_agent}"));
        Ok(())
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        record(
            &self.calls,
            format!("viewport:{}x{}", viewport.width, viewport.height),
        );
        Ok(())
    }

    async fn goto(&mut self, url: &str, options: NavigationOptions) -> Result<(), RenderError> {
        record(
            &self.calls,
            format!(
                "goto:{url} timeout={}ms idle={}ms",
                options.timeout.as_millis(),
                options.idle_window.as_millis()
            ),
        );
        if self.fail_at == Some(FailAt::Goto) {
            return Err(RenderError::Timeout(options.timeout.as_millis()));
        }
        Ok(())
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        record(&self.calls, "content".to_string());
        if self.fail_at == Some(FailAt::Content) {
            return Err(RenderError::Content("execution context destroyed".to_string()));
        }
        Ok(self.html.clone())
    }
}
