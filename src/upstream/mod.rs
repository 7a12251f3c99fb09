//! Outbound fetch capability
//!
//! The dispatcher only sees the [`Upstream`] trait; the server wires in
//! [`HttpUpstream`], a shared `reqwest` client.

mod client;

pub use client::HttpUpstream;

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::ext::ReasonPhrase;
use hyper::header::HeaderMap;
use hyper::{Method, StatusCode};

/// Upstream fetch failure
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("failed to read upstream body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("upstream body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

/// Request sent to the target URL
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Fully buffered upstream answer
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Reason phrase, present only when it differs from the canonical one
    pub reason: Option<ReasonPhrase>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ProxyError>;
}
