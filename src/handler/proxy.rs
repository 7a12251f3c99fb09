//! Transparent proxy branch
//!
//! Forwards the request to the target with `Origin` removed and returns the
//! upstream answer (status, reason phrase, headers, body) with the CORS
//! headers overwritten. Fetch errors are not handled here; they propagate to
//! the connection layer.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::{Method, Response, StatusCode};

use crate::http;
use crate::http::headers::{inbound_response_headers, outbound_request_headers};
use crate::upstream::{ProxyError, Upstream, UpstreamRequest};

/// Forward one request to `target`
pub async fn forward(
    upstream: &dyn Upstream,
    method: Method,
    headers: &HeaderMap,
    body: Bytes,
    target: &str,
) -> Result<Response<Full<Bytes>>, ProxyError> {
    let is_head = method == Method::HEAD;
    let request = UpstreamRequest {
        method,
        url: target.to_string(),
        headers: outbound_request_headers(headers),
        body,
    };

    let response = upstream.fetch(request).await?;

    // Empty by protocol: the upstream length describes the resource, not this body
    let keep_content_length =
        response.body.is_empty() && (is_head || response.status == StatusCode::NOT_MODIFIED);

    Ok(http::build_passthrough_response(
        response.status,
        response.reason,
        inbound_response_headers(&response.headers, keep_content_length),
        response.body,
    ))
}
