//! Request dispatch module
//!
//! Entry point for HTTP request processing: target validation, then either
//! the render branch or the transparent proxy branch.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_LENGTH;
use hyper::{Method, Request, Response, StatusCode};

use super::target::{extract_target, TargetError};
use super::{proxy, render};
use crate::config::AppState;
use crate::http;
use crate::logger::{self, ProxyMode};
use crate::upstream::ProxyError;

/// What the dispatcher did with one request
pub struct Dispatched {
    pub mode: ProxyMode,
    pub target: Option<String>,
    /// `Err` only when the upstream fetch itself failed
    pub result: Result<Response<Full<Bytes>>, ProxyError>,
}

impl Dispatched {
    fn reject(response: Response<Full<Bytes>>) -> Self {
        Self {
            mode: ProxyMode::Reject,
            target: None,
            result: Ok(response),
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(req: Request<B>, state: &AppState) -> Dispatched
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    // 1. Validate target
    let target = match extract_target(req.uri().query()) {
        Ok(target) => target,
        Err(TargetError::Missing) => {
            return Dispatched::reject(http::build_400_response(http::MISSING_TARGET_MESSAGE))
        }
        Err(_) => {
            return Dispatched::reject(http::build_400_response(http::INVALID_TARGET_MESSAGE))
        }
    };

    // 2. Optional target policy
    if let Err(e) = state.target_policy.check(&target) {
        logger::log_warning(&format!("[Policy] {e}"));
        return Dispatched::reject(http::build_403_response());
    }

    // 3. Render branch
    if req.uri().path() == state.config.render.path {
        let response =
            render::render_target(&target, state.launcher.as_ref(), &state.config.render).await;
        return Dispatched {
            mode: ProxyMode::Render,
            target: Some(target),
            result: Ok(response),
        };
    }

    // 4. Preflight is answered locally
    if req.method() == Method::OPTIONS {
        return Dispatched {
            mode: ProxyMode::Preflight,
            target: Some(target),
            result: Ok(http::build_preflight_response()),
        };
    }

    // 5. Transparent proxy
    let max_body_size = state.config.http.max_body_size;
    if let Some(resp) = check_content_length(&req, max_body_size) {
        return Dispatched::reject(resp);
    }

    let (parts, body) = req.into_parts();
    let body = match read_body(body, max_body_size).await {
        Ok(body) => body,
        Err(resp) => return Dispatched::reject(resp),
    };

    let result = proxy::forward(
        state.upstream.as_ref(),
        parts.method,
        &parts.headers,
        body,
        &target,
    )
    .await;

    Dispatched {
        mode: ProxyMode::Proxy,
        target: Some(target),
        result,
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_content_length<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get(CONTENT_LENGTH)?;
    match content_length.to_str().ok()?.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        _ => None,
    }
}

/// Buffer the request body, enforcing the size limit while streaming
async fn read_body<B>(body: B, max_body_size: u64) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!("Request body exceeded {max_body_size} bytes"));
            Err(http::build_413_response())
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Err(http::response::build_text_response(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
            ))
        }
    }
}
