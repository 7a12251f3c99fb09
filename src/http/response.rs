//! HTTP response building module
//!
//! Builders for every response the dispatcher produces. All of them carry
//! the fixed CORS headers.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::ext::ReasonPhrase;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};

use super::cors::apply_cors_headers;
use super::headers::X_RENDERED_BY;

pub const MISSING_TARGET_MESSAGE: &str = "Add ?url= or ?__url= with the target";
pub const INVALID_TARGET_MESSAGE: &str = "Invalid URL";
pub const FORBIDDEN_TARGET_MESSAGE: &str = "Target not allowed";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Plain-text response with CORS headers
pub fn build_text_response(status: StatusCode, message: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(message.into()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    apply_cors_headers(headers);
    response
}

/// 400 Bad Request with the given message
pub fn build_400_response(message: &'static str) -> Response<Full<Bytes>> {
    build_text_response(StatusCode::BAD_REQUEST, message)
}

/// 403 Forbidden for targets rejected by the target policy
pub fn build_403_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::FORBIDDEN, FORBIDDEN_TARGET_MESSAGE)
}

/// 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
}

/// 500 response for a failed render, `Render failed: <message>`
pub fn build_render_failed_response(error: &impl std::fmt::Display) -> Response<Full<Bytes>> {
    build_text_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Render failed: {error}"),
    )
}

/// 502 response used when the upstream could not be reached
pub fn build_502_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::BAD_GATEWAY, "502 Bad Gateway")
}

/// 204 preflight answer carrying only the CORS headers
pub fn build_preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    apply_cors_headers(response.headers_mut());
    response
}

/// 200 response wrapping rendered HTML
pub fn build_rendered_response(html: String, rendered_by: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(html)));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
    match HeaderValue::from_str(rendered_by) {
        Ok(value) => {
            headers.insert(X_RENDERED_BY, value);
        }
        Err(e) => log_build_error("X-Rendered-By", &e),
    }
    apply_cors_headers(headers);
    response
}

/// Upstream status line, headers and body with the CORS headers overwritten.
///
/// A non-canonical upstream reason phrase is carried as a response extension,
/// which hyper writes in place of the canonical one.
pub fn build_passthrough_response(
    status: StatusCode,
    reason: Option<ReasonPhrase>,
    mut headers: HeaderMap,
    body: Bytes,
) -> Response<Full<Bytes>> {
    apply_cors_headers(&mut headers);
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    if let Some(reason) = reason {
        response.extensions_mut().insert(reason);
    }
    response
}

/// Log response build error
fn log_build_error(what: &str, error: &impl std::fmt::Display) {
    crate::logger::log_error(&format!("Failed to build {what} header: {error}"));
}
