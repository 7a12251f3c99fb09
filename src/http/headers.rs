//! Header hygiene across the proxy hop

use hyper::header::{
    HeaderMap, HeaderName, CONNECTION, CONTENT_LENGTH, HOST, ORIGIN, PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};

pub const X_RENDERED_BY: &str = "x-rendered-by";

/// Connection-scoped headers, never forwarded in either direction
const HOP_BY_HOP: [&str; 2] = ["keep-alive", "proxy-connection"];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    *name == CONNECTION
        || *name == TRANSFER_ENCODING
        || *name == TE
        || *name == TRAILER
        || *name == UPGRADE
        || *name == PROXY_AUTHENTICATE
        || HOP_BY_HOP.contains(&name.as_str())
}

/// Headers sent to the target: inbound headers minus `Origin`, `Host`,
/// `Content-Length` and hop-by-hop headers
pub fn outbound_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if *name == ORIGIN
            || *name == HOST
            || *name == CONTENT_LENGTH
            || *name == PROXY_AUTHORIZATION
            || is_hop_by_hop(name)
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Headers returned to the caller: upstream headers minus hop-by-hop headers.
///
/// `Content-Length` is recomputed from the buffered body unless
/// `keep_content_length` is set, which callers use when the body is empty by
/// protocol (a `HEAD` answer or a `304`) and the upstream length is metadata.
pub fn inbound_response_headers(upstream: &HeaderMap, keep_content_length: bool) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len() + 4);
    for (name, value) in upstream {
        if (*name == CONTENT_LENGTH && !keep_content_length) || is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
