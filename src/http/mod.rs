//! HTTP protocol layer module
//!
//! CORS injection, header hygiene and response builders shared by the
//! proxy and render branches.

pub mod cors;
pub mod headers;
pub mod response;

pub use cors::apply_cors_headers;
pub use response::{
    build_400_response, build_403_response, build_413_response, build_502_response,
    build_passthrough_response, build_preflight_response, build_render_failed_response,
    build_rendered_response, INVALID_TARGET_MESSAGE, MISSING_TARGET_MESSAGE,
};
