//! Request handler module
//!
//! Responsible for request dispatch: target extraction and policy, then the
//! render branch or the transparent proxy branch.

pub mod proxy;
pub mod render;
pub mod router;
pub mod target;

#[cfg(test)]
mod test_support;

// Re-export main entry point
pub use router::{handle_request, Dispatched};
