//! Target URL extraction and policy
//!
//! The target comes from the `url` query parameter, or `__url` when `url`
//! is absent or empty. The query parser form-decodes the value and it is
//! then percent-decoded once more, so a doubly-encoded target resolves to
//! the same URL as a singly-encoded one. A `%` not followed by two hex
//! digits is not an escape and passes through verbatim.

use percent_encoding::percent_decode_str;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{form_urlencoded, Host, Url};

use crate::config::ProxyConfig;

const TARGET_PARAMS: [&str; 2] = ["url", "__url"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("no url or __url query parameter")]
    Missing,
    #[error("target is not an http(s) URL")]
    Invalid,
    #[error("target host is not allowed: {0}")]
    Forbidden(String),
}

/// Extract and decode the target URL from a raw query string
pub fn extract_target(query: Option<&str>) -> Result<String, TargetError> {
    let raw = query
        .and_then(|q| {
            TARGET_PARAMS.iter().find_map(|name| {
                form_urlencoded::parse(q.as_bytes())
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.into_owned())
                    .filter(|value| !value.is_empty())
            })
        })
        .ok_or(TargetError::Missing)?;

    let decoded = percent_decode_str(&raw)
        .decode_utf8()
        .map_err(|_| TargetError::Invalid)?;

    if decoded.starts_with("http://") || decoded.starts_with("https://") {
        Ok(decoded.into_owned())
    } else {
        Err(TargetError::Invalid)
    }
}

/// Optional restrictions on which hosts may be reached.
///
/// With the default configuration every target passes.
#[derive(Debug, Clone, Default)]
pub struct TargetPolicy {
    allowed_hosts: Vec<String>,
    block_private_addresses: bool,
}

impl TargetPolicy {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            allowed_hosts: config
                .allowed_hosts
                .iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            block_private_addresses: config.block_private_addresses,
        }
    }

    pub fn is_open(&self) -> bool {
        self.allowed_hosts.is_empty() && !self.block_private_addresses
    }

    pub fn check(&self, target: &str) -> Result<(), TargetError> {
        if self.is_open() {
            return Ok(());
        }

        let url = Url::parse(target).map_err(|_| TargetError::Invalid)?;
        let host = url.host().ok_or(TargetError::Invalid)?;
        let host_name = host.to_string().to_ascii_lowercase();

        if self.block_private_addresses && is_private_host(&host) {
            return Err(TargetError::Forbidden(host_name));
        }

        if !self.allowed_hosts.is_empty() && !self.host_allowed(&host_name) {
            return Err(TargetError::Forbidden(host_name));
        }

        Ok(())
    }

    fn host_allowed(&self, host: &str) -> bool {
        self.allowed_hosts.iter().any(|entry| {
            entry.strip_prefix('.').map_or_else(
                || host == entry,
                |suffix| host == suffix || host.ends_with(entry.as_str()),
            )
        })
    }
}

fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            name == "localhost" || name.ends_with(".localhost")
        }
        Host::Ipv4(ip) => is_private_v4(*ip),
        Host::Ipv6(ip) => is_private_v6(ip),
    }
}

const fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 100.64.0.0/10 carrier-grade NAT
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xc0) == 64)
}

fn is_private_v6(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00 // fc00::/7 unique local
        || (first & 0xffc0) == 0xfe80 // fe80::/10 link local
}
