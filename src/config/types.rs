// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Seconds to wait for in-flight connections on shutdown
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_period: u64,
}

#[allow(clippy::missing_const_for_fn)]
fn default_shutdown_grace() -> u64 {
    10
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    pub show_headers: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

fn default_access_log_format() -> String {
    "combined".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub max_connections: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// Outbound proxy behaviour and target restrictions.
///
/// The defaults describe an open proxy: any `http(s)` target is accepted.
#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfig {
    /// Hosts the proxy may reach. Empty means any host.
    /// An entry starting with `.` also matches every subdomain.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    /// Reject loopback, private and link-local IP literals and `localhost`
    #[serde(default)]
    pub block_private_addresses: bool,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Upstream request timeout in seconds, 0 disables it
    #[serde(default)]
    pub timeout_secs: u64,
    /// Largest upstream response body the proxy will buffer
    #[serde(default = "default_max_response_size")]
    pub max_response_size: u64,
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_redirects() -> usize {
    10
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_response_size() -> u64 {
    104_857_600 // 100MB
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: Vec::new(),
            block_private_addresses: false,
            max_redirects: default_max_redirects(),
            timeout_secs: 0,
            max_response_size: default_max_response_size(),
        }
    }
}

/// Headless rendering configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    /// Request path that selects the render branch
    #[serde(default = "default_render_path")]
    pub path: String,
    /// DevTools endpoint: `ws://` debugger URL or `http://host:port` base
    #[serde(default = "default_browser_endpoint")]
    pub browser_endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
    /// Quiet period with no request in flight before the page counts as loaded
    #[serde(default = "default_network_idle_ms")]
    pub network_idle_ms: u64,
    /// Value of the `X-Rendered-By` response header
    #[serde(default = "default_rendered_by")]
    pub rendered_by: String,
}

fn default_render_path() -> String {
    "/render".to_string()
}

fn default_browser_endpoint() -> String {
    "http://127.0.0.1:9222".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_viewport_width() -> u32 {
    1920
}

#[allow(clippy::missing_const_for_fn)]
fn default_viewport_height() -> u32 {
    1080
}

#[allow(clippy::missing_const_for_fn)]
fn default_navigation_timeout_ms() -> u64 {
    15_000
}

#[allow(clippy::missing_const_for_fn)]
fn default_network_idle_ms() -> u64 {
    500
}

fn default_rendered_by() -> String {
    "Cloudflare-Browser".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            path: default_render_path(),
            browser_endpoint: default_browser_endpoint(),
            user_agent: default_user_agent(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            network_idle_ms: default_network_idle_ms(),
            rendered_by: default_rendered_by(),
        }
    }
}
