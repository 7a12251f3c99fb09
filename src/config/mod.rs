// Configuration module entry point
// Loads layered configuration and builds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{
    Config, HttpConfig, LoggingConfig, PerformanceConfig, ProxyConfig, RenderConfig,
    ServerConfig,
};

/// Environment variable prefix, e.g. `CORSRENDER_SERVER__PORT=9000`
const ENV_PREFIX: &str = "CORSRENDER";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("proxy.allowed_hosts"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8787)?
            .set_default("server.shutdown_grace_period", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 60)?
            .set_default("http.server_name", "corsrender/0.1")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/corsrender").expect("defaults load");
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.http.max_body_size, 10_485_760);
        assert_eq!(cfg.render.path, "/render");
        assert_eq!(cfg.render.navigation_timeout_ms, 15_000);
        assert_eq!(cfg.render.viewport_width, 1920);
        assert_eq!(cfg.render.viewport_height, 1080);
        assert_eq!(cfg.render.rendered_by, "Cloudflare-Browser");
        assert!(cfg.proxy.allowed_hosts.is_empty());
        assert!(!cfg.proxy.block_private_addresses);
        assert_eq!(cfg.proxy.max_redirects, 10);
        assert_eq!(cfg.proxy.max_response_size, 104_857_600);
        assert_eq!(cfg.render.network_idle_ms, 500);
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load_from("does-not-exist/corsrender").expect("defaults load");
        cfg.server.port = 9000;
        assert_eq!(
            cfg.get_socket_addr().expect("valid addr").to_string(),
            "127.0.0.1:9000"
        );

        cfg.server.host = "not a host".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
