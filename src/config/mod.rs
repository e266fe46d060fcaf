// Configuration module entry point
// Loads the immutable configuration and builds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, LoggingConfig, PerformanceConfig, ServerConfig, StorageConfig};

/// Environment variable that overrides `server.port`
const PORT_ENV: &str = "PORT";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("WEBCAT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("storage.data_dir", "data")?
            .set_default("storage.home_page", "index.html")?
            .set_default("storage.max_body_size", 65_536)?
            .set_default("storage.key_attempts", 8)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("logging.event_log", false)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.shutdown_grace", 10)?
            .set_override_option("server.port", port_override())?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// `PORT` from the environment; an empty value counts as unset
fn port_override() -> Option<String> {
    std::env::var(PORT_ENV).ok().filter(|port| !port.is_empty())
}
