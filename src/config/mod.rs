// Configuration module entry point
// Manages application configuration and runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, Credentials, UpstreamConfig};

/// Environment variables kept for compatibility with existing deployments
const ENV_USERNAME: &str = "LINKEDIN_USERNAME";
const ENV_PASSWORD: &str = "LINKEDIN_PASSWORD";
const ENV_PORT: &str = "PORT";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let vars: config::Map<String, String> = std::env::vars().collect();
        Self::load_with_env(config_path, &vars)
    }

    /// Load configuration using an explicit set of environment variables.
    ///
    /// Layering, lowest to highest: defaults, config file, `PROXY_*`
    /// variables, then `PORT` / `LINKEDIN_USERNAME` / `LINKEDIN_PASSWORD`.
    pub fn load_with_env(
        config_path: &str,
        vars: &config::Map<String, String>,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("PROXY")
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(vars.clone())),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("http.server_name", "linkedin-proxy/0.1")?
            .set_default("http.max_body_size", 65_536)?
            .set_default("upstream.base_url", "http://127.0.0.1:9000")?
            .set_default("upstream.refresh_cookies", true)?
            .set_override_option("server.port", non_empty_var(vars, ENV_PORT))?
            .set_override_option("credentials.username", non_empty_var(vars, ENV_USERNAME))?
            .set_override_option("credentials.password", non_empty_var(vars, ENV_PASSWORD))?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        cfg.credentials()?;
        Ok(cfg)
    }

    /// Reject values the runtime would otherwise panic on
    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.server.workers == Some(0) {
            return Err(config::ConfigError::Message(
                "server.workers must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Validated credentials; fails if either value is missing or empty
    pub fn credentials(&self) -> Result<Credentials, config::ConfigError> {
        let username = self.credentials.username.as_deref().map(str::trim);
        let password = self.credentials.password.as_deref();

        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok(Credentials {
                username: u.to_string(),
                password: p.to_string(),
            }),
            _ => Err(config::ConfigError::Message(format!(
                "Environment variables {ENV_USERNAME} and {ENV_PASSWORD} must be set"
            ))),
        }
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

fn non_empty_var(vars: &config::Map<String, String>, key: &str) -> Option<String> {
    vars.get(key).filter(|v| !v.trim().is_empty()).cloned()
}
