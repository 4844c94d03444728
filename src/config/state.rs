// Application state module
// Holds the shared upstream client and the loaded configuration

use std::sync::Arc;

use super::types::Config;
use crate::client::ProfileClient;

/// Application state, built once at startup and shared by every connection
pub struct AppState {
    pub config: Config,

    /// Single upstream client reused by all requests
    pub client: Arc<dyn ProfileClient>,
}

impl AppState {
    pub fn new(config: &Config, client: Arc<dyn ProfileClient>) -> Self {
        Self {
            config: config.clone(),
            client,
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::stub::StubClient;

    #[test]
    fn test_access_log_follows_config() {
        let mut config = Config::default();
        assert!(AppState::new(&config, Arc::new(StubClient::default())).access_log_enabled());

        config.logging.access_log = false;
        assert!(!AppState::new(&config, Arc::new(StubClient::default())).access_log_enabled());
    }
}
