use std::path::{Path, PathBuf};
use std::sync::Arc;

use linkpilot_kernel::Config;

pub struct CliContext {
    config: Arc<Config>,
    config_path: PathBuf,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
        }
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    /// Shared handle for long-lived services.
    pub fn shared_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Marketplace target for the local runner, falling back to this
    /// machine's own server address.
    pub fn marketplace_url(&self) -> String {
        self.config
            .marketplace_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.config.server.bind))
    }
}
