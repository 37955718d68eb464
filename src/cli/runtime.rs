use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use linkpilot_kernel::Config;
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::output::LogFormat;

pub const MARKETPLACE_URL_ENV: &str = "LINKPILOT_MARKETPLACE_URL";

pub fn load_local_env_overrides() {
    let path = Path::new("config/local.env");
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            for (idx, raw_line) in contents.lines().enumerate() {
                let line = raw_line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    warn!(line = idx + 1, "invalid local.env entry; skipping");
                    continue;
                };
                let key = key.trim();
                if key.is_empty() || env::var(key).is_ok() {
                    continue;
                }
                env::set_var(key, unescape_value(value.trim()));
            }
            info!(path = %path.display(), "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

/// Logs go to stderr so progress events on stdout stay machine-readable.
pub fn init_logging(level: &str, debug: bool, format: &LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
    .context("Failed to initialise logging")?;

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    if !config_path.exists() {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        return Ok(LoadedConfig {
            config: Config::default(),
            path: config_path,
        });
    }

    let content = fs::read_to_string(&config_path)
        .await
        .context("Failed to read config file")?;
    let config = match serde_yaml::from_str::<Config>(&content) {
        Ok(config) => {
            info!("Loaded configuration from: {}", config_path.display());
            config
        }
        Err(err) => {
            warn!(
                path = %config_path.display(),
                error = %err,
                "Config file could not be parsed, using defaults"
            );
            Config::default()
        }
    };
    Ok(LoadedConfig {
        config,
        path: config_path,
    })
}

fn default_config_path() -> Result<PathBuf> {
    // Priority: ./config/config.yaml > ~/.config/linkpilot/config.yaml
    let local_config = PathBuf::from("config/config.yaml");
    if local_config.exists() {
        return Ok(local_config);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("linkpilot");
    path.push("config.yaml");
    Ok(path)
}

pub fn apply_runtime_overrides(config: &mut Config) {
    if let Ok(url) = env::var(MARKETPLACE_URL_ENV) {
        let url = url.trim();
        if !url.is_empty() {
            info!("Using marketplace URL from {}: {}", MARKETPLACE_URL_ENV, url);
            config.marketplace_url = Some(url.to_string());
        }
    }
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}
