use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use linkpilot_kernel::{Config, IntentExtractor};

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the resolved configuration
    Show,

    /// Print the configuration file path in use
    Path,

    /// Validate configuration
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            println!(
                "Current configuration ({}):",
                ctx.config_path().display()
            );
            println!("{}", serde_yaml::to_string(ctx.config())?);
        }
        ConfigAction::Path => {
            println!("{}", ctx.config_path().display());
        }
        ConfigAction::Validate => {
            validate(ctx.config())?;
            println!("Configuration is valid");
        }
    }
    Ok(())
}

/// Checks that would otherwise only surface on the first invocation.
pub fn validate(config: &Config) -> Result<()> {
    config
        .selectors
        .validate()
        .map_err(|err| anyhow!("invalid selectors: {err}"))?;
    IntentExtractor::for_domain(&config.site.domain).context("invalid site.domain")?;
    if !config.site.base_url.starts_with("http://") && !config.site.base_url.starts_with("https://")
    {
        return Err(anyhow!("site.base_url must be an http(s) URL"));
    }
    if let Some(url) = &config.marketplace_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!("marketplace_url must be an http(s) URL"));
        }
    }
    Ok(())
}
