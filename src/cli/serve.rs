use std::sync::Arc;

use anyhow::Result;
use cdp_adapter::ChromiumLauncher;
use clap::Args;
use linkpilot_kernel::{serve, Coordinator, ExecutionMode, SecretKeys, ServeState};
use tracing::info;

use super::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,

    /// Only personalize; callers execute the returned command themselves
    #[arg(long)]
    pub split: bool,
}

pub async fn cmd_serve(args: ServeArgs, ctx: &CliContext) -> Result<()> {
    let mut config = ctx.config().clone();
    if args.split {
        config.mode = ExecutionMode::Split;
    }
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    let launcher = Arc::new(ChromiumLauncher::new(config.browser.clone()));
    let mode = config.mode;
    let coordinator = Coordinator::new(Arc::new(config), launcher)?;
    let state = ServeState::new(Arc::new(coordinator), SecretKeys::from_env());

    info!(%bind, mode = mode.as_str(), "starting execute endpoint");
    serve(&bind, state).await?;
    Ok(())
}
