use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use cdp_adapter::{CdpConfig, ChromiumLauncher};
use clap::Args;
use linkpilot_core_types::ActionKind;
use linkpilot_kernel::coordinator::LLM_API_KEY;
use linkpilot_kernel::{LocalReport, LocalRunner, MarketplaceClient, SecretKeys};
use serde_json::json;
use tracing::info;

use super::context::CliContext;
use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct LocalArgs {
    /// Prompt containing the profile URL
    pub prompt: String,

    /// Marketplace base URL (overrides marketplace_url)
    #[arg(long)]
    pub marketplace_url: Option<String>,

    /// Browser profile directory that is already signed in
    #[arg(long, value_name = "DIR")]
    pub user_data_dir: Option<PathBuf>,

    /// Marketplace request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,
}

pub async fn cmd_local(args: LocalArgs, ctx: &CliContext, output: &OutputFormat) -> Result<()> {
    let config = ctx.config();
    let base_url = args
        .marketplace_url
        .clone()
        .unwrap_or_else(|| ctx.marketplace_url());
    let client = MarketplaceClient::new(&base_url, Duration::from_secs(args.timeout_secs))?;
    info!(endpoint = %client.endpoint(), "using marketplace");

    let user_data_dir = args
        .user_data_dir
        .clone()
        .or_else(|| config.browser.user_data_dir.clone());
    let launcher = Arc::new(ChromiumLauncher::new(CdpConfig::headful_profile(
        user_data_dir,
    )));
    let runner = LocalRunner::new(config, client, launcher)?;

    let keys = SecretKeys::from_env();
    let llm_key = keys.get(LLM_API_KEY).unwrap_or_default();
    let report = runner.run(&args.prompt, llm_key).await?;

    println!("{}", render_report(&report, output));
    if !report.outcome.success() {
        bail!("local run failed");
    }
    Ok(())
}

fn render_report(report: &LocalReport, output: &OutputFormat) -> String {
    let outcome = &report.outcome;
    let failure = outcome.error_kind().map(|kind| kind.message());
    match output {
        OutputFormat::Json => json!({
            "success": outcome.success(),
            "action": report.request.kind.as_str(),
            "profile_url": report.request.profile_url,
            "full_name": report.full_name,
            "text": report.request.text,
            "error": failure,
        })
        .to_string(),
        OutputFormat::Human => {
            let who = if report.full_name.is_empty() {
                report.request.profile_url.as_str()
            } else {
                report.full_name.as_str()
            };
            match (failure, report.request.kind) {
                (Some(reason), _) => format!("error: {reason}"),
                (None, ActionKind::Connect) => format!("ok: Connection request sent to {who}"),
                (None, ActionKind::Message) => format!("ok: Message sent to {who}"),
            }
        }
    }
}
