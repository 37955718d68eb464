use std::sync::Arc;

use anyhow::{bail, Result};
use cdp_adapter::ChromiumLauncher;
use clap::Args;
use linkpilot_core_types::ProgressEvent;
use linkpilot_kernel::{
    progress_channel, Coordinator, ExecutionMode, InvocationOptions, InvocationRequest,
    SecretKeys,
};

use super::context::CliContext;
use super::output::{print_event, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Prompt containing the profile URL, e.g. "Connect with Jane: https://linkedin.com/in/jane"
    pub prompt: String,

    /// Action to perform (connect or message)
    #[arg(short, long)]
    pub action: Option<String>,

    /// Send the text as given instead of asking the LLM
    #[arg(long)]
    pub no_personalize: bool,

    /// Prospect full name (otherwise taken from the prompt)
    #[arg(long)]
    pub full_name: Option<String>,

    /// Prospect title
    #[arg(long)]
    pub title: Option<String>,

    /// Prospect company
    #[arg(long)]
    pub company: Option<String>,

    /// Message text (required for the message action)
    #[arg(long)]
    pub message_text: Option<String>,

    /// Prompt language
    #[arg(long, default_value = "en")]
    pub language: String,
}

impl RunArgs {
    fn to_request(&self) -> InvocationRequest {
        InvocationRequest {
            prompt: self.prompt.clone(),
            language: self.language.clone(),
            options: InvocationOptions {
                action: self.action.clone(),
                personalize: Some(!self.no_personalize),
                full_name: self.full_name.clone(),
                title: self.title.clone(),
                company: self.company.clone(),
                message_text: self.message_text.clone(),
            },
            mode: Some(ExecutionMode::Remote),
        }
    }
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext, output: &OutputFormat) -> Result<()> {
    let config = ctx.shared_config();
    let launcher = Arc::new(ChromiumLauncher::new(config.browser.clone()));
    let coordinator = Coordinator::new(config, launcher)?;
    let keys = SecretKeys::from_env();

    let (reporter, mut rx) = progress_channel();
    let printer = async {
        let mut failed = false;
        while let Some(event) = rx.recv().await {
            failed |= matches!(event, ProgressEvent::Error(_));
            print_event(&event, output);
        }
        failed
    };
    let ((), failed) = tokio::join!(
        coordinator.execute(args.to_request(), &keys, reporter),
        printer
    );

    if failed {
        bail!("run did not complete");
    }
    Ok(())
}
