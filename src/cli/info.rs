use anyhow::Result;
use cdp_adapter::config::detect_chrome_executable;
use linkpilot_kernel::coordinator::{LLM_API_KEY, LLM_PROVIDER_KEY, SESSION_COOKIE_KEY};
use linkpilot_kernel::SecretKeys;

use super::context::CliContext;

pub async fn cmd_info(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    // Presence only; values never leave the process.
    let keys = SecretKeys::from_env();
    let present = |name: &str| if keys.get(name).is_some() { "set" } else { "not set" };

    println!("LinkPilot System Information");
    println!("============================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE"));
    println!("Git Commit: {}", env!("GIT_HASH"));
    println!();

    println!("Configuration:");
    println!("- Config File: {}", ctx.config_path().display());
    println!("- Mode: {}", config.mode.as_str());
    println!("- Site: {}", config.site.base_url);
    println!("- LLM Provider: {}", config.llm.default_provider);
    println!("- Server Bind: {}", config.server.bind);
    println!("- Marketplace: {}", ctx.marketplace_url());
    println!(
        "- Treat Satisfied As Success: {}",
        config.policy.treat_satisfied_as_success
    );
    println!();

    println!("Browser:");
    println!("- Headless: {}", config.browser.headless);
    match config
        .browser
        .executable
        .clone()
        .or_else(detect_chrome_executable)
    {
        Some(path) => println!("- Executable: {}", path.display()),
        None => println!("- Executable: not found"),
    }
    println!();

    println!("Environment:");
    println!("- {}: {}", SESSION_COOKIE_KEY, present(SESSION_COOKIE_KEY));
    println!("- {}: {}", LLM_API_KEY, present(LLM_API_KEY));
    println!("- {}: {}", LLM_PROVIDER_KEY, present(LLM_PROVIDER_KEY));

    Ok(())
}
