use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    linkpilot_cli::cli::app::run().await
}
