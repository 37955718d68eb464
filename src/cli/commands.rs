use clap::Subcommand;

use super::config::ConfigArgs;
use super::local::LocalArgs;
use super::run::RunArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Send one connection request or message from a prompt
    Run(RunArgs),

    /// Serve the streaming execute endpoint over HTTP
    Serve(ServeArgs),

    /// Prepare via a marketplace endpoint, then act in your own browser profile
    Local(LocalArgs),

    /// Inspect LinkPilot configuration
    Config(ConfigArgs),

    /// Show build and environment information
    Info,
}
