//! MeetSpace - room booking client
//!
#![doc = "Main entry point for the MeetSpace command-line client."]

use anyhow::Result;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meetspace::auth::SessionManager;
use meetspace::cli::{Cli, Commands};
use meetspace::commands;
use meetspace::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let session = SessionManager::from_config(&config)?;
    let mut ended = session.subscribe();
    let explicit_logout = matches!(cli.command, Commands::Logout);

    let result = commands::execute(&session, cli.command).await;

    if ended.try_recv().is_some() && !explicit_logout {
        eprintln!(
            "{} Run {} to start a new one.",
            "Session ended.".red(),
            "meetspace login".cyan()
        );
    }
    session.teardown();

    result
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "meetspace=debug"
    } else {
        "meetspace=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
