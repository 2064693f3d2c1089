use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coinpulse::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for coinpulse::AppCommand {
    fn from(cmd: Commands) -> coinpulse::AppCommand {
        match cmd {
            Commands::Run => coinpulse::AppCommand::Run,
            Commands::Preview { banner } => coinpulse::AppCommand::Preview { banner_path: banner },
            Commands::Resolve => coinpulse::AppCommand::Resolve,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Start the bot: scheduled posts plus the keep-alive server
    Run,
    /// Fetch once and print the summary without posting
    Preview {
        /// Also render the banner image to this PNG file
        #[arg(long)]
        banner: Option<PathBuf>,
    },
    /// Show which CoinGecko id each tracked symbol maps to
    Resolve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "No .env file loaded");
    }

    let result = match cli.command {
        Some(Commands::Setup) => coinpulse::cli::setup::setup(),
        Some(cmd) => coinpulse::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
