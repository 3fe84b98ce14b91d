use clap::{Parser, Subcommand};
use cotacao::core::log::init_logging;
use std::process::ExitCode;

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
    command: Commands,
}

impl From<Commands> for cotacao::AppCommand {
    fn from(cmd: Commands) -> cotacao::AppCommand {
        match cmd {
            Commands::Server => cotacao::AppCommand::Server,
            Commands::Client => cotacao::AppCommand::Client,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Serve GET /cotacao, persisting every quote fetched
    Server,
    /// Fetch the current quote from the server and save it to a file
    Client,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let (result, reported) = match cli.command {
        Commands::Setup => (cotacao::cli::setup::setup(), false),
        cmd => {
            let command: cotacao::AppCommand = cmd.into();
            let reported = command.reports_own_failure();
            (
                cotacao::run_command(command, cli.config_path.as_deref()).await,
                reported,
            )
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !reported {
                tracing::error!(error = %format!("{e:#}"), "Application failed");
            }
            ExitCode::FAILURE
        }
    }
}
