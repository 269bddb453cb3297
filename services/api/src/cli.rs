use crate::prompt::{self, RunArgs};
use crate::server;
use crate::validate::{self, ValidateArgs};
use clap::{Args, Parser, Subcommand};
use risk_triage::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Competition Risk Triage",
    about = "Serve or run the competition law risk questionnaire",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Answer the questionnaire interactively and write the report payload
    Run(RunArgs),
    /// Load a rulebook and print its validation warnings
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured rulebook path
    #[arg(long)]
    pub(crate) rulebook: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Run(args) => prompt::run(args),
        Command::Validate(args) => validate::run(args),
    }
}
