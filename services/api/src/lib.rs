mod cli;
mod infra;
mod prompt;
mod routes;
mod server;
mod validate;

use risk_triage::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
