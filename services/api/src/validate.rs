use clap::Args;
use risk_triage::config::AppConfig;
use risk_triage::error::AppError;
use risk_triage::telemetry::{self, LogTarget};
use risk_triage::workflows::triage::Rulebook;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Rulebook to check instead of the configured one
    #[arg(long)]
    pub(crate) rulebook: Option<PathBuf>,
}

pub(crate) fn run(args: ValidateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_with_target(&config.telemetry, LogTarget::Stderr)?;

    let path = args
        .rulebook
        .unwrap_or_else(|| config.questionnaire.rulebook_path.clone());
    let rulebook = Rulebook::from_path(&path)?;

    let stdout = io::stdout();
    let mut output = stdout.lock();
    writeln!(output, "{}", path.display())?;
    print_report(&mut output, &rulebook)?;
    Ok(())
}

fn print_report<W: Write>(output: &mut W, rulebook: &Rulebook) -> io::Result<()> {
    let diagnostics = rulebook.diagnostics();
    writeln!(
        output,
        "{} questions, {} warnings",
        rulebook.len(),
        diagnostics.len()
    )?;
    for diagnostic in diagnostics {
        writeln!(output, "  - {diagnostic}")?;
    }
    Ok(())
}
