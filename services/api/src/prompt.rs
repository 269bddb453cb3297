use crate::infra::load_rulebook;
use chrono::Local;
use clap::Args;
use risk_triage::config::AppConfig;
use risk_triage::error::AppError;
use risk_triage::telemetry::{self, LogTarget};
use risk_triage::workflows::triage::{
    write_items_csv, Answer, QuestionBlock, QuestionKind, ReportPayload, Rulebook, Session,
    SessionError, SessionMetadata, TriageServiceError,
};
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Override the configured rulebook path
    #[arg(long)]
    pub(crate) rulebook: Option<PathBuf>,
    /// Where to write the report payload
    #[arg(long, default_value = "report.json")]
    pub(crate) output: PathBuf,
    /// Also export the recorded items as CSV
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

pub(crate) fn run(args: RunArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(rulebook) = args.rulebook {
        config.questionnaire.rulebook_path = rulebook;
    }

    telemetry::init_with_target(&config.telemetry, LogTarget::Stderr)?;

    let rulebook = load_rulebook(&config.questionnaire.rulebook_path)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut output = stdout.lock();

    let session = run_questionnaire(
        &mut input,
        &mut output,
        rulebook,
        config.questionnaire.access_code.as_deref(),
    )?;

    let report = session
        .report(
            &config.questionnaire.rulebook_version(),
            Local::now().naive_local(),
        )
        .map_err(TriageServiceError::from)?;

    let file = File::create(&args.output)?;
    serde_json::to_writer_pretty(file, &report).map_err(io::Error::from)?;
    info!(path = %args.output.display(), "report payload written");

    if let Some(path) = &args.csv {
        let file = File::create(path)?;
        write_items_csv(file, session.scores().items()).map_err(io::Error::from)?;
        info!(path = %path.display(), "item export written");
    }

    render_summary(&mut output, &report, &session.attention_points())?;
    writeln!(output, "\nReport written to {}", args.output.display())?;
    Ok(())
}

/// Drives a session to completion over line-based input.
pub(crate) fn run_questionnaire<R, W>(
    input: &mut R,
    output: &mut W,
    rulebook: Arc<Rulebook>,
    access_code: Option<&str>,
) -> Result<Session, AppError>
where
    R: BufRead,
    W: Write,
{
    if let Some(expected) = access_code {
        let presented = ask(input, output, "Access code: ")?;
        if presented != expected {
            writeln!(output, "Access denied.")?;
            return Err(TriageServiceError::Unauthorized.into());
        }
    }

    let metadata = SessionMetadata {
        organisation: ask(input, output, "Organisation name: ")?,
        completed_by: ask(input, output, "Completed by: ")?,
    };
    let mut session = Session::new(rulebook, metadata);
    let total = session.rulebook().len();

    loop {
        let Some(block) = session.current_question() else {
            break;
        };
        writeln!(
            output,
            "\n[{}/{}] {}: {}",
            session.asked().len() + 1,
            total,
            block.domain,
            block.question
        )?;
        let response = prompt_answer(input, output, block)?;

        match session.submit(response) {
            Ok(_) => {}
            Err(SessionError::Answer(err)) => writeln!(output, "{err}")?,
            Err(err) => return Err(TriageServiceError::from(err).into()),
        }
    }

    Ok(session)
}

fn prompt_answer<R, W>(input: &mut R, output: &mut W, block: &QuestionBlock) -> Result<Answer, AppError>
where
    R: BufRead,
    W: Write,
{
    if block.is_free_text() {
        return Ok(Answer::Text(ask(input, output, "> ")?));
    }

    for (position, option) in block.options.iter().enumerate() {
        writeln!(output, "  {}. {}", position + 1, option.text)?;
    }
    let hint = match block.kind {
        QuestionKind::MultiSelect if block.options.is_empty() => "No options; press Enter: ",
        QuestionKind::MultiSelect => "Select any (comma-separated numbers, blank for none): ",
        _ => "Select one: ",
    };

    loop {
        let raw = ask(input, output, hint)?;
        match parse_selection(block, &raw) {
            Ok(answer) => return Ok(answer),
            Err(message) => writeln!(output, "{message}")?,
        }
    }
}

/// Resolves numbered or literal selections against the block's options.
/// A blank multi select answer means none of the options apply.
pub(crate) fn parse_selection(block: &QuestionBlock, raw: &str) -> Result<Answer, String> {
    let resolve = |token: &str| -> Result<String, String> {
        let token = token.trim();
        if let Some(option) = block.option(token) {
            return Ok(option.text.clone());
        }
        token
            .parse::<usize>()
            .ok()
            .and_then(|number| number.checked_sub(1))
            .and_then(|index| block.options.get(index))
            .map(|option| option.text.clone())
            .ok_or_else(|| {
                format!(
                    "'{token}' is not a valid choice; enter a number between 1 and {}",
                    block.options.len()
                )
            })
    };

    match block.kind {
        QuestionKind::MultiSelect => {
            let choices = raw
                .split(',')
                .filter(|token| !token.trim().is_empty())
                .map(resolve)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Answer::Choices(choices))
        }
        _ => resolve(raw).map(Answer::Text),
    }
}

fn ask<R, W>(input: &mut R, output: &mut W, label: &str) -> io::Result<String>
where
    R: BufRead,
    W: Write,
{
    write!(output, "{label}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed before the questionnaire finished",
        ));
    }
    Ok(line.trim().to_string())
}

pub(crate) fn render_summary<W: Write>(
    output: &mut W,
    report: &ReportPayload,
    attention_points: &[&str],
) -> io::Result<()> {
    writeln!(
        output,
        "\nOverall risk: {} (total score {})",
        report.overall_risk.label(),
        report.total_score
    )?;
    if let Some(reason) = &report.overall_risk_override {
        writeln!(output, "  override: {reason}")?;
    }

    writeln!(output, "\nDomains")?;
    for domain in &report.domains {
        writeln!(
            output,
            "  {:<24} {:>4}  {}",
            domain.name,
            domain.score,
            domain.risk.label()
        )?;
    }

    if !report.top_items.is_empty() {
        writeln!(output, "\nTop items")?;
        for item in &report.top_items {
            writeln!(
                output,
                "  [{:>3}] {} / {}: {}",
                item.points, item.domain, item.question, item.answer
            )?;
        }
    }

    if !attention_points.is_empty() {
        writeln!(output, "\nAttention points")?;
        for point in attention_points {
            writeln!(output, "  - {point}")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;

    const RULEBOOK: &str = r#"
- id: prices
  domain: Pricing
  question: Do members agree on prices?
  appliesTo: all
  options:
    - {text: "Yes", points: 40, tag: price_fixing}
    - {text: "No", points: 0}
- id: channels
  domain: Commercial
  question: Which channels do you use?
  kind: multiSelect
  appliesTo: all
  options:
    - {text: TV, points: 5}
    - {text: Streaming, points: 10}
- id: notes
  domain: General
  question: Anything else?
  kind: text
  appliesTo: all
"#;

    fn rulebook() -> Arc<Rulebook> {
        Arc::new(RULEBOOK.parse().expect("rulebook parses"))
    }

    fn run_with(input: &str, access_code: Option<&str>) -> (Result<Session, AppError>, String) {
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut output = Vec::new();
        let result = run_questionnaire(&mut input, &mut output, rulebook(), access_code);
        (result, String::from_utf8(output).expect("utf8 output"))
    }

    #[test]
    fn questionnaire_completes_from_numbered_input() {
        let (result, transcript) = run_with(
            "Northern Rovers FC\nLegal\n4\n1\n2, 1\nNothing to add\n",
            None,
        );

        let session = result.expect("questionnaire completes");
        assert!(session.is_complete());
        assert_eq!(session.entity_type(), Some("Club / Team"));
        assert_eq!(session.metadata().organisation, "Northern Rovers FC");
        assert_eq!(
            session.answers().get("channels"),
            Some(&Answer::choices(["Streaming", "TV"]))
        );
        assert_eq!(session.scores().total(), 55);
        assert!(transcript.contains("[2/4] Pricing: Do members agree on prices?"));
    }

    #[test]
    fn invalid_selection_is_asked_again() {
        let (result, transcript) =
            run_with("Org\nMe\n99\nClub / Team\nNo\nTV\n\n", None);

        let session = result.expect("questionnaire completes");
        assert!(transcript.contains("'99' is not a valid choice"));
        assert_eq!(session.scores().total(), 5);
    }

    #[test]
    fn wrong_access_code_stops_before_questions() {
        let (result, transcript) = run_with("guess\n", Some("letmein"));

        assert!(matches!(
            result,
            Err(AppError::Triage(TriageServiceError::Unauthorized))
        ));
        assert!(transcript.contains("Access denied."));
        assert!(!transcript.contains("Organisation name"));
    }

    #[test]
    fn closed_input_is_an_io_error() {
        let (result, _) = run_with("Org\nMe\n", None);

        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn multi_select_accepts_numbers_and_labels() {
        let rulebook = rulebook();
        let block = rulebook.block("channels").expect("block exists");

        assert_eq!(
            parse_selection(block, "1,Streaming"),
            Ok(Answer::choices(["TV", "Streaming"]))
        );
        assert!(parse_selection(block, "7").is_err());
    }

    #[test]
    fn blank_multi_select_means_none_apply() {
        let rulebook = rulebook();
        let block = rulebook.block("channels").expect("block exists");

        assert_eq!(parse_selection(block, ""), Ok(Answer::Choices(Vec::new())));
        assert_eq!(parse_selection(block, " , "), Ok(Answer::Choices(Vec::new())));
    }

    #[test]
    fn multi_select_without_options_is_answered_by_enter() {
        let rulebook: Rulebook = r#"
- id: extras
  domain: Commercial
  question: Which extras apply?
  kind: multiSelect
  appliesTo: all
  options: []
"#
        .parse()
        .expect("rulebook parses");
        let block = rulebook.block("extras").expect("block exists");
        assert_eq!(parse_selection(block, ""), Ok(Answer::Choices(Vec::new())));

        let mut input = Cursor::new(b"Org\nMe\n4\n\n".to_vec());
        let mut output = Vec::new();
        let session = run_questionnaire(&mut input, &mut output, Arc::new(rulebook), None)
            .expect("questionnaire completes");

        assert!(session.is_complete());
        assert_eq!(session.answers().get("extras"), Some(&Answer::Choices(Vec::new())));
        assert_eq!(session.scores().total(), 0);
    }

    #[test]
    fn blank_line_skips_multi_select_in_questionnaire() {
        let (result, transcript) = run_with("Org\nMe\n4\nNo\n\n\n", None);

        let session = result.expect("questionnaire completes");
        assert_eq!(session.answers().get("channels"), Some(&Answer::Choices(Vec::new())));
        assert_eq!(session.scores().total(), 0);
        assert!(transcript.contains("blank for none"));
    }

    #[test]
    fn summary_lists_overrides_and_attention_points() {
        let (result, _) = run_with("Org\nMe\n4\nYes\n1\n\n", None);
        let session = result.expect("questionnaire completes");
        let generated_at = NaiveDate::from_ymd_opt(2025, 1, 15)
            .and_then(|date| date.and_hms_opt(8, 0, 0))
            .expect("valid timestamp");
        let report = session
            .report("inline.yaml", generated_at)
            .expect("report available");

        let mut output = Vec::new();
        render_summary(&mut output, &report, &["Club-to-club coordination on players"])
            .expect("summary written");
        let summary = String::from_utf8(output).expect("utf8");

        assert!(summary.contains("Overall risk: HIGH (total score 45)"));
        assert!(summary.contains("override: hardcore restriction 'price_fixing'"));
        assert!(summary.contains("  - Club-to-club coordination on players"));
    }
}
