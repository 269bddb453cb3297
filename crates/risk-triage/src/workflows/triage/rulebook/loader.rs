use super::diagnostics::RulebookDiagnostic;
use super::entity::{entity_type_block, ENTITY_TYPE_ID};
use super::{ActionPriority, AppliesTo, QuestionBlock, QuestionKind, QuestionOption, Route};
use crate::workflows::triage::predicate::Predicate;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

const DEFAULT_DOMAIN: &str = "General";
const SLUG_LIMIT: usize = 40;

#[derive(Debug)]
pub enum RulebookError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    NotASequence,
    BlockNotARecord { position: usize },
}

impl std::fmt::Display for RulebookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RulebookError::Io(err) => write!(f, "failed to read rulebook: {}", err),
            RulebookError::Parse(err) => write!(f, "invalid rulebook syntax: {}", err),
            RulebookError::NotASequence => {
                write!(f, "rulebook must be a list of question blocks")
            }
            RulebookError::BlockNotARecord { position } => {
                write!(f, "question block #{} must be a map", position)
            }
        }
    }
}

impl std::error::Error for RulebookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RulebookError::Io(err) => Some(err),
            RulebookError::Parse(err) => Some(err),
            RulebookError::NotASequence | RulebookError::BlockNotARecord { .. } => None,
        }
    }
}

impl From<std::io::Error> for RulebookError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_yaml::Error> for RulebookError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse(err)
    }
}

pub(super) fn normalize(
    raw: Value,
) -> Result<(Vec<QuestionBlock>, Vec<RulebookDiagnostic>), RulebookError> {
    let records = match raw {
        Value::Null => Vec::new(),
        Value::Array(records) => records,
        _ => return Err(RulebookError::NotASequence),
    };

    let mut diagnostics = Vec::new();
    let mut blocks: Vec<QuestionBlock> = Vec::with_capacity(records.len() + 1);
    let mut seen = HashSet::new();

    for (offset, record) in records.into_iter().enumerate() {
        let position = offset + 1;
        let fields = match record {
            Value::Null => Map::new(),
            Value::Object(fields) => fields,
            _ => return Err(RulebookError::BlockNotARecord { position }),
        };

        let block = normalize_block(position, &fields, &mut diagnostics);
        if !seen.insert(block.id.clone()) {
            diagnostics.push(RulebookDiagnostic::block(
                &block.id,
                "duplicate id; later block ignored",
            ));
            continue;
        }
        blocks.push(block);
    }

    if !seen.contains(ENTITY_TYPE_ID) {
        debug!("rulebook has no entity type selector; using built-in block");
        blocks.insert(0, entity_type_block());
    }

    check_route_targets(&blocks, &mut diagnostics);

    for diagnostic in &diagnostics {
        warn!(%diagnostic, "rulebook validation warning");
    }

    Ok((blocks, diagnostics))
}

fn normalize_block(
    position: usize,
    fields: &Map<String, Value>,
    diagnostics: &mut Vec<RulebookDiagnostic>,
) -> QuestionBlock {
    let question = fields.get("question").and_then(scalar_text).unwrap_or_default();
    let id = fields
        .get("id")
        .and_then(scalar_text)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("q{:02}_{}", position, slug(&question)));

    if question.is_empty() {
        diagnostics.push(RulebookDiagnostic::block(&id, "missing 'question'"));
    }

    let domain = fields
        .get("domain")
        .and_then(scalar_text)
        .filter(|domain| !domain.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DOMAIN.to_string());

    let kind = match fields.get("kind") {
        None | Some(Value::Null) => QuestionKind::SingleSelect,
        Some(Value::String(raw)) if raw.trim().is_empty() => QuestionKind::SingleSelect,
        Some(value) => {
            let raw = scalar_text(value).unwrap_or_default();
            QuestionKind::parse(&raw).unwrap_or_else(|| {
                diagnostics.push(RulebookDiagnostic::block(
                    &id,
                    format!("unknown kind '{raw}'; treated as singleSelect"),
                ));
                QuestionKind::SingleSelect
            })
        }
    };

    let applies_to = normalize_applies_to(&id, fields.get("appliesTo"), diagnostics);
    let options = normalize_options(&id, fields.get("options"), diagnostics);

    let show_if = match fields.get("showIf") {
        None | Some(Value::Null) => None,
        Some(node) => {
            let predicate = Predicate::from_value(node);
            for problem in predicate.problems() {
                diagnostics.push(RulebookDiagnostic::block(
                    &id,
                    format!("showIf: {problem}; evaluates to false"),
                ));
            }
            Some(predicate)
        }
    };

    let next = normalize_routes(&id, fields.get("next"), diagnostics);

    QuestionBlock {
        id,
        domain,
        question,
        kind,
        options,
        applies_to,
        show_if,
        next,
    }
}

fn normalize_applies_to(
    id: &str,
    raw: Option<&Value>,
    diagnostics: &mut Vec<RulebookDiagnostic>,
) -> AppliesTo {
    match raw {
        None => {
            diagnostics.push(RulebookDiagnostic::block(
                id,
                "missing 'appliesTo' (use 'all' or a list)",
            ));
            AppliesTo::All
        }
        Some(Value::Null) => AppliesTo::All,
        Some(Value::String(value)) if value.trim().eq_ignore_ascii_case("all") => AppliesTo::All,
        Some(Value::String(value)) => {
            diagnostics.push(RulebookDiagnostic::block(
                id,
                format!("'appliesTo' should be 'all' or a list; treating '{value}' as a single entity type"),
            ));
            AppliesTo::Entities(vec![value.clone()])
        }
        Some(Value::Array(entries)) => AppliesTo::Entities(
            entries
                .iter()
                .filter_map(|entry| {
                    let label = scalar_text(entry);
                    if label.is_none() {
                        diagnostics.push(RulebookDiagnostic::block(
                            id,
                            "'appliesTo' entries must be entity type labels",
                        ));
                    }
                    label
                })
                .collect(),
        ),
        Some(_) => {
            diagnostics.push(RulebookDiagnostic::block(
                id,
                "'appliesTo' must be 'all' or a list; question will never apply",
            ));
            AppliesTo::Entities(Vec::new())
        }
    }
}

fn normalize_options(
    id: &str,
    raw: Option<&Value>,
    diagnostics: &mut Vec<RulebookDiagnostic>,
) -> Vec<QuestionOption> {
    let entries = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            diagnostics.push(RulebookDiagnostic::block(
                id,
                "'options' must be a list (use [] if none)",
            ));
            return Vec::new();
        }
    };

    let mut options = Vec::with_capacity(entries.len());
    let mut labels = HashSet::new();

    for (offset, entry) in entries.iter().enumerate() {
        let number = offset + 1;
        let Some(fields) = entry.as_object() else {
            diagnostics.push(RulebookDiagnostic::option(
                id,
                number,
                "option must be a map",
            ));
            continue;
        };

        let text = match fields.get("text") {
            None => {
                diagnostics.push(RulebookDiagnostic::option(id, number, "missing 'text'"));
                String::new()
            }
            Some(value) => scalar_text(value).unwrap_or_default(),
        };

        let points = match fields.get("points") {
            None => {
                diagnostics.push(RulebookDiagnostic::option(id, number, "missing 'points'"));
                0
            }
            Some(value) => integer_points(value).unwrap_or_else(|| {
                diagnostics.push(RulebookDiagnostic::option(
                    id,
                    number,
                    "'points' must be an integer; using 0",
                ));
                0
            }),
        };

        let action_priority = match fields.get("action_priority") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let raw = scalar_text(value).unwrap_or_default();
                let parsed = ActionPriority::parse(&raw);
                if parsed.is_none() {
                    diagnostics.push(RulebookDiagnostic::option(
                        id,
                        number,
                        format!("unknown action_priority '{raw}'; left unset"),
                    ));
                }
                parsed
            }
        };

        let hardcore = match fields.get("hardcore") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(flag)) => Some(*flag),
            Some(_) => {
                diagnostics.push(RulebookDiagnostic::option(
                    id,
                    number,
                    "'hardcore' must be true or false; ignored",
                ));
                None
            }
        };

        if !labels.insert(text.clone()) {
            diagnostics.push(RulebookDiagnostic::option(
                id,
                number,
                format!("duplicate option text '{text}'"),
            ));
        }

        options.push(QuestionOption {
            text,
            points,
            next_step: optional_text(fields, "next_step"),
            risk_comment: optional_text(fields, "risk_comment"),
            legal_basis: optional_text(fields, "legal_basis"),
            action_priority,
            tag: optional_text(fields, "tag"),
            hardcore,
        });
    }

    options
}

fn normalize_routes(
    id: &str,
    raw: Option<&Value>,
    diagnostics: &mut Vec<RulebookDiagnostic>,
) -> Vec<Route> {
    let entries = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            diagnostics.push(RulebookDiagnostic::block(id, "'next' must be a list of routes"));
            return Vec::new();
        }
    };

    let mut routes = Vec::with_capacity(entries.len());
    for (offset, entry) in entries.iter().enumerate() {
        let number = offset + 1;
        let target_id = entry
            .get("targetId")
            .and_then(scalar_text)
            .filter(|target| !target.is_empty());

        let Some(target_id) = target_id else {
            diagnostics.push(RulebookDiagnostic::block(
                id,
                format!("route #{number} has no 'targetId'; ignored"),
            ));
            continue;
        };

        let when = match entry.get("when") {
            None | Some(Value::Null) => None,
            Some(node) => {
                let predicate = Predicate::from_value(node);
                for problem in predicate.problems() {
                    diagnostics.push(RulebookDiagnostic::block(
                        id,
                        format!("route #{number}: {problem}; never matches"),
                    ));
                }
                Some(predicate)
            }
        };

        routes.push(Route { when, target_id });
    }

    routes
}

fn check_route_targets(blocks: &[QuestionBlock], diagnostics: &mut Vec<RulebookDiagnostic>) {
    let known: HashSet<&str> = blocks.iter().map(|block| block.id.as_str()).collect();
    for block in blocks {
        for route in &block.next {
            if !known.contains(route.target_id.as_str()) {
                diagnostics.push(RulebookDiagnostic::block(
                    &block.id,
                    format!("route target '{}' does not exist", route.target_id),
                ));
            }
        }
    }
}

/// Lowercase ASCII slug of the question text, used for synthesized ids.
pub(super) fn slug(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;

    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if pending_dash {
            slug.push('-');
            pending_dash = false;
        }
        if ch.is_ascii_alphanumeric() || ch == '-' {
            slug.push(ch.to_ascii_lowercase());
        }
    }

    if slug.is_empty() {
        return "q".to_string();
    }
    slug.chars().take(SLUG_LIMIT).collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn optional_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(scalar_text)
}

fn integer_points(value: &Value) -> Option<i64> {
    match value {
        Value::Null => Some(0),
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|points| points.fract() == 0.0)
                .map(|points| points as i64)
        }),
        Value::String(raw) => raw.trim().parse::<i64>().ok(),
        _ => None,
    }
}
