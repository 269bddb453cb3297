//! Boolean conditions over recorded answers and the selected entity type.
//!
//! Rulebooks describe predicates as single-key maps (`{equals: {...}}`,
//! `{any: [...]}`). Parsing never fails: a node with no recognised operator,
//! more than one operator, or a malformed payload becomes
//! [`Predicate::Invalid`], which always evaluates to `false`.

use super::answers::AnswerSet;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `null` or `{}`.
    Always,
    Any(Vec<Predicate>),
    All(Vec<Predicate>),
    Not(Box<Predicate>),
    Equals {
        question_id: String,
        value: Value,
    },
    /// The answer must be a list containing `value`.
    Includes {
        question_id: String,
        value: Value,
    },
    In {
        question_id: String,
        values: Vec<Value>,
    },
    EntityIn(Vec<String>),
    Invalid(String),
}

impl Predicate {
    pub fn equals(question_id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            question_id: question_id.into(),
            value: value.into(),
        }
    }

    pub fn includes(question_id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Includes {
            question_id: question_id.into(),
            value: value.into(),
        }
    }

    pub fn one_of<I, V>(question_id: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In {
            question_id: question_id.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn entity_in<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::EntityIn(entities.into_iter().map(Into::into).collect())
    }

    pub fn negate(inner: Predicate) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Builds a predicate from a loosely typed rulebook node.
    pub fn from_value(node: &Value) -> Self {
        match node {
            Value::Null => Predicate::Always,
            Value::Object(map) => parse_object(map),
            other => Predicate::Invalid(format!("expected a map, found {}", kind_of(other))),
        }
    }

    pub fn evaluate(&self, answers: &AnswerSet, entity_type: Option<&str>) -> bool {
        match self {
            Predicate::Always => true,
            // Every child is evaluated; the result is plain AND/OR.
            Predicate::Any(children) => children
                .iter()
                .map(|child| child.evaluate(answers, entity_type))
                .fold(false, |acc, matched| acc || matched),
            Predicate::All(children) => children
                .iter()
                .map(|child| child.evaluate(answers, entity_type))
                .fold(true, |acc, matched| acc && matched),
            Predicate::Not(inner) => !inner.evaluate(answers, entity_type),
            Predicate::Equals { question_id, value } => {
                recorded_value(answers, question_id) == *value
            }
            Predicate::Includes { question_id, value } => answers
                .get(question_id)
                .and_then(|answer| answer.as_choices())
                .map(|choices| {
                    choices
                        .iter()
                        .any(|choice| matches!(value, Value::String(expected) if expected == choice))
                })
                .unwrap_or(false),
            Predicate::In { question_id, values } => {
                let recorded = recorded_value(answers, question_id);
                values.iter().any(|candidate| *candidate == recorded)
            }
            Predicate::EntityIn(entities) => entity_type
                .map(|entity| entities.iter().any(|candidate| candidate == entity))
                .unwrap_or(false),
            Predicate::Invalid(_) => false,
        }
    }

    /// Reasons for every malformed node in this tree.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        self.collect_problems(&mut problems);
        problems
    }

    fn collect_problems(&self, problems: &mut Vec<String>) {
        match self {
            Predicate::Any(children) | Predicate::All(children) => {
                for child in children {
                    child.collect_problems(problems);
                }
            }
            Predicate::Not(inner) => inner.collect_problems(problems),
            Predicate::Invalid(reason) => problems.push(reason.clone()),
            _ => {}
        }
    }
}

/// Evaluates an optional predicate; an absent predicate always holds.
pub fn evaluate(predicate: Option<&Predicate>, answers: &AnswerSet, entity_type: Option<&str>) -> bool {
    predicate
        .map(|predicate| predicate.evaluate(answers, entity_type))
        .unwrap_or(true)
}

/// Unanswered questions compare as JSON `null`.
fn recorded_value(answers: &AnswerSet, question_id: &str) -> Value {
    answers
        .get(question_id)
        .map(|answer| answer.to_value())
        .unwrap_or(Value::Null)
}

fn parse_object(map: &Map<String, Value>) -> Predicate {
    let mut entries = map.iter();
    let (operator, payload) = match (entries.next(), entries.next()) {
        (None, _) => return Predicate::Always,
        (Some(entry), None) => entry,
        (Some(_), Some(_)) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            return Predicate::Invalid(format!(
                "predicate has more than one operator ({})",
                keys.join(", ")
            ));
        }
    };

    match operator.as_str() {
        "any" => parse_children(operator, payload).map_or_else(Predicate::Invalid, Predicate::Any),
        "all" => parse_children(operator, payload).map_or_else(Predicate::Invalid, Predicate::All),
        "not" => Predicate::negate(Predicate::from_value(payload)),
        "equals" => parse_comparison(operator, payload)
            .map_or_else(Predicate::Invalid, |(question_id, value)| Predicate::Equals {
                question_id,
                value,
            }),
        "includes" => parse_comparison(operator, payload)
            .map_or_else(Predicate::Invalid, |(question_id, value)| {
                Predicate::Includes { question_id, value }
            }),
        "in" => parse_membership(payload)
            .map_or_else(Predicate::Invalid, |(question_id, values)| Predicate::In {
                question_id,
                values,
            }),
        "entityIn" => parse_entities(payload).map_or_else(Predicate::Invalid, Predicate::EntityIn),
        unknown => Predicate::Invalid(format!("unknown predicate operator '{unknown}'")),
    }
}

fn parse_children(operator: &str, payload: &Value) -> Result<Vec<Predicate>, String> {
    match payload {
        Value::Null => Ok(Vec::new()),
        Value::Array(children) => Ok(children.iter().map(Predicate::from_value).collect()),
        other => Err(format!(
            "'{operator}' expects a list of predicates, found {}",
            kind_of(other)
        )),
    }
}

fn parse_comparison(operator: &str, payload: &Value) -> Result<(String, Value), String> {
    let fields = payload
        .as_object()
        .ok_or_else(|| format!("'{operator}' expects a map with questionId and value"))?;
    let question_id = question_id_field(operator, fields)?;
    let value = fields
        .get("value")
        .cloned()
        .ok_or_else(|| format!("'{operator}' is missing 'value'"))?;
    Ok((question_id, value))
}

fn parse_membership(payload: &Value) -> Result<(String, Vec<Value>), String> {
    let fields = payload
        .as_object()
        .ok_or_else(|| "'in' expects a map with questionId and values".to_string())?;
    let question_id = question_id_field("in", fields)?;
    match fields.get("values") {
        Some(Value::Array(values)) => Ok((question_id, values.clone())),
        Some(other) => Err(format!("'in' values must be a list, found {}", kind_of(other))),
        None => Err("'in' is missing 'values'".to_string()),
    }
}

fn parse_entities(payload: &Value) -> Result<Vec<String>, String> {
    let values = match payload {
        Value::Object(fields) => fields.get("values").unwrap_or(&Value::Null),
        other => {
            return Err(format!(
                "'entityIn' expects a map with values, found {}",
                kind_of(other)
            ))
        }
    };

    match values {
        Value::Null => Ok(Vec::new()),
        Value::Array(entries) => Ok(entries
            .iter()
            .filter_map(|entry| entry.as_str().map(str::to_string))
            .collect()),
        other => Err(format!(
            "'entityIn' values must be a list, found {}",
            kind_of(other)
        )),
    }
}

fn question_id_field(operator: &str, fields: &Map<String, Value>) -> Result<String, String> {
    match fields.get("questionId") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(other) => Err(format!(
            "'{operator}' questionId must be a string, found {}",
            kind_of(other)
        )),
        None => Err(format!("'{operator}' is missing 'questionId'")),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}
