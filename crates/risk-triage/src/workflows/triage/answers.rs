use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Recorded response to a question: one label, or an ordered list of labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Choices(Vec<String>),
}

impl Answer {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choices(values.into_iter().map(Into::into).collect())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(text) => Some(text),
            Answer::Choices(_) => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            Answer::Text(_) => None,
            Answer::Choices(choices) => Some(choices),
        }
    }

    /// JSON shape used for structural comparison against rulebook literals.
    pub fn to_value(&self) -> Value {
        match self {
            Answer::Text(text) => Value::String(text.clone()),
            Answer::Choices(choices) => {
                Value::Array(choices.iter().cloned().map(Value::String).collect())
            }
        }
    }

    /// Human readable rendering for summaries and exports.
    pub fn display(&self) -> String {
        match self {
            Answer::Text(text) => text.clone(),
            Answer::Choices(choices) => choices.join(", "),
        }
    }
}

/// Answers keyed by question id, in the order they were given.
#[derive(Debug, Clone, Default)]
pub struct AnswerSet {
    entries: Vec<(String, Answer)>,
    index: HashMap<String, usize>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an answer. Answers are never replaced; returns false if the
    /// question already has one.
    pub fn record(&mut self, question_id: impl Into<String>, answer: Answer) -> bool {
        let question_id = question_id.into();
        if self.index.contains_key(&question_id) {
            return false;
        }
        self.index.insert(question_id.clone(), self.entries.len());
        self.entries.push((question_id, answer));
        true
    }

    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.index
            .get(question_id)
            .map(|position| &self.entries[*position].1)
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.index.contains_key(question_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Answer)> {
        self.entries
            .iter()
            .map(|(question_id, answer)| (question_id.as_str(), answer))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Answer)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (S, Answer)>>(iter: T) -> Self {
        let mut answers = AnswerSet::new();
        for (question_id, answer) in iter {
            answers.record(question_id, answer);
        }
        answers
    }
}
