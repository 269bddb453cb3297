use super::answers::Answer;
use super::rulebook::{ActionPriority, QuestionBlock, QuestionKind, QuestionOption};
use serde::{Deserialize, Serialize};

pub const TOP_ITEM_LIMIT: usize = 5;

/// Scored, reportable record of one answer (or one selection of a multi select).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub domain: String,
    pub question: String,
    pub answer: String,
    pub points: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_basis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_priority: Option<ActionPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardcore: Option<bool>,
}

impl Item {
    fn for_option(block: &QuestionBlock, option: &QuestionOption) -> Self {
        Self {
            id: block.id.clone(),
            domain: block.domain.clone(),
            question: block.question.clone(),
            answer: option.text.clone(),
            points: option.points,
            next_step: option.next_step.clone(),
            risk_comment: option.risk_comment.clone(),
            legal_basis: option.legal_basis.clone(),
            action_priority: option.action_priority,
            tag: option.tag.clone(),
            hardcore: option.hardcore,
        }
    }

    fn free_text(block: &QuestionBlock, text: &str) -> Self {
        Self {
            id: block.id.clone(),
            domain: block.domain.clone(),
            question: block.question.clone(),
            answer: text.to_string(),
            points: 0,
            next_step: None,
            risk_comment: None,
            legal_basis: None,
            action_priority: None,
            tag: None,
            hardcore: None,
        }
    }
}

/// Result of resolving a submitted answer against its question.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAnswer {
    pub answer: Answer,
    pub points: i64,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("'{option}' is not an option of question {question_id}")]
    UnknownOption { question_id: String, option: String },
    #[error("question {question_id} expects {expected}")]
    UnexpectedShape {
        question_id: String,
        expected: &'static str,
    },
}

/// Resolves the points and items a response earns for `block`.
pub fn score_answer(block: &QuestionBlock, response: Answer) -> Result<ScoredAnswer, AnswerError> {
    if block.is_free_text() {
        let Answer::Text(text) = response else {
            return Err(AnswerError::UnexpectedShape {
                question_id: block.id.clone(),
                expected: "a single free text answer",
            });
        };
        let item = Item::free_text(block, &text);
        return Ok(ScoredAnswer {
            answer: Answer::Text(text),
            points: 0,
            items: vec![item],
        });
    }

    match block.kind {
        QuestionKind::MultiSelect => {
            let requested = match response {
                Answer::Choices(choices) => choices,
                Answer::Text(choice) => vec![choice],
            };

            let mut labels: Vec<String> = Vec::with_capacity(requested.len());
            let mut items = Vec::with_capacity(requested.len());
            for label in requested {
                if labels.contains(&label) {
                    continue;
                }
                let option = resolve_option(block, &label)?;
                items.push(Item::for_option(block, option));
                labels.push(label);
            }

            let points = items
                .iter()
                .fold(0_i64, |total, item| total.saturating_add(item.points));
            Ok(ScoredAnswer {
                answer: Answer::Choices(labels),
                points,
                items,
            })
        }
        _ => {
            let label = match response {
                Answer::Text(label) => label,
                Answer::Choices(mut choices) if choices.len() == 1 => choices.remove(0),
                Answer::Choices(_) => {
                    return Err(AnswerError::UnexpectedShape {
                        question_id: block.id.clone(),
                        expected: "exactly one option",
                    })
                }
            };
            let option = resolve_option(block, &label)?;
            let item = Item::for_option(block, option);
            Ok(ScoredAnswer {
                points: item.points,
                answer: Answer::Text(label),
                items: vec![item],
            })
        }
    }
}

fn resolve_option<'a>(block: &'a QuestionBlock, label: &str) -> Result<&'a QuestionOption, AnswerError> {
    block
        .option(label)
        .ok_or_else(|| AnswerError::UnknownOption {
            question_id: block.id.clone(),
            option: label.to_string(),
        })
}

/// Running score of one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainScore {
    pub name: String,
    pub score: i64,
}

/// Per-domain totals and the items behind them, in the order domains and items
/// were first recorded.
#[derive(Debug, Clone, Default)]
pub struct ScoreSheet {
    domains: Vec<DomainScore>,
    items: Vec<Item>,
}

impl ScoreSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scored answer to its domain, creating the domain on first use.
    pub fn record(&mut self, domain: &str, scored: &ScoredAnswer) {
        let position = match self.domains.iter().position(|entry| entry.name == domain) {
            Some(position) => position,
            None => {
                self.domains.push(DomainScore {
                    name: domain.to_string(),
                    score: 0,
                });
                self.domains.len() - 1
            }
        };

        let entry = &mut self.domains[position];
        entry.score = entry.score.saturating_add(scored.points);
        self.items.extend(scored.items.iter().cloned());
    }

    pub fn domains(&self) -> &[DomainScore] {
        &self.domains
    }

    pub fn domain_score(&self, domain: &str) -> Option<i64> {
        self.domains
            .iter()
            .find(|entry| entry.name == domain)
            .map(|entry| entry.score)
    }

    /// All items in accumulation order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn items_for<'a>(&'a self, domain: &'a str) -> impl Iterator<Item = &'a Item> + 'a {
        self.items.iter().filter(move |item| item.domain == domain)
    }

    pub fn total(&self) -> i64 {
        self.domains
            .iter()
            .fold(0_i64, |total, entry| total.saturating_add(entry.score))
    }

    /// Highest scoring positive items; ties keep accumulation order.
    pub fn top_items(&self, limit: usize) -> Vec<&Item> {
        let mut positive: Vec<&Item> = self.items.iter().filter(|item| item.points > 0).collect();
        positive.sort_by(|left, right| right.points.cmp(&left.points));
        positive.truncate(limit);
        positive
    }
}
