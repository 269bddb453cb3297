use super::super::answers::Answer;
use super::super::risk::{classify, RiskLevel};
use super::super::scoring::{Item, TOP_ITEM_LIMIT};
use super::super::session::Session;
use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Document renderer contract. Field names are consumed verbatim by the
/// dashboard and Word/PDF builders.
#[derive(Debug, Clone, Serialize)]
pub struct ReportPayload {
    pub organisation: String,
    pub completed_by: String,
    pub entity_type: Option<String>,
    pub generated_at: String,
    pub rulebook_version: String,
    pub overall_risk: RiskLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_risk_override: Option<String>,
    pub total_score: i64,
    pub domains: Vec<DomainSummary>,
    pub top_items: Vec<Item>,
    pub answers: AnswerAppendix,
    pub executive_summary: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainSummary {
    pub name: String,
    pub score: i64,
    pub risk: RiskLevel,
    pub risk_override: Option<String>,
    pub items: Vec<Item>,
    pub rationale: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Question text to answer, serialized as a JSON object in answer order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerAppendix(Vec<(String, Answer)>);

impl AnswerAppendix {
    /// A repeated question text keeps its first position and its latest answer.
    fn insert(&mut self, question: String, answer: Answer) {
        match self.0.iter_mut().find(|(existing, _)| *existing == question) {
            Some(entry) => entry.1 = answer,
            None => self.0.push((question, answer)),
        }
    }

    pub fn get(&self, question: &str) -> Option<&Answer> {
        self.0
            .iter()
            .find(|(existing, _)| existing == question)
            .map(|(_, answer)| answer)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Answer)> {
        self.0
            .iter()
            .map(|(question, answer)| (question.as_str(), answer))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for AnswerAppendix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (question, answer) in &self.0 {
            map.serialize_entry(question, answer)?;
        }
        map.end()
    }
}

impl ReportPayload {
    pub(crate) fn build(
        session: &Session,
        rulebook_version: &str,
        generated_at: NaiveDateTime,
    ) -> Self {
        let scores = session.scores();

        let domains = scores
            .domains()
            .iter()
            .map(|domain| {
                let items: Vec<Item> = scores.items_for(&domain.name).cloned().collect();
                let assessment = classify(domain.score, &items);
                DomainSummary {
                    name: domain.name.clone(),
                    score: domain.score,
                    risk: assessment.level,
                    risk_override: assessment.override_reason,
                    items,
                    rationale: Vec::new(),
                    next_steps: Vec::new(),
                }
            })
            .collect();

        let mut answers = AnswerAppendix::default();
        for (question_id, answer) in session.answers().iter() {
            let question = session
                .rulebook()
                .block(question_id)
                .map(|block| block.question.clone())
                .unwrap_or_else(|| question_id.to_string());
            answers.insert(question, answer.clone());
        }

        let overall = session.overall_risk();
        let metadata = session.metadata();

        Self {
            organisation: metadata.organisation.clone(),
            completed_by: metadata.completed_by.clone(),
            entity_type: session.entity_type().map(str::to_string),
            generated_at: generated_at.format(GENERATED_AT_FORMAT).to_string(),
            rulebook_version: rulebook_version.to_string(),
            overall_risk: overall.level,
            overall_risk_override: overall.override_reason,
            total_score: scores.total(),
            domains,
            top_items: scores
                .top_items(TOP_ITEM_LIMIT)
                .into_iter()
                .cloned()
                .collect(),
            answers,
            executive_summary: String::new(),
            recommendations: Vec::new(),
        }
    }
}
