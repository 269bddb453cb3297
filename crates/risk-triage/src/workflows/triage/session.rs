use super::answers::{Answer, AnswerSet};
use super::report::{attention_points, ReportPayload};
use super::risk::{classify, RiskAssessment};
use super::rulebook::{QuestionBlock, Rulebook, ENTITY_TYPE_ID};
use super::scoring::{score_answer, AnswerError, ScoreSheet};
use super::traversal::next_question;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Who the questionnaire is being completed for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub organisation: String,
    #[serde(default)]
    pub completed_by: String,
}

/// Outcome of submitting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Next(String),
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("questionnaire is already complete")]
    AlreadyComplete,
    #[error("questionnaire is not complete yet")]
    Incomplete,
    #[error("question {0} is not defined in the rulebook")]
    UnknownQuestion(String),
    #[error(transparent)]
    Answer(#[from] AnswerError),
}

/// One respondent's walk through a rulebook.
#[derive(Debug, Clone)]
pub struct Session {
    rulebook: Arc<Rulebook>,
    metadata: SessionMetadata,
    answers: AnswerSet,
    scores: ScoreSheet,
    asked: HashSet<String>,
    current: Option<String>,
    entity_type: Option<String>,
}

impl Session {
    /// Starts at the entity type selector, which every normalized rulebook contains.
    pub fn new(rulebook: Arc<Rulebook>, metadata: SessionMetadata) -> Self {
        let current = rulebook
            .contains(ENTITY_TYPE_ID)
            .then(|| ENTITY_TYPE_ID.to_string());

        Self {
            rulebook,
            metadata,
            answers: AnswerSet::new(),
            scores: ScoreSheet::new(),
            asked: HashSet::new(),
            current,
            entity_type: None,
        }
    }

    pub fn rulebook(&self) -> &Rulebook {
        &self.rulebook
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: SessionMetadata) {
        self.metadata = metadata;
    }

    pub fn current_question(&self) -> Option<&QuestionBlock> {
        self.current
            .as_deref()
            .and_then(|id| self.rulebook.block(id))
    }

    pub fn is_complete(&self) -> bool {
        self.current.is_none()
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn scores(&self) -> &ScoreSheet {
        &self.scores
    }

    pub fn asked(&self) -> &HashSet<String> {
        &self.asked
    }

    /// Share of the rulebook answered so far, capped at 1.0.
    pub fn progress(&self) -> f32 {
        let total = self.rulebook.len().max(1) as f32;
        (self.asked.len() as f32 / total).min(1.0)
    }

    /// Scores the answer to the current question and moves to the next one.
    ///
    /// A rejected answer leaves the session untouched.
    pub fn submit(&mut self, response: Answer) -> Result<Transition, SessionError> {
        let current_id = self.current.clone().ok_or(SessionError::AlreadyComplete)?;
        let rulebook = Arc::clone(&self.rulebook);
        let block = rulebook
            .block(&current_id)
            .ok_or_else(|| SessionError::UnknownQuestion(current_id.clone()))?;

        let scored = score_answer(block, response)?;
        debug!(
            question = %block.id,
            domain = %block.domain,
            points = scored.points,
            "answer recorded"
        );

        if block.id == ENTITY_TYPE_ID {
            self.entity_type = match &scored.answer {
                Answer::Text(entity) => Some(entity.clone()),
                Answer::Choices(choices) => choices.first().cloned(),
            };
        }

        self.scores.record(&block.domain, &scored);
        self.answers.record(block.id.clone(), scored.answer);
        self.asked.insert(block.id.clone());

        self.current = next_question(
            block,
            &self.answers,
            self.entity_type.as_deref(),
            &self.asked,
            &rulebook,
        )
        .map(str::to_string);

        match &self.current {
            Some(next) => Ok(Transition::Next(next.clone())),
            None => {
                info!(
                    answered = self.asked.len(),
                    total_score = self.scores.total(),
                    "questionnaire complete"
                );
                Ok(Transition::Complete)
            }
        }
    }

    /// Discards every answer and returns to the first question.
    pub fn reset(&mut self) {
        *self = Session::new(Arc::clone(&self.rulebook), self.metadata.clone());
    }

    /// Overall risk across all domains, escalated by any hardcore item.
    pub fn overall_risk(&self) -> RiskAssessment {
        classify(self.scores.total(), self.scores.items())
    }

    pub fn domain_risk(&self, domain: &str) -> Option<RiskAssessment> {
        self.scores
            .domain_score(domain)
            .map(|score| classify(score, self.scores.items_for(domain)))
    }

    /// Named answer combinations that warrant attention.
    pub fn attention_points(&self) -> Vec<&'static str> {
        attention_points(&self.answers, self.entity_type())
    }

    /// Builds the renderer payload; only available once the questionnaire is complete.
    pub fn report(
        &self,
        rulebook_version: &str,
        generated_at: NaiveDateTime,
    ) -> Result<ReportPayload, SessionError> {
        if !self.is_complete() {
            return Err(SessionError::Incomplete);
        }
        Ok(ReportPayload::build(self, rulebook_version, generated_at))
    }
}
