use serde::{Deserialize, Serialize};

use super::risk::RiskLevel;
use super::rulebook::{QuestionBlock, QuestionKind};
use super::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

/// Repository record pairing a session with its public identifier.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub session: Session,
}

impl SessionRecord {
    pub fn view(&self) -> SessionView {
        let session = &self.session;
        let complete = session.is_complete();
        let overall = complete.then(|| session.overall_risk());

        SessionView {
            session_id: self.id.clone(),
            organisation: session.metadata().organisation.clone(),
            completed_by: session.metadata().completed_by.clone(),
            entity_type: session.entity_type().map(str::to_string),
            status: if complete { "complete" } else { "in_progress" },
            answered: session.asked().len(),
            total_questions: session.rulebook().len(),
            progress: session.progress(),
            question: session.current_question().map(QuestionView::from_block),
            total_score: session.scores().total(),
            overall_risk: overall.as_ref().map(|assessment| assessment.level),
            overall_risk_override: overall.and_then(|assessment| assessment.override_reason),
            attention_points: if complete {
                session.attention_points()
            } else {
                Vec::new()
            },
        }
    }
}

/// Storage abstraction so the service can run against any session store.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError>;
    fn update(&self, record: SessionRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError>;
    fn remove(&self, id: &SessionId) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Question as presented to a respondent.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub domain: String,
    pub question: String,
    pub kind: QuestionKind,
    pub free_text: bool,
    pub options: Vec<String>,
}

impl QuestionView {
    pub fn from_block(block: &QuestionBlock) -> Self {
        Self {
            id: block.id.clone(),
            domain: block.domain.clone(),
            question: block.question.clone(),
            kind: block.kind,
            free_text: block.is_free_text(),
            options: block.options.iter().map(|option| option.text.clone()).collect(),
        }
    }
}

/// Session state exposed over the API.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub organisation: String,
    pub completed_by: String,
    pub entity_type: Option<String>,
    pub status: &'static str,
    pub answered: usize,
    pub total_questions: usize,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    pub total_score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_risk: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_risk_override: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attention_points: Vec<&'static str>,
}
