//! Rule-driven competition risk questionnaire.
//!
//! A [`Rulebook`] is loaded once and shared. Each respondent drives their own
//! [`Session`]: answers are scored into per-domain totals, routing picks the
//! next applicable question, and a completed session yields the
//! [`ReportPayload`] consumed by document renderers.

pub mod answers;
pub mod predicate;
pub mod report;
pub mod repository;
pub mod risk;
pub mod router;
pub mod rulebook;
pub mod scoring;
pub mod service;
pub mod session;
pub mod traversal;

#[cfg(test)]
mod tests;

pub use answers::{Answer, AnswerSet};
pub use predicate::Predicate;
pub use report::{attention_points, write_items_csv, DomainSummary, ReportPayload};
pub use repository::{
    QuestionView, RepositoryError, SessionId, SessionRecord, SessionRepository, SessionView,
};
pub use risk::{classify, risk_bucket, RiskAssessment, RiskLevel, HARDCORE_TAGS};
pub use router::triage_router;
pub use rulebook::{
    ActionPriority, AppliesTo, QuestionBlock, QuestionKind, QuestionOption, Route, Rulebook,
    RulebookDiagnostic, RulebookError, ENTITY_TYPE_ID,
};
pub use scoring::{score_answer, AnswerError, DomainScore, Item, ScoreSheet, ScoredAnswer};
pub use service::{TriageService, TriageServiceError};
pub use session::{Session, SessionError, SessionMetadata, Transition};
pub use traversal::{applicable, next_question, visible};
