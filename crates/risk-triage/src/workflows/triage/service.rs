use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use tracing::info;

use super::answers::Answer;
use super::report::{write_items_csv, ReportPayload};
use super::repository::{RepositoryError, SessionId, SessionRecord, SessionRepository};
use super::rulebook::{Rulebook, RulebookDiagnostic};
use super::session::{Session, SessionError, SessionMetadata};

/// Service composing the shared rulebook, the session store and the access gate.
pub struct TriageService<R> {
    rulebook: Arc<Rulebook>,
    rulebook_version: String,
    repository: Arc<R>,
    access_code: Option<String>,
    // Held across fetch, submit and update so one request mutates sessions at a time.
    writes: Mutex<()>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("session-{id:06}"))
}

impl<R> TriageService<R>
where
    R: SessionRepository + 'static,
{
    pub fn new(rulebook: Arc<Rulebook>, rulebook_version: impl Into<String>, repository: Arc<R>) -> Self {
        Self {
            rulebook,
            rulebook_version: rulebook_version.into(),
            repository,
            access_code: None,
            writes: Mutex::new(()),
        }
    }

    /// Requires every request to present `code`.
    pub fn with_access_code(mut self, code: Option<String>) -> Self {
        self.access_code = code;
        self
    }

    pub fn requires_access_code(&self) -> bool {
        self.access_code.is_some()
    }

    pub fn authorize(&self, presented: Option<&str>) -> Result<(), TriageServiceError> {
        match &self.access_code {
            None => Ok(()),
            Some(expected) if presented == Some(expected.as_str()) => Ok(()),
            Some(_) => Err(TriageServiceError::Unauthorized),
        }
    }

    pub fn diagnostics(&self) -> &[RulebookDiagnostic] {
        self.rulebook.diagnostics()
    }

    /// Open a new session positioned at the entity type question.
    pub fn start(&self, metadata: SessionMetadata) -> Result<SessionRecord, TriageServiceError> {
        let record = SessionRecord {
            id: next_session_id(),
            session: Session::new(Arc::clone(&self.rulebook), metadata),
        };
        let stored = self.repository.insert(record)?;
        info!(session = %stored.id.0, "session started");
        Ok(stored)
    }

    pub fn get(&self, id: &SessionId) -> Result<SessionRecord, TriageServiceError> {
        let record = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Answer the session's current question and persist the routed state.
    pub fn answer(&self, id: &SessionId, answer: Answer) -> Result<SessionRecord, TriageServiceError> {
        let _writing = self.write_lock();
        let mut record = self.get(id)?;
        record.session.submit(answer)?;
        self.repository.update(record.clone())?;
        Ok(record)
    }

    pub fn report(
        &self,
        id: &SessionId,
        generated_at: NaiveDateTime,
    ) -> Result<ReportPayload, TriageServiceError> {
        let record = self.get(id)?;
        let payload = record.session.report(&self.rulebook_version, generated_at)?;
        Ok(payload)
    }

    /// Items of a completed session as CSV text.
    pub fn export_csv(&self, id: &SessionId) -> Result<String, TriageServiceError> {
        let record = self.get(id)?;
        if !record.session.is_complete() {
            return Err(SessionError::Incomplete.into());
        }

        let mut buffer = Vec::new();
        write_items_csv(&mut buffer, record.session.scores().items())
            .map_err(|err| TriageServiceError::Export(err.to_string()))?;
        String::from_utf8(buffer).map_err(|err| TriageServiceError::Export(err.to_string()))
    }

    /// Drop a session and everything recorded in it.
    pub fn reset(&self, id: &SessionId) -> Result<(), TriageServiceError> {
        let _writing = self.write_lock();
        self.repository.remove(id)?;
        info!(session = %id.0, "session discarded");
        Ok(())
    }

    // The guard protects no data, so a poisoned lock is still usable.
    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Error raised by the triage service.
#[derive(Debug, thiserror::Error)]
pub enum TriageServiceError {
    #[error("access code missing or invalid")]
    Unauthorized,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("failed to export items: {0}")]
    Export(String),
}
