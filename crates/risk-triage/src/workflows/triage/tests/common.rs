use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::workflows::triage::answers::Answer;
use crate::workflows::triage::repository::{
    RepositoryError, SessionId, SessionRecord, SessionRepository,
};
use crate::workflows::triage::router::ACCESS_CODE_HEADER;
use crate::workflows::triage::rulebook::Rulebook;
use crate::workflows::triage::service::TriageService;
use crate::workflows::triage::session::{Session, SessionMetadata, Transition};
use crate::workflows::triage::triage_router;

/// Small rulebook exercising routing, applicability and every question kind.
pub(super) const FIXTURE_RULEBOOK: &str = r#"
- id: x
  domain: Pricing
  question: Do members agree on prices?
  appliesTo: all
  options:
    - text: "Yes"
      points: 20
      tag: price_fixing
      action_priority: HIGH
    - text: "No"
      points: 0
  next:
    - when: {equals: {questionId: x, value: "Yes"}}
      targetId: y

- id: leagueOnly
  domain: Governance
  question: Does the league set participation rules?
  appliesTo: ["League Operator"]
  options:
    - text: "Yes"
      points: 15
    - text: "No"
      points: 0

- id: channels
  domain: Commercial
  question: Which channels do you sell through?
  kind: multiSelect
  appliesTo: all
  options:
    - text: A
      points: 10
    - text: B
      points: 30

- id: y
  domain: Pricing
  question: Are rebates coordinated?
  appliesTo: all
  options:
    - text: "Yes"
      points: 10
    - text: "No"
      points: 0

- id: notes
  domain: General
  question: Anything else?
  kind: text
  appliesTo: all
  options: []
"#;

pub(super) const CLUB: &str = "Club / Team";
pub(super) const LEAGUE: &str = "League Operator";

pub(super) fn rulebook() -> Arc<Rulebook> {
    rulebook_from(FIXTURE_RULEBOOK)
}

pub(super) fn rulebook_from(yaml: &str) -> Arc<Rulebook> {
    Arc::new(yaml.parse().expect("fixture rulebook parses"))
}

pub(super) fn metadata() -> SessionMetadata {
    SessionMetadata {
        organisation: "Northern Rovers FC".to_string(),
        completed_by: "Compliance Office".to_string(),
    }
}

pub(super) fn session() -> Session {
    Session::new(rulebook(), metadata())
}

/// Submits each answer, asserting the session was positioned on the expected question.
pub(super) fn walk(session: &mut Session, steps: &[(&str, Answer)]) -> Transition {
    let mut last = None;
    for (expected, answer) in steps {
        let current = session
            .current_question()
            .map(|block| block.id.clone())
            .expect("questionnaire still open");
        assert_eq!(current, *expected);
        last = Some(session.submit(answer.clone()).expect("answer accepted"));
    }
    last.expect("at least one step")
}

/// Club answers that avoid every route: total 40 from the multi select.
pub(super) fn club_medium_steps() -> Vec<(&'static str, Answer)> {
    vec![
        ("entityType", Answer::text(CLUB)),
        ("x", Answer::text("No")),
        ("channels", Answer::choices(["A", "B"])),
        ("y", Answer::text("No")),
        ("notes", Answer::text("Nothing further")),
    ]
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: SessionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &SessionId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn update(&self, _record: SessionRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn remove(&self, _id: &SessionId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

pub(super) fn build_service() -> TriageService<MemoryRepository> {
    TriageService::new(
        rulebook(),
        "fixture.yaml",
        Arc::new(MemoryRepository::default()),
    )
}

pub(super) fn router_with_service(service: TriageService<MemoryRepository>) -> axum::Router {
    triage_router(Arc::new(service))
}

pub(super) fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

pub(super) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) fn with_access_code(mut request: Request<Body>, code: &str) -> Request<Body> {
    request.headers_mut().insert(
        ACCESS_CODE_HEADER,
        code.parse().expect("valid header value"),
    );
    request
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf8 body")
}
