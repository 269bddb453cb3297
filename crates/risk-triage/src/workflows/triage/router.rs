use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use super::answers::Answer;
use super::repository::{RepositoryError, SessionId, SessionRepository};
use super::service::{TriageService, TriageServiceError};
use super::session::{SessionError, SessionMetadata};

pub const ACCESS_CODE_HEADER: &str = "x-access-code";

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerRequest {
    pub(crate) answer: Answer,
}

/// Router builder exposing the questionnaire session endpoints.
pub fn triage_router<R>(service: Arc<TriageService<R>>) -> Router
where
    R: SessionRepository + 'static,
{
    Router::new()
        .route("/api/v1/sessions", post(start_handler::<R>))
        .route(
            "/api/v1/sessions/:session_id",
            get(session_handler::<R>).delete(reset_handler::<R>),
        )
        .route(
            "/api/v1/sessions/:session_id/answers",
            post(answer_handler::<R>),
        )
        .route(
            "/api/v1/sessions/:session_id/report",
            get(report_handler::<R>),
        )
        .route(
            "/api/v1/sessions/:session_id/report.csv",
            get(report_csv_handler::<R>),
        )
        .route("/api/v1/rulebook/diagnostics", get(diagnostics_handler::<R>))
        .with_state(service)
}

pub(crate) async fn start_handler<R>(
    State(service): State<Arc<TriageService<R>>>,
    headers: HeaderMap,
    metadata: Result<axum::Json<SessionMetadata>, JsonRejection>,
) -> Response
where
    R: SessionRepository + 'static,
{
    if let Err(err) = service.authorize(access_code(&headers)) {
        return error_response(err);
    }

    // A body without a JSON content type counts as absent metadata.
    let metadata = match metadata {
        Ok(axum::Json(metadata)) => metadata,
        Err(JsonRejection::MissingJsonContentType(_)) => SessionMetadata::default(),
        Err(rejection) => {
            let payload = json!({ "error": rejection.body_text() });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    match service.start(metadata) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn session_handler<R>(
    State(service): State<Arc<TriageService<R>>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service
        .authorize(access_code(&headers))
        .and_then(|_| service.get(&SessionId(session_id)));

    match result {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn answer_handler<R>(
    State(service): State<Arc<TriageService<R>>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<AnswerRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service
        .authorize(access_code(&headers))
        .and_then(|_| service.answer(&SessionId(session_id), request.answer));

    match result {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn report_handler<R>(
    State(service): State<Arc<TriageService<R>>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let generated_at = Local::now().naive_local();
    let result = service
        .authorize(access_code(&headers))
        .and_then(|_| service.report(&SessionId(session_id), generated_at));

    match result {
        Ok(payload) => (StatusCode::OK, axum::Json(payload)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn report_csv_handler<R>(
    State(service): State<Arc<TriageService<R>>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service
        .authorize(access_code(&headers))
        .and_then(|_| service.export_csv(&SessionId(session_id)));

    match result {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reset_handler<R>(
    State(service): State<Arc<TriageService<R>>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service
        .authorize(access_code(&headers))
        .and_then(|_| service.reset(&SessionId(session_id)));

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn diagnostics_handler<R>(
    State(service): State<Arc<TriageService<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: SessionRepository + 'static,
{
    if let Err(err) = service.authorize(access_code(&headers)) {
        return error_response(err);
    }

    let payload = json!({ "diagnostics": service.diagnostics() });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn access_code(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ACCESS_CODE_HEADER)
        .and_then(|value| value.to_str().ok())
}

fn error_response(err: TriageServiceError) -> Response {
    let status = match &err {
        TriageServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        TriageServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        TriageServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        TriageServiceError::Session(SessionError::AlreadyComplete)
        | TriageServiceError::Session(SessionError::Incomplete) => StatusCode::CONFLICT,
        TriageServiceError::Session(SessionError::Answer(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        TriageServiceError::Session(SessionError::UnknownQuestion(_))
        | TriageServiceError::Repository(RepositoryError::Unavailable(_))
        | TriageServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
