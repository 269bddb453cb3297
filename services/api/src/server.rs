use crate::cli::ServeArgs;
use crate::infra::{load_rulebook, AppState, InMemorySessionRepository};
use crate::routes::with_triage_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use risk_triage::config::AppConfig;
use risk_triage::error::AppError;
use risk_triage::telemetry;
use risk_triage::workflows::triage::TriageService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(rulebook) = args.rulebook.take() {
        config.questionnaire.rulebook_path = rulebook;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let rulebook = load_rulebook(&config.questionnaire.rulebook_path)?;
    let repository = Arc::new(InMemorySessionRepository::default());
    let triage_service = Arc::new(
        TriageService::new(rulebook, config.questionnaire.rulebook_version(), repository)
            .with_access_code(config.questionnaire.access_code.clone()),
    );

    let app = with_triage_routes(triage_service.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        access_code = triage_service.requires_access_code(),
        "risk triage service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
