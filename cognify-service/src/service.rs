use axum::{
    Router,
    extract::{Multipart, Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use uuid::Uuid;

use cognify_flow::{
    BackendClient, Coordinates, HttpBackend, ProviderSearchOutcome, ScanImage, SubmitOutcome,
    WorkflowError,
};

use crate::models::{
    AnalyzeScanResponse, FollowupRequest, FollowupResponse, NearbySearchRequest,
    ProviderSearchRequest, ProviderSearchResponse, ScanStatusResponse,
};
use crate::sessions::{ScanSession, SessionRegistry};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn conflict_error(message: &str) -> ApiError {
    (StatusCode::CONFLICT, Json(json!({ "error": message })))
}

/// Maps workflow errors onto the HTTP surface: local rejections and
/// geolocation refusals are the caller's to fix, busy stages are
/// conflicts, backend failures are gateway errors naming the stage.
fn workflow_error_response(err: &WorkflowError) -> ApiError {
    match err {
        WorkflowError::Validation(message) => bad_request_error(message),
        WorkflowError::PermissionDenied(message) | WorkflowError::Unsupported(message) => {
            bad_request_error(message)
        }
        WorkflowError::StageInFlight(_) => conflict_error(&err.to_string()),
        WorkflowError::Network { stage, message } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": message,
                "stage": stage
            })),
        ),
    }
}

fn with_session_id(error: ApiError, id: &str) -> ApiError {
    let (status, Json(mut payload)) = error;
    if let Some(fields) = payload.as_object_mut() {
        fields.insert("session_id".to_string(), json!(id));
    }
    (status, Json(payload))
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub backend: Arc<dyn BackendClient>,
}

pub fn create_app(backend_url: &str) -> Router {
    let backend: Arc<dyn BackendClient> = Arc::new(HttpBackend::new(backend_url));
    build_router(AppState {
        registry: Arc::new(SessionRegistry::new()),
        backend,
    })
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/scans", post(analyze_scan))
        .route("/scans/{session_id}", get(get_scan_status))
        .route("/scans/{session_id}/providers", post(search_providers))
        .route(
            "/scans/{session_id}/providers/nearby",
            post(search_providers_nearby),
        )
        .route("/scans/{session_id}/chat", post(followup_chat))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Tags every request with a correlation id and wraps it in a span.
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %request.method(),
        uri = %request.uri()
    );
    next.run(request).instrument(span).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Cognify Scan Analysis Service",
        "version": "1.0.0",
        "description": "MRI scan classification with explanations, provider and appointment search",
        "endpoints": {
            "POST /scans": "Submit a scan image (multipart fields: file, language)",
            "GET /scans/{session_id}": "Get session state and results",
            "POST /scans/{session_id}/providers": "Search providers at a manually entered location",
            "POST /scans/{session_id}/providers/nearby": "Search providers near reported coordinates",
            "POST /scans/{session_id}/chat": "Ask a follow-up question about the result",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn analyze_scan(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<AnalyzeScanResponse> {
    let mut image: Option<ScanImage> = None;
    let mut language: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request_error(&format!("invalid multipart payload: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("scan").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request_error(&format!("unreadable file part: {e}")))?;
                image = Some(ScanImage::new(file_name, bytes.to_vec()));
            }
            Some("language") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request_error(&format!("unreadable language part: {e}")))?;
                language = Some(value);
            }
            _ => {}
        }
    }

    let Some(image) = image else {
        return Err(bad_request_error("No file part in the request"));
    };

    info!(
        "Received scan {} ({} bytes)",
        image.file_name,
        image.bytes.len()
    );
    let session = state.registry.create(state.backend.clone());
    if let Some(language) = language {
        session.workflow.set_language(language);
    }

    match session.workflow.submit_image(image).await {
        Ok(outcome) => {
            let snapshot = session.workflow.snapshot();
            let advisory = match outcome {
                SubmitOutcome::ExplanationReady => None,
                SubmitOutcome::ExplanationUnavailable { reason } => Some(reason),
            };
            Ok(Json(AnalyzeScanResponse {
                session_id: session.id.clone(),
                state: snapshot.state,
                classification: snapshot.classification,
                segments: snapshot.segments,
                advisory,
            }))
        }
        Err(e) => {
            error!("Scan submission failed for session {}: {}", session.id, e);
            Err(with_session_id(workflow_error_response(&e), &session.id))
        }
    }
}

async fn get_scan_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<ScanStatusResponse> {
    let session = find_session(&state, &session_id)?;
    Ok(Json(ScanStatusResponse {
        session_id: session.id.clone(),
        created_at: session.created_at,
        snapshot: session.workflow.snapshot(),
    }))
}

async fn search_providers(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ProviderSearchRequest>,
) -> ApiResult<ProviderSearchResponse> {
    let session = find_session(&state, &session_id)?;
    info!(
        "Provider search for session {} at {:?}",
        session_id, request.location
    );

    match session.workflow.search_providers_at(&request.location).await {
        Ok(outcome) => Ok(Json(provider_search_response(&session, outcome))),
        Err(e) => {
            error!("Provider search failed for session {}: {}", session_id, e);
            Err(workflow_error_response(&e))
        }
    }
}

async fn search_providers_nearby(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    request: Option<Json<NearbySearchRequest>>,
) -> ApiResult<ProviderSearchResponse> {
    let session = find_session(&state, &session_id)?;
    // an absent body means the client reported no position
    if let Some(Json(request)) = request {
        if let (Some(latitude), Some(longitude)) = (request.latitude, request.longitude) {
            session.report_position(Coordinates {
                latitude,
                longitude,
            });
        }
    }
    info!("Nearby provider search for session {}", session_id);

    match session.workflow.search_providers_nearby().await {
        Ok(outcome) => Ok(Json(provider_search_response(&session, outcome))),
        Err(e) => {
            error!("Nearby search failed for session {}: {}", session_id, e);
            Err(workflow_error_response(&e))
        }
    }
}

async fn followup_chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<FollowupRequest>,
) -> ApiResult<FollowupResponse> {
    let session = find_session(&state, &session_id)?;
    if let Some(language) = request.language {
        session.workflow.set_language(language);
    }
    info!("Follow-up question for session {}", session_id);

    match session.workflow.ask_followup(&request.message).await {
        Ok(reply) => Ok(Json(FollowupResponse {
            session_id: session.id.clone(),
            reply,
        })),
        Err(e) => {
            error!("Follow-up failed for session {}: {}", session_id, e);
            Err(workflow_error_response(&e))
        }
    }
}

fn find_session(state: &AppState, session_id: &str) -> Result<Arc<ScanSession>, ApiError> {
    state
        .registry
        .get(session_id)
        .ok_or_else(|| not_found_error("Session not found", session_id))
}

/// Builds the search response for this request: a non-empty result carries
/// the fresh snapshot data, an empty one reports the informational message
/// without disturbing what the session already held.
fn provider_search_response(
    session: &ScanSession,
    outcome: ProviderSearchOutcome,
) -> ProviderSearchResponse {
    let snapshot = session.workflow.snapshot();
    match outcome {
        ProviderSearchOutcome::Found(providers) => ProviderSearchResponse {
            session_id: session.id.clone(),
            state: snapshot.state,
            providers,
            providers_found: true,
            message: None,
            appointments: snapshot.appointments,
            appointment_outcome: snapshot.appointment_outcome,
            location: snapshot.location.map(|l| l.as_str().to_string()),
        },
        ProviderSearchOutcome::NoneFound => ProviderSearchResponse {
            session_id: session.id.clone(),
            state: snapshot.state,
            providers: Vec::new(),
            providers_found: false,
            message: Some("No healthcare providers found in your area".to_string()),
            appointments: Vec::new(),
            appointment_outcome: None,
            location: snapshot.location.map(|l| l.as_str().to_string()),
        },
    }
}
