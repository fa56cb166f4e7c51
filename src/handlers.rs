//! HTTP request handlers
//!
//! - /api/communications: submit, inspect and reprocess requests
//! - /api/pipeline-config: manage use-case step lists at runtime
//! - /api/steps: registered steps
//! - /api/demo: canned scenarios and the live reconfiguration demo

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::AppState;
use crate::demo;
use crate::error::PipelineError;
use crate::pipeline::{
    CommunicationRequest, PipelineResult, PipelineStep, StepResolution, UseCasePipelineConfig,
};
use crate::types::*;

/// Build the application router with CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Communications
        .route(
            "/api/communications",
            post(create_communication_handler).get(list_communications_handler),
        )
        .route(
            "/api/communications/:id",
            get(get_communication_handler).delete(delete_communication_handler),
        )
        .route("/api/communications/:id/reprocess", post(reprocess_handler))
        // Pipeline configuration
        .route(
            "/api/pipeline-config",
            get(list_configs_handler).post(create_config_handler),
        )
        .route(
            "/api/pipeline-config/:use_case",
            get(get_config_handler)
                .put(update_config_handler)
                .delete(delete_config_handler),
        )
        .route("/api/pipeline-config/:use_case/steps", get(resolved_steps_handler))
        // Steps
        .route("/api/steps", get(list_steps_handler))
        .route("/api/steps/:name", get(get_step_handler))
        // Demo
        .route("/api/demo/scenarios", get(demo_scenarios_handler))
        .route("/api/demo/run/:scenario_id", post(run_demo_handler))
        .route("/api/demo/batch", post(batch_demo_handler))
        .route("/api/demo/live/setup", post(live_setup_handler))
        .route("/api/demo/live/modify", post(live_modify_handler))
        .route("/api/demo/live/restore", post(live_restore_handler))
        .route("/api/demo/live/status", get(live_status_handler))
        // Health check
        .route("/healthz", get(health_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(status: StatusCode, error: ErrorResponse) -> (StatusCode, Json<Value>) {
    (status, Json(json!(error)))
}

fn storage_failure(e: PipelineError) -> (StatusCode, Json<Value>) {
    error!(error = %e, "Request store failed");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::new(e.to_string()),
    )
}

/// 200 for a successful run, 400 otherwise; the body is the result either way.
fn pipeline_response(result: PipelineResult) -> (StatusCode, Json<Value>) {
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(json!(result)))
}

// ═══════════════════════════════════════════════════════════════════════════
// Communications
// ═══════════════════════════════════════════════════════════════════════════

/// POST /api/communications
pub async fn create_communication_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateCommunicationRequest>,
) -> impl IntoResponse {
    let result = state.service.process(body.into_request()).await;
    pipeline_response(result)
}

/// GET /api/communications
pub async fn list_communications_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.requests.find_all().await {
        Ok(requests) => (StatusCode::OK, Json(json!(requests))),
        Err(e) => storage_failure(e),
    }
}

/// GET /api/communications/:id
pub async fn get_communication_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.requests.find_by_id(&id).await {
        Ok(Some(request)) => (StatusCode::OK, Json(json!(request))),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("Communication request '{id}' not found")),
        ),
        Err(e) => storage_failure(e),
    }
}

/// DELETE /api/communications/:id
pub async fn delete_communication_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.requests.delete_by_id(&id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("Communication request '{id}' not found")),
        )
        .into_response(),
        Err(e) => storage_failure(e).into_response(),
    }
}

/// POST /api/communications/:id/reprocess?stepName=X
///
/// Reprocesses the request in the body, or the stored one when no body is sent.
/// A body that is not a valid request is a 400.
pub async fn reprocess_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ReprocessQuery>,
    body: Bytes,
) -> impl IntoResponse {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<CommunicationRequest>(&body) {
            Ok(request) => Some(request),
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new(format!("Invalid communication request: {e}")),
                );
            }
        }
    };

    let request = match body {
        Some(mut request) => {
            request.id = id;
            request
        }
        None => match state.requests.find_by_id(&id).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                return error_response(
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new(format!("Communication request '{id}' not found")),
                );
            }
            Err(e) => return storage_failure(e),
        },
    };

    let step_name = query.step_name.unwrap_or_default();
    let result = state.service.reprocess_from_step(request, &step_name).await;
    pipeline_response(result)
}

// ═══════════════════════════════════════════════════════════════════════════
// Pipeline Configuration
// ═══════════════════════════════════════════════════════════════════════════

fn config_not_found(use_case: &str) -> (StatusCode, Json<Value>) {
    error_response(
        StatusCode::NOT_FOUND,
        ErrorResponse::new(format!("No active pipeline configuration for '{use_case}'")),
    )
}

/// GET /api/pipeline-config
pub async fn list_configs_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!(state.configs.find_all())))
}

/// GET /api/pipeline-config/:useCase
pub async fn get_config_handler(
    State(state): State<AppState>,
    Path(use_case): Path<String>,
) -> impl IntoResponse {
    match state.configs.find_by_use_case(&use_case) {
        Some(config) => (StatusCode::OK, Json(json!(config))),
        None => config_not_found(&use_case),
    }
}

/// POST /api/pipeline-config
///
/// 409 when the use case already has an active configuration.
pub async fn create_config_handler(
    State(state): State<AppState>,
    Json(body): Json<CreatePipelineConfigRequest>,
) -> impl IntoResponse {
    if body.use_case.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("useCase must not be blank"),
        );
    }
    if state.configs.find_by_use_case(&body.use_case).is_some() {
        return error_response(
            StatusCode::CONFLICT,
            ErrorResponse::new(format!(
                "Pipeline configuration for '{}' already exists",
                body.use_case
            )),
        );
    }

    let saved = state.configs.save(UseCasePipelineConfig::new(
        body.use_case,
        body.description,
        body.steps,
    ));
    (StatusCode::CREATED, Json(json!(saved)))
}

/// PUT /api/pipeline-config/:useCase
pub async fn update_config_handler(
    State(state): State<AppState>,
    Path(use_case): Path<String>,
    Json(body): Json<UpdatePipelineConfigRequest>,
) -> impl IntoResponse {
    let Some(mut config) = state.configs.find_by_use_case(&use_case) else {
        return config_not_found(&use_case);
    };

    if let Some(description) = body.description {
        config.description = description;
    }
    if let Some(steps) = body.steps {
        config.steps = steps;
    }
    if let Some(active) = body.active {
        config.active = active;
    }

    let saved = state.configs.save(config);
    (StatusCode::OK, Json(json!(saved)))
}

/// DELETE /api/pipeline-config/:useCase
pub async fn delete_config_handler(
    State(state): State<AppState>,
    Path(use_case): Path<String>,
) -> Response {
    if state.configs.delete_by_use_case(&use_case) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        config_not_found(&use_case).into_response()
    }
}

/// GET /api/pipeline-config/:useCase/steps
///
/// The step list a request with this use case would run, in order.
pub async fn resolved_steps_handler(
    State(state): State<AppState>,
    Path(use_case): Path<String>,
) -> impl IntoResponse {
    let config = state.configs.find_by_use_case(&use_case);
    // Entries only shape the run when the executor resolves by use case.
    let applied = config
        .as_ref()
        .filter(|_| state.executor.resolution() == StepResolution::UseCase);
    let steps: Vec<StepInfo> = state
        .executor
        .resolve_steps_for_use_case(&use_case)
        .iter()
        .map(|step| {
            let entry = applied.and_then(|c| {
                c.steps
                    .iter()
                    .find(|s| s.enabled && s.step_name == step.name())
            });
            StepInfo {
                name: step.name().to_string(),
                description: step.description().to_string(),
                order: entry.map(|e| e.order).or(step.descriptor().order),
                configured: entry.is_some_and(|e| e.needs_wrapper()),
                condition: entry.and_then(|e| e.condition.clone()),
            }
        })
        .collect();

    let source = if applied.is_some() {
        "configuration"
    } else {
        "default"
    };

    (
        StatusCode::OK,
        Json(json!({
            "useCase": use_case,
            "source": source,
            "steps": steps
        })),
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// Steps
// ═══════════════════════════════════════════════════════════════════════════

fn step_info(step: &dyn PipelineStep) -> StepInfo {
    StepInfo {
        name: step.name().to_string(),
        description: step.description().to_string(),
        order: step.descriptor().order,
        configured: false,
        condition: None,
    }
}

/// GET /api/steps
pub async fn list_steps_handler(State(state): State<AppState>) -> impl IntoResponse {
    let steps: Vec<StepInfo> = state
        .registry
        .ordered_steps()
        .iter()
        .map(|s| step_info(&**s))
        .collect();
    (StatusCode::OK, Json(json!(steps)))
}

/// GET /api/steps/:name
pub async fn get_step_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.registry.step(&name) {
        Some(step) => (StatusCode::OK, Json(json!(step_info(&*step)))),
        None => error_response(
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("Unknown step: {name}"))
                .with_available(state.registry.available_step_names()),
        ),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Demo
// ═══════════════════════════════════════════════════════════════════════════

/// GET /api/demo/scenarios
pub async fn demo_scenarios_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!(demo::scenarios())))
}

/// POST /api/demo/run/:scenarioId
pub async fn run_demo_handler(
    State(state): State<AppState>,
    Path(scenario_id): Path<String>,
) -> impl IntoResponse {
    let Some(scenario) = demo::scenario(&scenario_id) else {
        let available = demo::scenarios().iter().map(|s| s.id.to_string()).collect();
        return error_response(
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("Unknown scenario: {scenario_id}")).with_available(available),
        );
    };

    let result = demo::run_scenario(&state.service, scenario).await;
    (StatusCode::OK, Json(json!(result)))
}

/// POST /api/demo/batch
pub async fn batch_demo_handler(State(state): State<AppState>) -> impl IntoResponse {
    let result = demo::run_batch(&state.service).await;
    (StatusCode::OK, Json(json!(result)))
}

fn live_summary(config: &UseCasePipelineConfig) -> Value {
    json!({
        "useCase": config.use_case,
        "configId": config.id,
        "description": config.description,
        "steps": config
            .steps
            .iter()
            .map(|s| format!("{} (order: {})", s.step_name, s.order))
            .collect::<Vec<_>>(),
        "totalSteps": config.steps.len(),
    })
}

fn live_missing() -> (StatusCode, Json<Value>) {
    error_response(
        StatusCode::BAD_REQUEST,
        ErrorResponse::new("Live demo configuration not found. Run setup first."),
    )
}

/// POST /api/demo/live/setup
pub async fn live_setup_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = demo::setup_live(state.configs.as_ref());
    (StatusCode::OK, Json(live_summary(&config)))
}

/// POST /api/demo/live/modify
pub async fn live_modify_handler(State(state): State<AppState>) -> impl IntoResponse {
    match demo::modify_live(state.configs.as_ref()) {
        Some(config) => (StatusCode::OK, Json(live_summary(&config))),
        None => live_missing(),
    }
}

/// POST /api/demo/live/restore
pub async fn live_restore_handler(State(state): State<AppState>) -> impl IntoResponse {
    match demo::restore_live(state.configs.as_ref()) {
        Some(config) => (StatusCode::OK, Json(live_summary(&config))),
        None => live_missing(),
    }
}

/// GET /api/demo/live/status
pub async fn live_status_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.configs.find_by_use_case(demo::LIVE_USE_CASE) {
        Some(config) => (
            StatusCode::OK,
            Json(json!({
                "exists": true,
                "useCase": config.use_case,
                "configId": config.id,
                "description": config.description,
                "steps": config.steps,
                "lastUpdated": config.updated_at.to_rfc3339(),
            })),
        ),
        None => (
            StatusCode::OK,
            Json(json!({
                "exists": false,
                "message": "Live demo configuration not found. Run setup first."
            })),
        ),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Health Check
// ═══════════════════════════════════════════════════════════════════════════

/// GET /healthz
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "steps": state.registry.available_step_names().len(),
            "stepResolution": state.executor.resolution().to_string(),
        })),
    )
}
