//! Request and response bodies for the HTTP API
//!
//! Pipeline domain types (`CommunicationRequest`, `PipelineResult`,
//! `UseCasePipelineConfig`) are served as-is; this module holds the
//! API-only shapes around them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pipeline::{
    CommunicationRequest, CommunicationType, PipelineResult, PipelineStepConfig, Priority,
};

// ═══════════════════════════════════════════════════════════════════════════
// Communication Types
// ═══════════════════════════════════════════════════════════════════════════

/// Request body for POST /api/communications
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommunicationRequest {
    pub worker_id: String,
    pub communication_type: CommunicationType,
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub use_case: String,
    #[serde(default)]
    pub priority: Priority,
}

impl CreateCommunicationRequest {
    pub fn into_request(self) -> CommunicationRequest {
        CommunicationRequest::new(
            self.worker_id,
            self.communication_type,
            self.payload,
            self.use_case,
        )
        .with_priority(self.priority)
    }
}

/// Query for POST /api/communications/:id/reprocess
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprocessQuery {
    /// Step to restart from; absent or unknown restarts from the first step.
    #[serde(default)]
    pub step_name: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Pipeline Config Types
// ═══════════════════════════════════════════════════════════════════════════

/// Request body for POST /api/pipeline-config
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipelineConfigRequest {
    pub use_case: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<PipelineStepConfig>,
}

/// Request body for PUT /api/pipeline-config/:useCase; absent fields are kept.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePipelineConfigRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<PipelineStepConfig>>,
    #[serde(default, alias = "isActive")]
    pub active: Option<bool>,
}

/// A step as reported by /api/steps and /api/pipeline-config/:useCase/steps
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInfo {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    /// Wrapped with use-case configuration or a condition.
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Demo Types
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoScenario {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub use_case: &'static str,
    pub priority: Priority,
    pub communication_type: CommunicationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<&'static str>,
    pub expected_steps: Vec<&'static str>,
    pub estimated_time: &'static str,
    /// `SUCCESS` or `FAILED`
    pub expected_result: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoResult {
    pub scenario: DemoScenario,
    /// The request as submitted, before any step ran.
    pub request: CommunicationRequest,
    pub result: PipelineResult,
    pub actual_duration: String,
    pub executed_steps: Vec<String>,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDemoResult {
    pub total_scenarios: usize,
    pub successful_scenarios: usize,
    pub failed_scenarios: usize,
    pub total_duration: String,
    pub results: Vec<DemoResult>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Error Types
// ═══════════════════════════════════════════════════════════════════════════

/// Error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            available: None,
        }
    }

    pub fn with_available(mut self, available: Vec<String>) -> Self {
        self.available = Some(available);
        self
    }
}
