//! Data model flowing through the pipeline
//!
//! - `CommunicationRequest`: the unit of work every step receives and returns
//! - `PipelineResult`: continue / stop / fail outcome of a step or a whole run
//! - `UseCasePipelineConfig` / `PipelineStepConfig`: stored per-use-case step lists

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::PipelineError;

/// Well-known metadata keys shared between steps.
pub mod metadata_keys {
    /// Array of `"<rfc3339>: <STATUS>"` entries, appended on every status change.
    pub const STATUS_HISTORY: &str = "statusHistory";
    /// Object injected by a configurable step wrapper before delegating.
    pub const STEP_CONFIGURATION: &str = "stepConfiguration";
}

// ═══════════════════════════════════════════════════════════════════════════
// Enumerations
// ═══════════════════════════════════════════════════════════════════════════

/// Channel used to reach the worker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CommunicationType {
    #[serde(rename = "CALL")]
    Call,
    #[serde(rename = "SMS")]
    Sms,
    #[serde(rename = "EMAIL")]
    Email,
    #[serde(rename = "PUSH", alias = "PUSH_NOTIFICATION")]
    Push,
}

impl CommunicationType {
    pub const ALL: [CommunicationType; 4] = [
        CommunicationType::Call,
        CommunicationType::Sms,
        CommunicationType::Email,
        CommunicationType::Push,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationType::Call => "CALL",
            CommunicationType::Sms => "SMS",
            CommunicationType::Email => "EMAIL",
            CommunicationType::Push => "PUSH",
        }
    }
}

impl fmt::Display for CommunicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a request.
///
/// Transitions are driven by the steps themselves; the executor only forces
/// `Failed` on a step failure and `Completed` after a full traversal. Out of
/// order transitions are recorded, not rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[default]
    Received,
    AcceptanceRulesChecking,
    AcceptanceRulesPassed,
    AcceptanceRulesFailed,
    DataStored,
    Scheduled,
    ExclusionRulesChecking,
    ExclusionRulesPassed,
    ExclusionRulesFailed,
    SentToProvider,
    ProviderResponseReceived,
    Completed,
    Failed,
    /// Not produced by the shipped steps; available to custom steps.
    RetryScheduled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Received => "RECEIVED",
            RequestStatus::AcceptanceRulesChecking => "ACCEPTANCE_RULES_CHECKING",
            RequestStatus::AcceptanceRulesPassed => "ACCEPTANCE_RULES_PASSED",
            RequestStatus::AcceptanceRulesFailed => "ACCEPTANCE_RULES_FAILED",
            RequestStatus::DataStored => "DATA_STORED",
            RequestStatus::Scheduled => "SCHEDULED",
            RequestStatus::ExclusionRulesChecking => "EXCLUSION_RULES_CHECKING",
            RequestStatus::ExclusionRulesPassed => "EXCLUSION_RULES_PASSED",
            RequestStatus::ExclusionRulesFailed => "EXCLUSION_RULES_FAILED",
            RequestStatus::SentToProvider => "SENT_TO_PROVIDER",
            RequestStatus::ProviderResponseReceived => "PROVIDER_RESPONSE_RECEIVED",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Failed => "FAILED",
            RequestStatus::RetryScheduled => "RETRY_SCHEDULED",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Communication Request
// ═══════════════════════════════════════════════════════════════════════════

/// A communication destined for a worker, mutated by each step it passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationRequest {
    #[serde(default = "new_request_id")]
    pub id: String,

    pub worker_id: String,

    pub communication_type: CommunicationType,

    #[serde(default)]
    pub payload: Map<String, Value>,

    /// Key used to resolve the step list for this request.
    #[serde(default)]
    pub use_case: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub status: RequestStatus,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    /// Audit trail and step-to-step side channel (see [`metadata_keys`]).
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl CommunicationRequest {
    /// Create a request in `RECEIVED` status with `NORMAL` priority.
    pub fn new(
        worker_id: impl Into<String>,
        communication_type: CommunicationType,
        payload: Map<String, Value>,
        use_case: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_request_id(),
            worker_id: worker_id.into(),
            communication_type,
            payload,
            use_case: use_case.into(),
            priority: Priority::Normal,
            status: RequestStatus::Received,
            created_at: now,
            updated_at: now,
            metadata: Map::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Move to `status`, refreshing `updated_at` and appending to the status history.
    pub fn update_status(mut self, status: RequestStatus) -> Self {
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;

        let entry = Value::String(format!("{}: {}", now.to_rfc3339(), status));
        let history = self
            .metadata
            .entry(metadata_keys::STATUS_HISTORY)
            .or_insert_with(|| Value::Array(Vec::new()));
        match history {
            Value::Array(entries) => entries.push(entry),
            other => *other = Value::Array(vec![entry]),
        }
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Status history entries in the order they were recorded.
    pub fn status_history(&self) -> Vec<&str> {
        self.metadata
            .get(metadata_keys::STATUS_HISTORY)
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Configuration injected by a configurable step wrapper, if any.
    pub fn step_configuration(&self) -> Option<&Map<String, Value>> {
        self.metadata
            .get(metadata_keys::STEP_CONFIGURATION)
            .and_then(Value::as_object)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Pipeline Result
// ═══════════════════════════════════════════════════════════════════════════

/// Outcome of a single step or of a whole pipeline run.
///
/// Three shapes are meaningful: success-and-continue, success-and-stop
/// (ends the run early without failing it) and failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub success: bool,
    pub request: CommunicationRequest,
    pub message: String,
    pub should_continue: bool,
    #[serde(
        serialize_with = "serialize_error",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<Arc<PipelineError>>,
}

fn serialize_error<S>(error: &Option<Arc<PipelineError>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl PipelineResult {
    /// Success; the executor moves on to the next step.
    pub fn success(request: CommunicationRequest) -> Self {
        Self {
            success: true,
            request,
            message: String::new(),
            should_continue: true,
            error: None,
        }
    }

    /// Success that ends the run here.
    pub fn stop(request: CommunicationRequest, message: impl Into<String>) -> Self {
        Self {
            success: true,
            request,
            message: message.into(),
            should_continue: false,
            error: None,
        }
    }

    pub fn failure(request: CommunicationRequest, message: impl Into<String>) -> Self {
        Self {
            success: false,
            request,
            message: message.into(),
            should_continue: false,
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_error(mut self, error: PipelineError) -> Self {
        self.error = Some(Arc::new(error));
        self
    }

    pub(crate) fn with_shared_error(mut self, error: Option<Arc<PipelineError>>) -> Self {
        self.error = error;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Use Case Configuration
// ═══════════════════════════════════════════════════════════════════════════

/// One entry of a use-case step list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStepConfig {
    /// Must match a registered step name; unknown names are dropped at resolution.
    pub step_name: String,

    /// Ascending execution order; ties keep their listed order.
    pub order: i32,

    #[serde(default = "default_true", alias = "isEnabled")]
    pub enabled: bool,

    /// `key=value` gate, see [`StepCondition`](crate::pipeline::StepCondition).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Injected as `metadata.stepConfiguration` when the step runs.
    #[serde(default)]
    pub configuration: Map<String, Value>,
}

impl PipelineStepConfig {
    pub fn new(step_name: impl Into<String>, order: i32) -> Self {
        Self {
            step_name: step_name.into(),
            order,
            enabled: true,
            condition: None,
            configuration: Map::new(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_configuration(mut self, configuration: Map<String, Value>) -> Self {
        self.configuration = configuration;
        self
    }

    /// Whether the step must be wrapped to receive configuration or a gate.
    pub fn needs_wrapper(&self) -> bool {
        !self.configuration.is_empty() || self.condition.is_some()
    }
}

/// Step list, order, parameters and gates for one named use case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseCasePipelineConfig {
    #[serde(default = "new_request_id")]
    pub id: String,

    pub use_case: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_true", alias = "isActive")]
    pub active: bool,

    #[serde(default)]
    pub steps: Vec<PipelineStepConfig>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl UseCasePipelineConfig {
    pub fn new(
        use_case: impl Into<String>,
        description: impl Into<String>,
        steps: Vec<PipelineStepConfig>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_request_id(),
            use_case: use_case.into(),
            description: description.into(),
            active: true,
            steps,
            created_at: now,
            updated_at: now,
        }
    }
}

fn default_true() -> bool {
    true
}
