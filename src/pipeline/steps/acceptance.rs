use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::simulate_latency;
use crate::error::PipelineError;
use crate::pipeline::model::{CommunicationRequest, PipelineResult, RequestStatus};
use crate::pipeline::step::{PipelineStep, StepDescriptor};

static DESCRIPTOR: StepDescriptor = StepDescriptor::ordered(
    "acceptanceRules",
    "Checks if the communication request meets acceptance criteria",
    1,
);

/// Rejects requests missing a worker, a use case or a payload.
pub struct AcceptanceRulesStep {
    latency: Duration,
}

impl AcceptanceRulesStep {
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(100);

    pub fn new() -> Self {
        Self {
            latency: Self::DEFAULT_LATENCY,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn is_accepted(request: &CommunicationRequest) -> bool {
        !request.worker_id.trim().is_empty()
            && !request.use_case.trim().is_empty()
            && !request.payload.is_empty()
    }
}

impl Default for AcceptanceRulesStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineStep for AcceptanceRulesStep {
    fn descriptor(&self) -> &StepDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, request: CommunicationRequest) -> Result<PipelineResult, PipelineError> {
        let checking = request.update_status(RequestStatus::AcceptanceRulesChecking);

        simulate_latency(self.latency).await;

        if Self::is_accepted(&checking) {
            info!(request_id = %checking.id, "Acceptance rules passed");
            Ok(PipelineResult::success(
                checking
                    .update_status(RequestStatus::AcceptanceRulesPassed)
                    .with_metadata("acceptanceRulesResult", "PASSED"),
            ))
        } else {
            warn!(request_id = %checking.id, "Acceptance rules failed");
            Ok(PipelineResult::failure(
                checking.update_status(RequestStatus::AcceptanceRulesFailed),
                "Request does not meet acceptance criteria",
            ))
        }
    }
}
