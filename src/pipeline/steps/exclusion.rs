use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::simulate_latency;
use crate::error::PipelineError;
use crate::pipeline::model::{CommunicationRequest, PipelineResult, RequestStatus};
use crate::pipeline::step::{PipelineStep, StepDescriptor};

static DESCRIPTOR: StepDescriptor = StepDescriptor::ordered(
    "exclusionRules",
    "Checks if the communication request should be excluded",
    4,
);

/// Metadata key holding minutes since the worker was last contacted.
pub const LAST_COMMUNICATION_KEY: &str = "lastCommunicationMinutesAgo";

/// Who must not be contacted right now.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    pub blocked_workers: HashSet<String>,
    pub disabled_use_cases: HashSet<String>,
    /// A worker contacted less than this many minutes ago is excluded.
    pub recent_contact_minutes: i64,
}

impl ExclusionRules {
    pub fn new<W, U>(blocked_workers: W, disabled_use_cases: U) -> Self
    where
        W: IntoIterator,
        W::Item: Into<String>,
        U: IntoIterator,
        U::Item: Into<String>,
    {
        Self {
            blocked_workers: blocked_workers.into_iter().map(Into::into).collect(),
            disabled_use_cases: disabled_use_cases.into_iter().map(Into::into).collect(),
            recent_contact_minutes: 60,
        }
    }

    /// Reason the request is excluded, if it is.
    pub fn exclusion_reason(&self, request: &CommunicationRequest) -> Option<&'static str> {
        if self.blocked_workers.contains(&request.worker_id) {
            return Some("worker is on the do-not-contact list");
        }
        if self.disabled_use_cases.contains(&request.use_case) {
            return Some("use case is disabled");
        }
        // A value that is not a whole number of minutes counts as just contacted.
        let recently_contacted = request
            .metadata
            .get(LAST_COMMUNICATION_KEY)
            .filter(|value| !value.is_null())
            .map(|value| value.as_i64().unwrap_or(0))
            .is_some_and(|minutes| minutes < self.recent_contact_minutes);
        if recently_contacted {
            return Some("worker was contacted recently");
        }
        None
    }
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self::new(["blocked-worker-1", "blocked-worker-2"], ["disabled-case-1"])
    }
}

pub struct ExclusionRulesStep {
    rules: ExclusionRules,
    latency: Duration,
}

impl ExclusionRulesStep {
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(80);

    pub fn new(rules: ExclusionRules) -> Self {
        Self {
            rules,
            latency: Self::DEFAULT_LATENCY,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl PipelineStep for ExclusionRulesStep {
    fn descriptor(&self) -> &StepDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, request: CommunicationRequest) -> Result<PipelineResult, PipelineError> {
        let checking = request.update_status(RequestStatus::ExclusionRulesChecking);

        simulate_latency(self.latency).await;

        match self.rules.exclusion_reason(&checking) {
            None => {
                info!(request_id = %checking.id, "Exclusion rules passed");
                Ok(PipelineResult::success(
                    checking
                        .update_status(RequestStatus::ExclusionRulesPassed)
                        .with_metadata("exclusionRulesResult", "PASSED"),
                ))
            }
            Some(reason) => {
                warn!(request_id = %checking.id, reason = %reason, "Request excluded");
                Ok(PipelineResult::failure(
                    checking
                        .update_status(RequestStatus::ExclusionRulesFailed)
                        .with_metadata("exclusionReason", reason),
                    "Request excluded by exclusion rules",
                ))
            }
        }
    }
}
