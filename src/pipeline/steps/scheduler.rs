use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use super::simulate_latency;
use crate::error::PipelineError;
use crate::pipeline::model::{CommunicationRequest, PipelineResult, Priority, RequestStatus};
use crate::pipeline::step::{PipelineStep, StepDescriptor};

static DESCRIPTOR: StepDescriptor = StepDescriptor::ordered(
    "scheduler",
    "Schedules the communication request for processing",
    3,
);

/// Injected configuration key overriding the simulated latency, in milliseconds.
const DELAY_KEY: &str = "delay";

pub struct SchedulerStep {
    latency: Duration,
}

impl SchedulerStep {
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(30);

    pub fn new() -> Self {
        Self {
            latency: Self::DEFAULT_LATENCY,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Earliest send time for a request of the given priority.
    pub fn scheduled_time(priority: Priority, now: DateTime<Utc>) -> DateTime<Utc> {
        match priority {
            Priority::Urgent => now,
            Priority::High => now + chrono::Duration::minutes(5),
            Priority::Normal => now + chrono::Duration::minutes(15),
            Priority::Low => now + chrono::Duration::hours(1),
        }
    }

    /// Latency for this run. A zero base latency means simulation is off, so
    /// a configured delay is validated but not slept.
    fn latency_for(&self, request: &CommunicationRequest) -> Result<Duration, PipelineError> {
        let configured = match request
            .step_configuration()
            .and_then(|config| config.get(DELAY_KEY))
        {
            None => None,
            Some(Value::Number(n)) => Some(n.as_u64().map(Duration::from_millis).ok_or_else(
                || PipelineError::InvalidConfiguration {
                    step: DESCRIPTOR.name.to_string(),
                    message: format!("'{DELAY_KEY}' must be a non-negative integer, got {n}"),
                },
            )?),
            Some(other) => {
                return Err(PipelineError::InvalidConfiguration {
                    step: DESCRIPTOR.name.to_string(),
                    message: format!("'{DELAY_KEY}' must be a number, got {other}"),
                });
            }
        };

        if self.latency.is_zero() {
            return Ok(Duration::ZERO);
        }
        Ok(configured.unwrap_or(self.latency))
    }
}

impl Default for SchedulerStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineStep for SchedulerStep {
    fn descriptor(&self) -> &StepDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, request: CommunicationRequest) -> Result<PipelineResult, PipelineError> {
        simulate_latency(self.latency_for(&request)?).await;

        let scheduled_time = Self::scheduled_time(request.priority, Utc::now());
        info!(request_id = %request.id, scheduled_time = %scheduled_time, "Request scheduled");

        let priority = request.priority;
        Ok(PipelineResult::success(
            request
                .update_status(RequestStatus::Scheduled)
                .with_metadata("scheduledTime", scheduled_time.to_rfc3339())
                .with_metadata("priority", priority.as_str()),
        ))
    }
}
