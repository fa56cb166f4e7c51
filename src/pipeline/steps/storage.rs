use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info};

use super::simulate_latency;
use crate::error::PipelineError;
use crate::pipeline::model::{CommunicationRequest, PipelineResult, RequestStatus};
use crate::pipeline::step::{PipelineStep, StepDescriptor};
use crate::repository::RequestRepository;

static DESCRIPTOR: StepDescriptor = StepDescriptor::ordered(
    "dataStorage",
    "Stores the communication request in the database",
    2,
);

pub struct DataStorageStep {
    repository: Arc<dyn RequestRepository>,
    latency: Duration,
}

impl DataStorageStep {
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(50);

    pub fn new(repository: Arc<dyn RequestRepository>) -> Self {
        Self {
            repository,
            latency: Self::DEFAULT_LATENCY,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl PipelineStep for DataStorageStep {
    fn descriptor(&self) -> &StepDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, request: CommunicationRequest) -> Result<PipelineResult, PipelineError> {
        simulate_latency(self.latency).await;

        let stored = request
            .clone()
            .update_status(RequestStatus::DataStored)
            .with_metadata("storedAt", Utc::now().timestamp_millis());

        match self.repository.save(&stored).await {
            Ok(()) => {
                info!(request_id = %stored.id, "Request stored");
                Ok(PipelineResult::success(stored))
            }
            Err(e) => {
                error!(request_id = %request.id, error = %e, "Failed to store request");
                Ok(PipelineResult::failure(request, format!("Failed to store request: {e}"))
                    .with_error(e))
            }
        }
    }
}
