use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

use crate::clients::CommunicationProvider;
use crate::error::PipelineError;
use crate::pipeline::model::{CommunicationRequest, PipelineResult, RequestStatus};
use crate::pipeline::step::{PipelineStep, StepDescriptor};

static DESCRIPTOR: StepDescriptor = StepDescriptor::ordered(
    "communicationProvider",
    "Sends the communication request to external provider",
    5,
);

pub struct CommunicationProviderStep {
    provider: Arc<dyn CommunicationProvider>,
}

impl CommunicationProviderStep {
    pub fn new(provider: Arc<dyn CommunicationProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl PipelineStep for CommunicationProviderStep {
    fn descriptor(&self) -> &StepDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, request: CommunicationRequest) -> Result<PipelineResult, PipelineError> {
        match self.provider.send_communication(&request).await {
            Ok(response) => {
                info!(request_id = %request.id, "Communication sent to provider");
                Ok(PipelineResult::success(
                    request
                        .update_status(RequestStatus::SentToProvider)
                        .with_metadata("providerResponse", Value::Object(response))
                        .with_metadata("sentAt", Utc::now().timestamp_millis()),
                ))
            }
            Err(e) => {
                error!(request_id = %request.id, error = %e, "Failed to send communication");
                Ok(
                    PipelineResult::failure(request, format!("Failed to send communication: {e}"))
                        .with_error(PipelineError::Provider(format!("{e:#}"))),
                )
            }
        }
    }
}
