//! Communication service - entry point for processing requests
//!
//! Runs the executor and, for requests already held by the request store,
//! writes the terminal state back so stored records match the run outcome.

use std::sync::Arc;

use tracing::{info, warn};

use crate::pipeline::{CommunicationRequest, PipelineExecutor, PipelineResult};
use crate::repository::RequestRepository;

#[derive(Clone)]
pub struct CommunicationService {
    executor: Arc<PipelineExecutor>,
    requests: Arc<dyn RequestRepository>,
}

impl CommunicationService {
    pub fn new(executor: Arc<PipelineExecutor>, requests: Arc<dyn RequestRepository>) -> Self {
        Self { executor, requests }
    }

    pub fn executor(&self) -> &Arc<PipelineExecutor> {
        &self.executor
    }

    /// Run the full pipeline for `request`.
    pub async fn process(&self, request: CommunicationRequest) -> PipelineResult {
        info!(
            request_id = %request.id,
            worker_id = %request.worker_id,
            use_case = %request.use_case,
            "Processing communication request"
        );
        let result = self.executor.execute(request).await;
        self.write_back(&result).await;
        result
    }

    /// Run the pipeline for `request` starting at `step_name`.
    pub async fn reprocess_from_step(
        &self,
        request: CommunicationRequest,
        step_name: &str,
    ) -> PipelineResult {
        info!(
            request_id = %request.id,
            step = %step_name,
            "Reprocessing communication request"
        );
        let result = self.executor.execute_from_step(request, step_name).await;
        self.write_back(&result).await;
        result
    }

    async fn write_back(&self, result: &PipelineResult) {
        let id = &result.request.id;
        match self.requests.find_by_id(id).await {
            Ok(Some(_)) => {
                if let Err(e) = self.requests.save(&result.request).await {
                    warn!(request_id = %id, error = %e, "Failed to persist final request state");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(request_id = %id, error = %e, "Failed to look up stored request"),
        }
    }
}
