//! Configurable step wrapper
//!
//! Wraps a registered step so it receives a per-use-case configuration map
//! (as `metadata.stepConfiguration`) and an optional `key=value` gate. The
//! wrapper reports the delegate's descriptor, so callers cannot tell it apart
//! from the bare step by name.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::condition::StepCondition;
use super::model::{metadata_keys, CommunicationRequest, PipelineResult};
use super::step::{PipelineStep, StepDescriptor};
use crate::error::PipelineError;

pub struct ConfigurableStep {
    delegate: Arc<dyn PipelineStep>,
    configuration: Map<String, Value>,
    condition: Option<StepCondition>,
    raw_condition: Option<String>,
}

impl ConfigurableStep {
    pub fn new(
        delegate: Arc<dyn PipelineStep>,
        configuration: Map<String, Value>,
        condition: Option<String>,
    ) -> Self {
        Self {
            delegate,
            configuration,
            condition: condition.as_deref().map(StepCondition::parse),
            raw_condition: condition,
        }
    }

    pub fn configuration(&self) -> &Map<String, Value> {
        &self.configuration
    }

    pub fn condition(&self) -> Option<&str> {
        self.raw_condition.as_deref()
    }
}

#[async_trait]
impl PipelineStep for ConfigurableStep {
    fn descriptor(&self) -> &StepDescriptor {
        self.delegate.descriptor()
    }

    async fn execute(&self, request: CommunicationRequest) -> Result<PipelineResult, PipelineError> {
        let enhanced = request.with_metadata(
            metadata_keys::STEP_CONFIGURATION,
            Value::Object(self.configuration.clone()),
        );
        self.delegate.execute(enhanced).await
    }

    fn can_execute(&self, request: &CommunicationRequest) -> bool {
        if let Some(condition) = &self.condition {
            if !condition.matches(request) {
                debug!(
                    step = %self.name(),
                    condition = ?self.raw_condition,
                    "Condition not met"
                );
                return false;
            }
        }
        self.delegate.can_execute(request)
    }

    fn on_success(&self, request: &CommunicationRequest) {
        self.delegate.on_success(request)
    }

    fn on_failure(&self, request: &CommunicationRequest, error: &PipelineError) {
        self.delegate.on_failure(request, error)
    }
}
