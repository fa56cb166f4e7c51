//! The step abstraction every pipeline stage implements.

use std::borrow::Cow;

use async_trait::async_trait;

use super::model::{CommunicationRequest, PipelineResult};
use crate::error::PipelineError;

/// Static identity of a step: name, description and default position.
///
/// `order` drives the default ordering used when a use case has no stored
/// configuration. Steps without one sort after every step that has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
    pub name: Cow<'static, str>,
    pub description: Cow<'static, str>,
    pub order: Option<i32>,
}

impl StepDescriptor {
    /// Descriptor usable in a `static`.
    pub const fn ordered(name: &'static str, description: &'static str, order: i32) -> Self {
        Self {
            name: Cow::Borrowed(name),
            description: Cow::Borrowed(description),
            order: Some(order),
        }
    }

    /// Descriptor without a default order.
    pub fn new(name: impl Into<Cow<'static, str>>, description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            order: None,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }
}

/// One unit of pipeline work.
///
/// The executor consults [`can_execute`](Self::can_execute) before calling
/// [`execute`](Self::execute) and fires exactly one of the hooks afterwards.
/// A business rejection is an `Ok` result with `success == false`; `Err` is
/// reserved for unexpected faults.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    fn descriptor(&self) -> &StepDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    fn description(&self) -> &str {
        &self.descriptor().description
    }

    async fn execute(&self, request: CommunicationRequest) -> Result<PipelineResult, PipelineError>;

    fn can_execute(&self, _request: &CommunicationRequest) -> bool {
        true
    }

    fn on_success(&self, _request: &CommunicationRequest) {}

    fn on_failure(&self, _request: &CommunicationRequest, _error: &PipelineError) {}
}
