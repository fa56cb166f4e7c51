//! Pipeline executor
//!
//! Runs the resolved step list against a request, threading each step's
//! output request into the next. Every outcome, including step faults, comes
//! back as a [`PipelineResult`]; nothing is raised past this boundary.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, error, info, info_span, Instrument};

use super::model::{CommunicationRequest, PipelineResult, RequestStatus};
use super::registry::StepRegistry;
use super::step::PipelineStep;
use crate::error::PipelineError;

/// Which step list the executor asks the registry for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepResolution {
    /// Resolve by `request.use_case`, falling back to the default ordering.
    #[default]
    UseCase,
    /// Always use the default ordering, ignoring stored configurations.
    Default,
}

impl FromStr for StepResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "use-case" | "use_case" | "usecase" => Ok(StepResolution::UseCase),
            "default" => Ok(StepResolution::Default),
            other => Err(format!("unknown step resolution '{other}'")),
        }
    }
}

impl fmt::Display for StepResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepResolution::UseCase => write!(f, "use-case"),
            StepResolution::Default => write!(f, "default"),
        }
    }
}

pub struct PipelineExecutor {
    registry: Arc<StepRegistry>,
    resolution: StepResolution,
}

impl PipelineExecutor {
    pub fn new(registry: Arc<StepRegistry>) -> Self {
        Self {
            registry,
            resolution: StepResolution::default(),
        }
    }

    pub fn with_resolution(mut self, resolution: StepResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn resolution(&self) -> StepResolution {
        self.resolution
    }

    pub fn registry(&self) -> &Arc<StepRegistry> {
        &self.registry
    }

    /// Run every resolved step from the start.
    pub async fn execute(&self, request: CommunicationRequest) -> PipelineResult {
        self.execute_from_step(request, "").await
    }

    /// Run the resolved steps starting at `from_step`.
    ///
    /// A blank or unknown `from_step` starts at the first step.
    pub async fn execute_from_step(
        &self,
        request: CommunicationRequest,
        from_step: &str,
    ) -> PipelineResult {
        let span = info_span!(
            "pipeline",
            request_id = %request.id,
            worker_id = %request.worker_id,
            use_case = %request.use_case,
        );
        self.run(request, from_step).instrument(span).await
    }

    /// Step list for `request` according to the configured resolution mode.
    pub fn resolve_steps(&self, request: &CommunicationRequest) -> Vec<Arc<dyn PipelineStep>> {
        self.resolve_steps_for_use_case(&request.use_case)
    }

    pub fn resolve_steps_for_use_case(&self, use_case: &str) -> Vec<Arc<dyn PipelineStep>> {
        match self.resolution {
            StepResolution::UseCase => self.registry.ordered_steps_for_use_case(use_case),
            StepResolution::Default => self.registry.ordered_steps(),
        }
    }

    async fn run(&self, request: CommunicationRequest, from_step: &str) -> PipelineResult {
        info!(from_step = %from_step, "Starting pipeline execution");

        let steps = self.resolve_steps(&request);
        let start_index = start_index(&steps, from_step);
        let mut current = request;

        for step in &steps[start_index..] {
            let name = step.name().to_string();

            if !step.can_execute(&current) {
                debug!(step = %name, "Skipping step, can_execute returned false");
                continue;
            }

            info!(step = %name, "Executing step");

            match step.execute(current.clone()).await {
                Ok(result) if result.success => {
                    step.on_success(&result.request);
                    info!(step = %name, "Step completed successfully");

                    if !result.should_continue {
                        info!(step = %name, "Pipeline stopped as requested by step");
                        return result;
                    }
                    current = result.request;
                }
                Ok(result) => {
                    let cause = result
                        .error
                        .clone()
                        .unwrap_or_else(|| Arc::new(PipelineError::rejected(result.message.clone())));
                    step.on_failure(&current, &cause);
                    error!(step = %name, "Step failed: {}", result.message);

                    let message = format!("Pipeline failed at step {}: {}", name, result.message);
                    return PipelineResult::failure(
                        result.request.update_status(RequestStatus::Failed),
                        message,
                    )
                    .with_shared_error(result.error);
                }
                Err(e) => {
                    step.on_failure(&current, &e);
                    error!(step = %name, error = %e, "Step raised an error");

                    let message = format!("Pipeline failed at step {}: {}", name, e);
                    return PipelineResult::failure(current.update_status(RequestStatus::Failed), message)
                        .with_error(e);
                }
            }
        }

        info!("Pipeline execution completed successfully");
        PipelineResult::success(current.update_status(RequestStatus::Completed))
            .with_message("Pipeline completed successfully")
    }
}

fn start_index(steps: &[Arc<dyn PipelineStep>], from_step: &str) -> usize {
    if from_step.trim().is_empty() {
        return 0;
    }
    match steps.iter().position(|s| s.name() == from_step) {
        Some(index) => index,
        None => {
            debug!(from_step = %from_step, "Start step not in resolved list, starting at the beginning");
            0
        }
    }
}
