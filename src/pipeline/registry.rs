//! Step registry and use-case resolution
//!
//! Holds every known step by name and turns a use case into the ordered list
//! of steps to run:
//! - no stored configuration → default ordering by each step's descriptor
//! - stored configuration → enabled entries sorted by `order`, unknown step
//!   names dropped, wrapped in [`ConfigurableStep`] when the entry carries
//!   configuration or a condition

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::configurable::ConfigurableStep;
use super::step::PipelineStep;
use crate::repository::PipelineConfigRepository;

pub struct StepRegistry {
    /// Registration order is kept; it breaks ties in the default ordering.
    steps: RwLock<Vec<Arc<dyn PipelineStep>>>,
    configs: Arc<dyn PipelineConfigRepository>,
}

impl StepRegistry {
    pub fn new(configs: Arc<dyn PipelineConfigRepository>) -> Self {
        Self {
            steps: RwLock::new(Vec::new()),
            configs,
        }
    }

    /// Register a step. A step with the same name is replaced in place.
    pub fn register_step(&self, step: Arc<dyn PipelineStep>) {
        let mut steps = self.steps.write();
        match steps.iter().position(|s| s.name() == step.name()) {
            Some(index) => {
                debug!(step = %step.name(), "Replacing registered step");
                steps[index] = step;
            }
            None => {
                debug!(step = %step.name(), "Registering step");
                steps.push(step);
            }
        }
    }

    /// All steps by default order; steps without one come last, in registration order.
    pub fn ordered_steps(&self) -> Vec<Arc<dyn PipelineStep>> {
        let mut steps = self.steps.read().clone();
        steps.sort_by_key(|step| match step.descriptor().order {
            Some(order) => (false, order),
            None => (true, 0),
        });
        steps
    }

    /// Steps for `use_case`, falling back to [`ordered_steps`](Self::ordered_steps)
    /// when no active configuration exists.
    pub fn ordered_steps_for_use_case(&self, use_case: &str) -> Vec<Arc<dyn PipelineStep>> {
        let Some(config) = self.configs.find_by_use_case(use_case) else {
            debug!(use_case = %use_case, "No pipeline configuration, using default ordering");
            return self.ordered_steps();
        };

        let mut entries: Vec<_> = config.steps.into_iter().filter(|s| s.enabled).collect();
        entries.sort_by_key(|s| s.order);

        entries
            .into_iter()
            .filter_map(|entry| {
                let Some(step) = self.step(&entry.step_name) else {
                    warn!(
                        use_case = %use_case,
                        step = %entry.step_name,
                        "Configured step is not registered, dropping it"
                    );
                    return None;
                };

                if entry.needs_wrapper() {
                    let wrapped: Arc<dyn PipelineStep> = Arc::new(ConfigurableStep::new(
                        step,
                        entry.configuration,
                        entry.condition,
                    ));
                    Some(wrapped)
                } else {
                    Some(step)
                }
            })
            .collect()
    }

    pub fn step(&self, name: &str) -> Option<Arc<dyn PipelineStep>> {
        self.steps.read().iter().find(|s| s.name() == name).cloned()
    }

    /// Registered step names in registration order.
    pub fn available_step_names(&self) -> Vec<String> {
        self.steps
            .read()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }
}
