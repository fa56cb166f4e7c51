//! Communication pipeline engine
//!
//! A request flows through an ordered list of [`PipelineStep`]s resolved by
//! the [`StepRegistry`] for its use case, and the [`PipelineExecutor`] turns
//! the run into a single [`PipelineResult`].

pub mod condition;
pub mod configurable;
pub mod executor;
pub mod model;
pub mod registry;
pub mod step;
pub mod steps;

pub use condition::{evaluate_condition, StepCondition};
pub use configurable::ConfigurableStep;
pub use executor::{PipelineExecutor, StepResolution};
pub use model::*;
pub use registry::StepRegistry;
pub use step::{PipelineStep, StepDescriptor};
