//! Built-in steps
//!
//! Default order: acceptance rules → data storage → scheduler → exclusion
//! rules → communication provider. Each step simulates its I/O latency,
//! which can be disabled for tests and local runs.

mod acceptance;
mod exclusion;
mod provider;
mod scheduler;
mod storage;

use std::sync::Arc;
use std::time::Duration;

pub use acceptance::AcceptanceRulesStep;
pub use exclusion::{ExclusionRules, ExclusionRulesStep};
pub use provider::CommunicationProviderStep;
pub use scheduler::SchedulerStep;
pub use storage::DataStorageStep;

use super::step::PipelineStep;
use crate::clients::CommunicationProvider;
use crate::repository::RequestRepository;

/// Build the five built-in steps.
///
/// With `simulate == false` every step runs without sleeping.
pub fn default_steps(
    requests: Arc<dyn RequestRepository>,
    provider: Arc<dyn CommunicationProvider>,
    exclusion_rules: ExclusionRules,
    simulate: bool,
) -> Vec<Arc<dyn PipelineStep>> {
    let latency = |default: Duration| if simulate { default } else { Duration::ZERO };

    vec![
        Arc::new(AcceptanceRulesStep::new().with_latency(latency(AcceptanceRulesStep::DEFAULT_LATENCY))),
        Arc::new(DataStorageStep::new(requests).with_latency(latency(DataStorageStep::DEFAULT_LATENCY))),
        Arc::new(SchedulerStep::new().with_latency(latency(SchedulerStep::DEFAULT_LATENCY))),
        Arc::new(
            ExclusionRulesStep::new(exclusion_rules)
                .with_latency(latency(ExclusionRulesStep::DEFAULT_LATENCY)),
        ),
        Arc::new(CommunicationProviderStep::new(provider)),
    ]
}

async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}
