//! Shared doubles for the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use callcenter_pipeline::clients::CommunicationProvider;
use callcenter_pipeline::error::PipelineError;
use callcenter_pipeline::pipeline::steps::{default_steps, ExclusionRules};
use callcenter_pipeline::pipeline::{
    CommunicationRequest, CommunicationType, PipelineExecutor, PipelineResult, PipelineStep,
    RequestStatus, StepDescriptor, StepRegistry,
};
use callcenter_pipeline::repository::{
    InMemoryPipelineConfigRepository, InMemoryRequestRepository, PipelineConfigRepository,
    RequestRepository,
};

pub fn payload() -> Map<String, Value> {
    match json!({"message": "Your shift starts at 9"}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub fn request(worker_id: &str, use_case: &str) -> CommunicationRequest {
    CommunicationRequest::new(worker_id, CommunicationType::Sms, payload(), use_case)
}

// ═══════════════════════════════════════════════════════════════════════════
// Recording Step
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Succeed and continue, recording `status` if given.
    Continue(Option<RequestStatus>),
    /// Succeed and end the run.
    Stop(String),
    /// Failure result without an attached error.
    Reject(String),
    /// Failure result carrying an error.
    RejectWith(String, fn() -> PipelineError),
    /// Raise instead of returning a result.
    Fault(fn() -> PipelineError),
}

/// Step double that records every interaction in a shared run log.
pub struct RecordingStep {
    descriptor: StepDescriptor,
    behaviour: Behaviour,
    allow: bool,
    log: Arc<Mutex<Vec<String>>>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<CommunicationRequest>>,
    pub successes: AtomicUsize,
    pub failures: Mutex<Vec<String>>,
}

impl RecordingStep {
    pub fn new(name: &'static str, order: Option<i32>, log: &Arc<Mutex<Vec<String>>>) -> Self {
        let descriptor = StepDescriptor::new(name, format!("{name} test step"));
        Self {
            descriptor: match order {
                Some(order) => descriptor.with_order(order),
                None => descriptor,
            },
            behaviour: Behaviour::Continue(None),
            allow: true,
            log: log.clone(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            successes: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn behaving(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn refusing(mut self) -> Self {
        self.allow = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn last_seen(&self) -> Option<CommunicationRequest> {
        self.seen.lock().last().cloned()
    }
}

#[async_trait]
impl PipelineStep for RecordingStep {
    fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    async fn execute(&self, request: CommunicationRequest) -> Result<PipelineResult, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(request.clone());
        self.log.lock().push(self.descriptor.name.to_string());

        match &self.behaviour {
            Behaviour::Continue(Some(status)) => {
                Ok(PipelineResult::success(request.update_status(*status)))
            }
            Behaviour::Continue(None) => Ok(PipelineResult::success(request)),
            Behaviour::Stop(message) => Ok(PipelineResult::stop(request, message.clone())),
            Behaviour::Reject(message) => Ok(PipelineResult::failure(request, message.clone())),
            Behaviour::RejectWith(message, error) => {
                Ok(PipelineResult::failure(request, message.clone()).with_error(error()))
            }
            Behaviour::Fault(error) => Err(error()),
        }
    }

    fn can_execute(&self, _request: &CommunicationRequest) -> bool {
        self.allow
    }

    fn on_success(&self, _request: &CommunicationRequest) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_failure(&self, _request: &CommunicationRequest, error: &PipelineError) {
        self.failures.lock().push(error.to_string());
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Store and Provider Doubles
// ═══════════════════════════════════════════════════════════════════════════

/// Request store whose every call fails.
pub struct FailingRepository;

#[async_trait]
impl RequestRepository for FailingRepository {
    async fn save(&self, _request: &CommunicationRequest) -> Result<(), PipelineError> {
        Err(PipelineError::Storage("connection refused".to_string()))
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<CommunicationRequest>, PipelineError> {
        Err(PipelineError::Storage("connection refused".to_string()))
    }

    async fn find_all(&self) -> Result<Vec<CommunicationRequest>, PipelineError> {
        Err(PipelineError::Storage("connection refused".to_string()))
    }

    async fn delete_by_id(&self, _id: &str) -> Result<bool, PipelineError> {
        Err(PipelineError::Storage("connection refused".to_string()))
    }
}

/// Provider that records dispatched request ids, optionally failing.
#[derive(Default)]
pub struct RecordingProvider {
    pub sent: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingProvider {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl CommunicationProvider for RecordingProvider {
    async fn send_communication(&self, request: &CommunicationRequest) -> Result<Map<String, Value>> {
        if self.fail {
            anyhow::bail!("provider unavailable");
        }
        self.sent.lock().push(request.id.clone());
        let mut response = Map::new();
        response.insert("providerId".to_string(), json!("test-provider"));
        Ok(response)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Wired Pipeline
// ═══════════════════════════════════════════════════════════════════════════

/// The built-in steps over in-memory stores, without simulated latency.
pub struct Harness {
    pub requests: Arc<dyn RequestRepository>,
    pub configs: Arc<dyn PipelineConfigRepository>,
    pub provider: Arc<RecordingProvider>,
    pub registry: Arc<StepRegistry>,
    pub executor: PipelineExecutor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(
            Arc::new(InMemoryRequestRepository::new()),
            Arc::new(RecordingProvider::default()),
        )
    }

    pub fn with(requests: Arc<dyn RequestRepository>, provider: Arc<RecordingProvider>) -> Self {
        let configs: Arc<dyn PipelineConfigRepository> =
            Arc::new(InMemoryPipelineConfigRepository::new());
        let registry = Arc::new(StepRegistry::new(configs.clone()));
        for step in default_steps(
            requests.clone(),
            provider.clone(),
            ExclusionRules::default(),
            false,
        ) {
            registry.register_step(step);
        }
        let executor = PipelineExecutor::new(registry.clone());

        Self {
            requests,
            configs,
            provider,
            registry,
            executor,
        }
    }
}

/// The `STATUS` part of each status history entry.
pub fn statuses(request: &CommunicationRequest) -> Vec<String> {
    request
        .status_history()
        .iter()
        .filter_map(|entry| entry.rsplit(": ").next())
        .map(String::from)
        .collect()
}
