//! In-memory stores for requests and use-case configurations
//!
//! Both stores sit behind traits so steps and the registry can be exercised
//! against failing or recording doubles.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::PipelineError;
use crate::pipeline::{CommunicationRequest, UseCasePipelineConfig};

// ═══════════════════════════════════════════════════════════════════════════
// Communication Requests
// ═══════════════════════════════════════════════════════════════════════════

/// Storage for communication requests, used by the data storage step.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn save(&self, request: &CommunicationRequest) -> Result<(), PipelineError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<CommunicationRequest>, PipelineError>;

    async fn find_all(&self) -> Result<Vec<CommunicationRequest>, PipelineError>;

    async fn delete_by_id(&self, id: &str) -> Result<bool, PipelineError>;
}

pub struct InMemoryRequestRepository {
    requests: Arc<RwLock<HashMap<String, CommunicationRequest>>>,
}

impl InMemoryRequestRepository {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryRequestRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn save(&self, request: &CommunicationRequest) -> Result<(), PipelineError> {
        self.requests
            .write()
            .await
            .insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<CommunicationRequest>, PipelineError> {
        Ok(self.requests.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<CommunicationRequest>, PipelineError> {
        let mut all: Vec<_> = self.requests.read().await.values().cloned().collect();
        all.sort_by_key(|r| r.created_at);
        Ok(all)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, PipelineError> {
        Ok(self.requests.write().await.remove(id).is_some())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Use Case Configurations
// ═══════════════════════════════════════════════════════════════════════════

/// Storage for use-case pipeline configurations.
///
/// Synchronous: it is consulted while resolving a step list.
pub trait PipelineConfigRepository: Send + Sync {
    /// The active configuration for `use_case`, if any.
    fn find_by_use_case(&self, use_case: &str) -> Option<UseCasePipelineConfig>;

    /// Insert or replace by configuration id, refreshing `updated_at`.
    fn save(&self, config: UseCasePipelineConfig) -> UseCasePipelineConfig;

    fn find_all(&self) -> Vec<UseCasePipelineConfig>;

    /// Remove the active configuration for `use_case`.
    fn delete_by_use_case(&self, use_case: &str) -> bool;
}

pub struct InMemoryPipelineConfigRepository {
    configs: parking_lot::RwLock<HashMap<String, UseCasePipelineConfig>>,
}

impl InMemoryPipelineConfigRepository {
    pub fn new() -> Self {
        Self {
            configs: parking_lot::RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPipelineConfigRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfigRepository for InMemoryPipelineConfigRepository {
    fn find_by_use_case(&self, use_case: &str) -> Option<UseCasePipelineConfig> {
        let configs = self.configs.read();
        // Several active entries: the oldest wins
        configs
            .values()
            .filter(|c| c.active && c.use_case == use_case)
            .min_by_key(|c| c.created_at)
            .cloned()
    }

    fn save(&self, mut config: UseCasePipelineConfig) -> UseCasePipelineConfig {
        config.updated_at = Utc::now();
        self.configs.write().insert(config.id.clone(), config.clone());
        config
    }

    fn find_all(&self) -> Vec<UseCasePipelineConfig> {
        let mut all: Vec<_> = self.configs.read().values().cloned().collect();
        all.sort_by(|a, b| a.use_case.cmp(&b.use_case));
        all
    }

    fn delete_by_use_case(&self, use_case: &str) -> bool {
        let Some(config) = self.find_by_use_case(use_case) else {
            return false;
        };
        self.configs.write().remove(&config.id).is_some()
    }
}
