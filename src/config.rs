//! Configuration module - Environment-based configuration
//!
//! Every setting has a default so the service starts with an empty
//! environment; see `.env.example` for the full list.

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clients::{CommunicationProvider, HttpProvider, SimulatedProvider};
use crate::demo;
use crate::pipeline::steps::{default_steps, ExclusionRules};
use crate::pipeline::{PipelineExecutor, StepRegistry, StepResolution, UseCasePipelineConfig};
use crate::repository::{
    InMemoryPipelineConfigRepository, InMemoryRequestRepository, PipelineConfigRepository,
    RequestRepository,
};
use crate::service::CommunicationService;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server config
    pub host: String,
    pub port: u16,

    // Pipeline behaviour
    pub step_resolution: StepResolution,
    pub pipeline_config_path: Option<String>,
    pub seed_demo: bool,
    pub simulate_latency: bool,

    // Communication provider; simulated when unset
    pub provider_url: Option<String>,
    pub provider_timeout: Duration,

    // Exclusion rules
    pub blocked_workers: Vec<String>,
    pub disabled_use_cases: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let step_resolution = env::var("PIPELINE_STEP_RESOLUTION")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(resolution) => Some(resolution),
                Err(e) => {
                    warn!("Ignoring PIPELINE_STEP_RESOLUTION: {}", e);
                    None
                }
            })
            .unwrap_or_default();

        let defaults = ExclusionRules::default();

        Self {
            host: env::var("PIPELINE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PIPELINE_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            step_resolution,
            pipeline_config_path: env::var("PIPELINE_CONFIG_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty()),
            seed_demo: env_flag("PIPELINE_SEED_DEMO", true),
            simulate_latency: env_flag("PIPELINE_SIMULATE_LATENCY", true),
            provider_url: env::var("PROVIDER_URL").ok().filter(|u| !u.trim().is_empty()),
            provider_timeout: Duration::from_secs(
                env::var("PROVIDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            blocked_workers: env::var("EXCLUSION_BLOCKED_WORKERS")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(|_| sorted(defaults.blocked_workers)),
            disabled_use_cases: env::var("EXCLUSION_DISABLED_USE_CASES")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(|_| sorted(defaults.disabled_use_cases)),
        }
    }

    /// Get server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn exclusion_rules(&self) -> ExclusionRules {
        ExclusionRules::new(self.blocked_workers.clone(), self.disabled_use_cases.clone())
    }
}

impl Default for Config {
    /// Local defaults: simulated provider, demo data seeded, no latency.
    fn default() -> Self {
        let rules = ExclusionRules::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            step_resolution: StepResolution::default(),
            pipeline_config_path: None,
            seed_demo: true,
            simulate_latency: false,
            provider_url: None,
            provider_timeout: Duration::from_secs(30),
            blocked_workers: sorted(rules.blocked_workers),
            disabled_use_cases: sorted(rules.disabled_use_cases),
        }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn sorted(set: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut items: Vec<_> = set.into_iter().collect();
    items.sort();
    items
}

/// Read use-case configurations from a YAML list.
pub fn load_pipeline_configs(path: impl AsRef<Path>) -> Result<Vec<UseCasePipelineConfig>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline configs from {}", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse pipeline configs in {}", path.display()))
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<StepRegistry>,
    pub executor: Arc<PipelineExecutor>,
    pub service: CommunicationService,
    pub requests: Arc<dyn RequestRepository>,
    pub configs: Arc<dyn PipelineConfigRepository>,
}

impl AppState {
    /// Wire stores, provider, built-in steps and executor from `config`.
    pub fn new(config: Config) -> Result<Self> {
        let requests: Arc<dyn RequestRepository> = Arc::new(InMemoryRequestRepository::new());
        let configs: Arc<dyn PipelineConfigRepository> =
            Arc::new(InMemoryPipelineConfigRepository::new());

        let provider: Arc<dyn CommunicationProvider> = match &config.provider_url {
            Some(url) => {
                let http_client = reqwest::Client::builder()
                    .timeout(config.provider_timeout)
                    .build()
                    .context("Failed to create HTTP client")?;
                info!("Using HTTP provider at {}", url);
                Arc::new(HttpProvider::new(url.clone(), http_client))
            }
            None if config.simulate_latency => Arc::new(SimulatedProvider::default()),
            None => Arc::new(SimulatedProvider::new(Duration::ZERO)),
        };

        let registry = Arc::new(StepRegistry::new(configs.clone()));
        for step in default_steps(
            requests.clone(),
            provider,
            config.exclusion_rules(),
            config.simulate_latency,
        ) {
            registry.register_step(step);
        }

        if let Some(path) = &config.pipeline_config_path {
            for pipeline in load_pipeline_configs(path)? {
                info!(use_case = %pipeline.use_case, "Loaded pipeline configuration");
                configs.save(pipeline);
            }
        }
        if config.seed_demo {
            demo::seed(configs.as_ref());
        }

        let executor =
            Arc::new(PipelineExecutor::new(registry.clone()).with_resolution(config.step_resolution));
        let service = CommunicationService::new(executor.clone(), requests.clone());

        Ok(Self {
            config: Arc::new(config),
            registry,
            executor,
            service,
            requests,
            configs,
        })
    }
}
