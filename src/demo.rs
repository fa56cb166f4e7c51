//! Demo data and scenario runner
//!
//! Seeds five use-case configurations, defines canned scenarios against them
//! and manages the `live-config-demo` use case that is rewritten while the
//! service runs.

use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::pipeline::{
    CommunicationRequest, CommunicationType, PipelineStepConfig, Priority, UseCasePipelineConfig,
};
use crate::repository::PipelineConfigRepository;
use crate::service::CommunicationService;
use crate::types::{BatchDemoResult, DemoResult, DemoScenario};

pub const LIVE_USE_CASE: &str = "live-config-demo";

/// Scenarios run by POST /api/demo/batch.
pub const BATCH_SCENARIOS: [&str; 4] = ["emergency", "marketing", "priority-high", "blocked-worker"];

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Seed Configurations
// ═══════════════════════════════════════════════════════════════════════════

pub fn seed_configs() -> Vec<UseCasePipelineConfig> {
    vec![
        UseCasePipelineConfig::new(
            "emergency-alert",
            "Ultra-fast pipeline for emergency notifications, bypasses storage and exclusions",
            vec![
                PipelineStepConfig::new("acceptanceRules", 1),
                PipelineStepConfig::new("communicationProvider", 2),
            ],
        ),
        UseCasePipelineConfig::new(
            "marketing-campaign",
            "Full compliance pipeline with all safeguards for marketing",
            vec![
                PipelineStepConfig::new("acceptanceRules", 1),
                PipelineStepConfig::new("dataStorage", 2),
                PipelineStepConfig::new("exclusionRules", 3),
                PipelineStepConfig::new("scheduler", 4).with_configuration(object(json!({
                    "batchSize": 1000,
                    "maxRetries": 3,
                    "delayBetweenBatches": 30
                }))),
                PipelineStepConfig::new("communicationProvider", 5),
            ],
        ),
        UseCasePipelineConfig::new(
            "priority-notification",
            "Conditional pipeline, storage and exclusions only for NORMAL priority",
            vec![
                PipelineStepConfig::new("acceptanceRules", 1),
                PipelineStepConfig::new("dataStorage", 2).with_condition("priority=NORMAL"),
                PipelineStepConfig::new("exclusionRules", 3).with_condition("priority=NORMAL"),
                PipelineStepConfig::new("scheduler", 4).with_configuration(object(json!({
                    "urgentDelay": 0,
                    "normalDelay": 15
                }))),
                PipelineStepConfig::new("communicationProvider", 5),
            ],
        ),
        UseCasePipelineConfig::new(
            "sms-notification",
            "Pipeline for SMS communications, exclusions apply to SMS only",
            vec![
                PipelineStepConfig::new("acceptanceRules", 1),
                PipelineStepConfig::new("exclusionRules", 2).with_condition("communicationType=SMS"),
                PipelineStepConfig::new("scheduler", 3).with_configuration(object(json!({
                    "rateLimitPerMinute": 60
                }))),
                PipelineStepConfig::new("communicationProvider", 4),
            ],
        ),
        UseCasePipelineConfig::new(
            "bulk-notification",
            "High-volume pipeline for bulk communications",
            vec![
                PipelineStepConfig::new("acceptanceRules", 1),
                PipelineStepConfig::new("dataStorage", 2),
                PipelineStepConfig::new("scheduler", 3).with_configuration(object(json!({
                    "batchSize": 5000,
                    "parallelProcessing": true,
                    "maxConcurrency": 10
                }))),
                PipelineStepConfig::new("communicationProvider", 4),
            ],
        ),
    ]
}

/// Save the seed configurations. Use cases that already have an active
/// configuration are left alone.
pub fn seed(configs: &dyn PipelineConfigRepository) {
    for config in seed_configs() {
        if configs.find_by_use_case(&config.use_case).is_some() {
            continue;
        }
        info!(
            use_case = %config.use_case,
            steps = config.steps.len(),
            "Seeded pipeline configuration"
        );
        configs.save(config);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Live Configuration Demo
// ═══════════════════════════════════════════════════════════════════════════

fn live_full_steps() -> Vec<PipelineStepConfig> {
    vec![
        PipelineStepConfig::new("acceptanceRules", 1),
        PipelineStepConfig::new("dataStorage", 2),
        PipelineStepConfig::new("exclusionRules", 3),
        PipelineStepConfig::new("scheduler", 4)
            .with_configuration(object(json!({"delay": 100, "retries": 2}))),
        PipelineStepConfig::new("communicationProvider", 5),
    ]
}

fn live_streamlined_steps() -> Vec<PipelineStepConfig> {
    vec![
        PipelineStepConfig::new("acceptanceRules", 1),
        PipelineStepConfig::new("scheduler", 2)
            .with_condition("priority=HIGH")
            .with_configuration(object(json!({"delay": 50, "retries": 1}))),
        PipelineStepConfig::new("communicationProvider", 3),
    ]
}

/// Replace any live demo configuration with the full five-step list.
pub fn setup_live(configs: &dyn PipelineConfigRepository) -> UseCasePipelineConfig {
    configs.delete_by_use_case(LIVE_USE_CASE);
    configs.save(UseCasePipelineConfig::new(
        LIVE_USE_CASE,
        "Initial configuration, full pipeline with all steps",
        live_full_steps(),
    ))
}

/// Streamline the live demo configuration in place. `None` when setup has not run.
pub fn modify_live(configs: &dyn PipelineConfigRepository) -> Option<UseCasePipelineConfig> {
    rewrite_live(
        configs,
        "Modified configuration, streamlined for speed",
        live_streamlined_steps(),
    )
}

/// Put the full step list back. `None` when setup has not run.
pub fn restore_live(configs: &dyn PipelineConfigRepository) -> Option<UseCasePipelineConfig> {
    rewrite_live(
        configs,
        "Restored configuration, back to full pipeline",
        live_full_steps(),
    )
}

fn rewrite_live(
    configs: &dyn PipelineConfigRepository,
    description: &str,
    steps: Vec<PipelineStepConfig>,
) -> Option<UseCasePipelineConfig> {
    let mut config = configs.find_by_use_case(LIVE_USE_CASE)?;
    config.description = description.to_string();
    config.steps = steps;
    Some(configs.save(config))
}

// ═══════════════════════════════════════════════════════════════════════════
// Scenarios
// ═══════════════════════════════════════════════════════════════════════════

pub fn scenarios() -> Vec<DemoScenario> {
    vec![
        DemoScenario {
            id: "live-config-demo",
            name: "Live Configuration Demo",
            description: "Runtime pipeline modification: run, modify, run again",
            use_case: LIVE_USE_CASE,
            priority: Priority::Normal,
            communication_type: CommunicationType::Email,
            worker_id: None,
            expected_steps: vec![
                "acceptanceRules",
                "dataStorage",
                "exclusionRules",
                "scheduler",
                "communicationProvider",
            ],
            estimated_time: "~400ms",
            expected_result: "SUCCESS",
        },
        DemoScenario {
            id: "emergency",
            name: "Emergency Alert",
            description: "Ultra-fast pipeline bypassing storage and exclusions",
            use_case: "emergency-alert",
            priority: Priority::Urgent,
            communication_type: CommunicationType::Call,
            worker_id: None,
            expected_steps: vec!["acceptanceRules", "communicationProvider"],
            estimated_time: "~300ms",
            expected_result: "SUCCESS",
        },
        DemoScenario {
            id: "marketing",
            name: "Marketing Campaign",
            description: "Full compliance pipeline with all safeguards",
            use_case: "marketing-campaign",
            priority: Priority::Normal,
            communication_type: CommunicationType::Email,
            worker_id: None,
            expected_steps: vec![
                "acceptanceRules",
                "dataStorage",
                "exclusionRules",
                "scheduler",
                "communicationProvider",
            ],
            estimated_time: "~500ms",
            expected_result: "SUCCESS",
        },
        DemoScenario {
            id: "priority-high",
            name: "High Priority Notification",
            description: "Conditional pipeline, skips storage and exclusions for HIGH priority",
            use_case: "priority-notification",
            priority: Priority::High,
            communication_type: CommunicationType::Sms,
            worker_id: None,
            expected_steps: vec!["acceptanceRules", "scheduler", "communicationProvider"],
            estimated_time: "~350ms",
            expected_result: "SUCCESS",
        },
        DemoScenario {
            id: "priority-normal",
            name: "Normal Priority Notification",
            description: "Conditional pipeline, includes all steps for NORMAL priority",
            use_case: "priority-notification",
            priority: Priority::Normal,
            communication_type: CommunicationType::Email,
            worker_id: None,
            expected_steps: vec![
                "acceptanceRules",
                "dataStorage",
                "exclusionRules",
                "scheduler",
                "communicationProvider",
            ],
            estimated_time: "~500ms",
            expected_result: "SUCCESS",
        },
        DemoScenario {
            id: "blocked-worker",
            name: "Blocked Worker",
            description: "Exclusion rules stop a blocked worker",
            use_case: "marketing-campaign",
            priority: Priority::Normal,
            communication_type: CommunicationType::Email,
            worker_id: Some("blocked-worker-1"),
            expected_steps: vec!["acceptanceRules", "dataStorage", "exclusionRules"],
            estimated_time: "~300ms",
            expected_result: "FAILED",
        },
        DemoScenario {
            id: "default-fallback",
            name: "Default Pipeline Fallback",
            description: "Descriptor ordering when no configuration exists",
            use_case: "unknown-case",
            priority: Priority::Normal,
            communication_type: CommunicationType::Call,
            worker_id: None,
            expected_steps: vec![
                "acceptanceRules",
                "dataStorage",
                "scheduler",
                "exclusionRules",
                "communicationProvider",
            ],
            estimated_time: "~600ms",
            expected_result: "SUCCESS",
        },
    ]
}

pub fn scenario(id: &str) -> Option<DemoScenario> {
    scenarios().into_iter().find(|s| s.id == id)
}

/// Sample payload for a channel.
pub fn demo_payload(communication_type: CommunicationType) -> Map<String, Value> {
    object(match communication_type {
        CommunicationType::Call => json!({
            "phoneNumber": "+1-555-DEMO",
            "script": "This is a demo call from the communication pipeline."
        }),
        CommunicationType::Sms => json!({
            "phoneNumber": "+1-555-DEMO",
            "message": "Demo SMS: pipeline processing complete"
        }),
        CommunicationType::Email => json!({
            "to": "demo@example.com",
            "subject": "Demo: Communication Pipeline Test",
            "body": "This is a demonstration email from the configurable communication pipeline."
        }),
        CommunicationType::Push => json!({
            "title": "Demo Notification",
            "body": "Pipeline demo notification",
            "badge": 1
        }),
    })
}

/// Step names recovered from the status history, first occurrence order.
pub fn executed_steps(request: &CommunicationRequest) -> Vec<String> {
    let mut steps: Vec<String> = Vec::new();
    for entry in request.status_history() {
        let step = if entry.contains("ACCEPTANCE_RULES") {
            "acceptanceRules"
        } else if entry.contains("DATA_STORED") {
            "dataStorage"
        } else if entry.contains("EXCLUSION_RULES") {
            "exclusionRules"
        } else if entry.ends_with(": SCHEDULED") {
            "scheduler"
        } else if entry.contains("SENT_TO_PROVIDER") {
            "communicationProvider"
        } else {
            continue;
        };
        if !steps.iter().any(|s| s == step) {
            steps.push(step.to_string());
        }
    }
    steps
}

pub async fn run_scenario(service: &CommunicationService, scenario: DemoScenario) -> DemoResult {
    let started = Instant::now();

    let worker_id = match scenario.worker_id {
        Some(id) => id.to_string(),
        None => format!("demo-worker-{}", Utc::now().timestamp_millis()),
    };
    let request = CommunicationRequest::new(
        worker_id,
        scenario.communication_type,
        demo_payload(scenario.communication_type),
        scenario.use_case,
    )
    .with_priority(scenario.priority);

    let result = service.process(request.clone()).await;

    DemoResult {
        executed_steps: executed_steps(&result.request),
        metadata: result.request.metadata.clone(),
        actual_duration: format!("{}ms", started.elapsed().as_millis()),
        scenario,
        request,
        result,
    }
}

/// Run [`BATCH_SCENARIOS`] concurrently.
pub async fn run_batch(service: &CommunicationService) -> BatchDemoResult {
    let started = Instant::now();

    let runs = BATCH_SCENARIOS
        .iter()
        .filter_map(|id| scenario(id))
        .map(|s| run_scenario(service, s));
    let results = join_all(runs).await;

    let successful = results.iter().filter(|r| r.result.success).count();
    BatchDemoResult {
        total_scenarios: BATCH_SCENARIOS.len(),
        successful_scenarios: successful,
        failed_scenarios: results.len() - successful,
        total_duration: format!("{}ms", started.elapsed().as_millis()),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RequestStatus;
    use crate::repository::InMemoryPipelineConfigRepository;

    #[test]
    fn test_seed_configs_cover_five_use_cases() {
        let configs = InMemoryPipelineConfigRepository::new();
        seed(&configs);

        for use_case in [
            "emergency-alert",
            "marketing-campaign",
            "priority-notification",
            "sms-notification",
            "bulk-notification",
        ] {
            assert!(configs.find_by_use_case(use_case).is_some(), "{use_case}");
        }
    }

    #[test]
    fn test_seed_keeps_existing_configuration() {
        let configs = InMemoryPipelineConfigRepository::new();
        let custom = configs.save(UseCasePipelineConfig::new(
            "emergency-alert",
            "custom",
            vec![PipelineStepConfig::new("communicationProvider", 1)],
        ));

        seed(&configs);

        let found = configs.find_by_use_case("emergency-alert").unwrap();
        assert_eq!(found.id, custom.id);
        assert_eq!(found.steps.len(), 1);
    }

    #[test]
    fn test_live_demo_lifecycle_keeps_config_id() {
        let configs = InMemoryPipelineConfigRepository::new();
        assert!(modify_live(&configs).is_none());

        let created = setup_live(&configs);
        let modified = modify_live(&configs).unwrap();
        assert_eq!(modified.id, created.id);
        assert_eq!(modified.steps.len(), 3);
        assert_eq!(modified.steps[1].condition.as_deref(), Some("priority=HIGH"));

        let restored = restore_live(&configs).unwrap();
        assert_eq!(restored.id, created.id);
        assert_eq!(restored.steps.len(), 5);
        assert_eq!(configs.find_all().len(), 1);
    }

    #[test]
    fn test_executed_steps_from_history() {
        let request = CommunicationRequest::new(
            "w-1",
            CommunicationType::Sms,
            demo_payload(CommunicationType::Sms),
            "x",
        )
        .update_status(RequestStatus::AcceptanceRulesChecking)
        .update_status(RequestStatus::AcceptanceRulesPassed)
        .update_status(RequestStatus::Scheduled)
        .update_status(RequestStatus::RetryScheduled)
        .update_status(RequestStatus::SentToProvider)
        .update_status(RequestStatus::Completed);

        assert_eq!(
            executed_steps(&request),
            vec!["acceptanceRules", "scheduler", "communicationProvider"]
        );
    }

    #[test]
    fn test_scenario_lookup() {
        assert_eq!(scenario("blocked-worker").unwrap().worker_id, Some("blocked-worker-1"));
        assert!(scenario("nope").is_none());
        for id in BATCH_SCENARIOS {
            assert!(scenario(id).is_some(), "{id}");
        }
    }

    #[test]
    fn test_every_channel_has_a_payload() {
        for kind in CommunicationType::ALL {
            assert!(!demo_payload(kind).is_empty());
        }
    }
}
