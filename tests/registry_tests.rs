//! Tests for step registration and use-case resolution
//!
//! - Default ordering by descriptor order, unordered steps last
//! - Re-registration replaces in place
//! - Configured lists: enabled filter, stable sort, unknown names dropped
//! - Wrapping only when an entry carries configuration or a condition

mod common;

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use callcenter_pipeline::pipeline::{
    metadata_keys, PipelineStep, PipelineStepConfig, Priority, StepRegistry, UseCasePipelineConfig,
};
use callcenter_pipeline::repository::{InMemoryPipelineConfigRepository, PipelineConfigRepository};

use common::{request, RecordingStep};

fn names(steps: &[Arc<dyn PipelineStep>]) -> Vec<String> {
    steps.iter().map(|s| s.name().to_string()).collect()
}

fn setup() -> (
    Arc<InMemoryPipelineConfigRepository>,
    StepRegistry,
    Arc<Mutex<Vec<String>>>,
) {
    let configs = Arc::new(InMemoryPipelineConfigRepository::new());
    let registry = StepRegistry::new(configs.clone());
    (configs, registry, Arc::new(Mutex::new(Vec::new())))
}

// ═══════════════════════════════════════════════════════════════════════════
// Default ordering
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_default_ordering_by_descriptor_order() {
    let (_, registry, log) = setup();
    registry.register_step(Arc::new(RecordingStep::new("c", Some(3), &log)));
    registry.register_step(Arc::new(RecordingStep::new("a", Some(1), &log)));
    registry.register_step(Arc::new(RecordingStep::new("b", Some(2), &log)));

    assert_eq!(names(&registry.ordered_steps()), vec!["a", "b", "c"]);
}

#[test]
fn test_unordered_steps_sort_last_in_registration_order() {
    let (_, registry, log) = setup();
    registry.register_step(Arc::new(RecordingStep::new("late-1", None, &log)));
    registry.register_step(Arc::new(RecordingStep::new("first", Some(10), &log)));
    registry.register_step(Arc::new(RecordingStep::new("late-2", None, &log)));
    registry.register_step(Arc::new(RecordingStep::new("tie-a", Some(20), &log)));
    registry.register_step(Arc::new(RecordingStep::new("tie-b", Some(20), &log)));

    assert_eq!(
        names(&registry.ordered_steps()),
        vec!["first", "tie-a", "tie-b", "late-1", "late-2"]
    );
}

#[test]
fn test_reregistration_replaces_in_place() {
    let (_, registry, log) = setup();
    registry.register_step(Arc::new(RecordingStep::new("a", Some(1), &log)));
    registry.register_step(Arc::new(RecordingStep::new("b", Some(2), &log)));

    let replacement = Arc::new(RecordingStep::new("a", Some(5), &log));
    registry.register_step(replacement.clone());

    assert_eq!(registry.available_step_names(), vec!["a", "b"]);
    assert_eq!(names(&registry.ordered_steps()), vec!["b", "a"]);
    assert_eq!(registry.step("a").unwrap().descriptor().order, Some(5));
}

#[test]
fn test_step_lookup() {
    let (_, registry, log) = setup();
    registry.register_step(Arc::new(RecordingStep::new("a", Some(1), &log)));

    assert!(registry.step("a").is_some());
    assert!(registry.step("missing").is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// Use-case resolution
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_use_case_without_config_falls_back_to_default() {
    let (_, registry, log) = setup();
    registry.register_step(Arc::new(RecordingStep::new("b", Some(2), &log)));
    registry.register_step(Arc::new(RecordingStep::new("a", Some(1), &log)));

    assert_eq!(
        names(&registry.ordered_steps_for_use_case("nobody-configured-this")),
        vec!["a", "b"]
    );
}

#[test]
fn test_inactive_config_is_ignored() {
    let (configs, registry, log) = setup();
    registry.register_step(Arc::new(RecordingStep::new("a", Some(1), &log)));
    registry.register_step(Arc::new(RecordingStep::new("b", Some(2), &log)));

    let mut config = UseCasePipelineConfig::new("quiet", "", vec![PipelineStepConfig::new("b", 1)]);
    config.active = false;
    configs.save(config);

    assert_eq!(names(&registry.ordered_steps_for_use_case("quiet")), vec!["a", "b"]);
}

#[test]
fn test_configured_order_overrides_descriptor_order() {
    let (configs, registry, log) = setup();
    registry.register_step(Arc::new(RecordingStep::new("a", Some(1), &log)));
    registry.register_step(Arc::new(RecordingStep::new("b", Some(2), &log)));
    registry.register_step(Arc::new(RecordingStep::new("c", Some(3), &log)));

    configs.save(UseCasePipelineConfig::new(
        "reversed",
        "",
        vec![
            PipelineStepConfig::new("a", 30),
            PipelineStepConfig::new("c", 10),
            PipelineStepConfig::new("b", 20),
        ],
    ));

    assert_eq!(
        names(&registry.ordered_steps_for_use_case("reversed")),
        vec!["c", "b", "a"]
    );
}

#[test]
fn test_disabled_and_unknown_entries_are_dropped() {
    let (configs, registry, log) = setup();
    registry.register_step(Arc::new(RecordingStep::new("a", Some(1), &log)));
    registry.register_step(Arc::new(RecordingStep::new("b", Some(2), &log)));

    configs.save(UseCasePipelineConfig::new(
        "partial",
        "",
        vec![
            PipelineStepConfig::new("a", 1).disabled(),
            PipelineStepConfig::new("ghost", 2),
            PipelineStepConfig::new("b", 3),
        ],
    ));

    assert_eq!(names(&registry.ordered_steps_for_use_case("partial")), vec!["b"]);
}

#[test]
fn test_equal_configured_orders_keep_listed_order() {
    let (configs, registry, log) = setup();
    for name in ["x", "y", "z"] {
        registry.register_step(Arc::new(RecordingStep::new(name, None, &log)));
    }

    configs.save(UseCasePipelineConfig::new(
        "ties",
        "",
        vec![
            PipelineStepConfig::new("z", 1),
            PipelineStepConfig::new("x", 1),
            PipelineStepConfig::new("y", 0),
        ],
    ));

    assert_eq!(
        names(&registry.ordered_steps_for_use_case("ties")),
        vec!["y", "z", "x"]
    );
}

#[test]
fn test_all_entries_disabled_yields_empty_list() {
    let (configs, registry, log) = setup();
    registry.register_step(Arc::new(RecordingStep::new("a", Some(1), &log)));

    configs.save(UseCasePipelineConfig::new(
        "off",
        "",
        vec![PipelineStepConfig::new("a", 1).disabled()],
    ));

    assert!(registry.ordered_steps_for_use_case("off").is_empty());
}

#[test]
fn test_plain_entry_resolves_to_registered_instance() {
    let (configs, registry, log) = setup();
    let step: Arc<dyn PipelineStep> = Arc::new(RecordingStep::new("a", Some(1), &log));
    registry.register_step(step.clone());

    configs.save(UseCasePipelineConfig::new("plain", "", vec![PipelineStepConfig::new("a", 1)]));

    let resolved = registry.ordered_steps_for_use_case("plain");
    assert!(Arc::ptr_eq(&resolved[0], &step));
}

#[tokio::test]
async fn test_configured_entry_injects_configuration() {
    let (configs, registry, log) = setup();
    let step = Arc::new(RecordingStep::new("a", Some(1), &log));
    registry.register_step(step.clone());

    let configuration = match json!({"delay": 5, "retries": 2}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    configs.save(UseCasePipelineConfig::new(
        "tuned",
        "",
        vec![PipelineStepConfig::new("a", 1).with_configuration(configuration)],
    ));

    let resolved = registry.ordered_steps_for_use_case("tuned");
    assert_eq!(resolved[0].name(), "a");
    resolved[0].execute(request("w-1", "tuned")).await.unwrap();

    let seen = step.last_seen().unwrap();
    assert_eq!(
        seen.metadata[metadata_keys::STEP_CONFIGURATION],
        json!({"delay": 5, "retries": 2})
    );
}

#[test]
fn test_condition_only_entry_is_gated() {
    let (configs, registry, log) = setup();
    registry.register_step(Arc::new(RecordingStep::new("a", Some(1), &log)));

    configs.save(UseCasePipelineConfig::new(
        "gated",
        "",
        vec![PipelineStepConfig::new("a", 1).with_condition("priority=HIGH")],
    ));

    let resolved = registry.ordered_steps_for_use_case("gated");
    let normal = request("w-1", "gated");
    let high = request("w-1", "gated").with_priority(Priority::High);

    assert!(!resolved[0].can_execute(&normal));
    assert!(resolved[0].can_execute(&high));
}

#[test]
fn test_resolution_reflects_config_changes() {
    let (configs, registry, log) = setup();
    registry.register_step(Arc::new(RecordingStep::new("a", Some(1), &log)));
    registry.register_step(Arc::new(RecordingStep::new("b", Some(2), &log)));

    let saved = configs.save(UseCasePipelineConfig::new(
        "live",
        "",
        vec![PipelineStepConfig::new("a", 1), PipelineStepConfig::new("b", 2)],
    ));
    assert_eq!(names(&registry.ordered_steps_for_use_case("live")), vec!["a", "b"]);

    let mut updated = saved;
    updated.steps = vec![PipelineStepConfig::new("b", 1)];
    configs.save(updated);
    assert_eq!(names(&registry.ordered_steps_for_use_case("live")), vec!["b"]);

    configs.delete_by_use_case("live");
    assert_eq!(names(&registry.ordered_steps_for_use_case("live")), vec!["a", "b"]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Concurrency
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_and_reads() {
    let (_, registry, log) = setup();
    let registry = Arc::new(registry);
    registry.register_step(Arc::new(RecordingStep::new("fixed", Some(0), &log)));

    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = registry.clone();
        let log = log.clone();
        handles.push(tokio::spawn(async move {
            for round in 0..50 {
                if i % 2 == 0 {
                    registry.register_step(Arc::new(RecordingStep::new(
                        "shared",
                        Some(i * 100 + round),
                        &log,
                    )));
                } else {
                    let ordered = registry.ordered_steps();
                    assert_eq!(ordered[0].name(), "fixed");
                    let shared = ordered.iter().filter(|s| s.name() == "shared").count();
                    assert!(shared <= 1);
                    assert!(registry.step("fixed").is_some());
                }
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    registry.register_step(Arc::new(RecordingStep::new("shared", Some(7), &log)));

    assert_eq!(registry.available_step_names(), vec!["fixed", "shared"]);
    assert_eq!(registry.step("shared").unwrap().descriptor().order, Some(7));
    assert_eq!(names(&registry.ordered_steps()), vec!["fixed", "shared"]);
}
