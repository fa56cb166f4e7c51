//! `key=value` gates for configured steps
//!
//! Only two keys are understood: `priority` and `communicationType`, both
//! compared case-insensitively against the request. Anything else is treated
//! as unknown and lets the step run.

use super::model::CommunicationRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepCondition {
    Priority(String),
    CommunicationType(String),
    /// Malformed or unrecognised; always passes.
    Unknown,
}

impl StepCondition {
    /// Parse a raw condition string.
    ///
    /// Splitting on `=` must yield exactly two parts, otherwise the condition
    /// is unknown. An empty value is kept as-is and matches nothing.
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split('=').collect();
        let [key, value] = parts.as_slice() else {
            return StepCondition::Unknown;
        };

        match *key {
            "priority" => StepCondition::Priority(value.to_string()),
            "communicationType" => StepCondition::CommunicationType(value.to_string()),
            _ => StepCondition::Unknown,
        }
    }

    pub fn matches(&self, request: &CommunicationRequest) -> bool {
        match self {
            StepCondition::Priority(expected) => {
                !expected.is_empty() && request.priority.as_str().eq_ignore_ascii_case(expected)
            }
            StepCondition::CommunicationType(expected) => {
                !expected.is_empty()
                    && request
                        .communication_type
                        .as_str()
                        .eq_ignore_ascii_case(expected)
            }
            StepCondition::Unknown => true,
        }
    }
}

/// Parse and evaluate `condition` against `request` in one go.
pub fn evaluate_condition(condition: &str, request: &CommunicationRequest) -> bool {
    StepCondition::parse(condition).matches(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::{CommunicationType, Priority};
    use serde_json::Map;

    fn request(priority: Priority, kind: CommunicationType) -> CommunicationRequest {
        CommunicationRequest::new("worker-1", kind, Map::new(), "test").with_priority(priority)
    }

    #[test]
    fn test_priority_matches_case_insensitively() {
        let high = request(Priority::High, CommunicationType::Call);
        assert!(evaluate_condition("priority=HIGH", &high));
        assert!(evaluate_condition("priority=high", &high));
        assert!(evaluate_condition("priority=High", &high));
    }

    #[test]
    fn test_priority_rejects_other_levels() {
        for priority in [Priority::Low, Priority::Normal, Priority::Urgent] {
            let req = request(priority, CommunicationType::Call);
            assert!(!evaluate_condition("priority=HIGH", &req), "{priority}");
        }
    }

    #[test]
    fn test_communication_type_matches() {
        for kind in CommunicationType::ALL {
            let req = request(Priority::Normal, kind);
            let condition = format!("communicationType={}", kind.as_str().to_lowercase());
            assert!(evaluate_condition(&condition, &req));
        }
        let sms = request(Priority::Normal, CommunicationType::Sms);
        assert!(!evaluate_condition("communicationType=EMAIL", &sms));
    }

    #[test]
    fn test_empty_value_matches_nothing() {
        for priority in Priority::ALL {
            let req = request(priority, CommunicationType::Email);
            assert!(!evaluate_condition("priority=", &req));
        }
        let req = request(Priority::Normal, CommunicationType::Email);
        assert!(!evaluate_condition("communicationType=", &req));
    }

    #[test]
    fn test_malformed_conditions_are_unknown() {
        assert_eq!(StepCondition::parse("priority"), StepCondition::Unknown);
        assert_eq!(StepCondition::parse(""), StepCondition::Unknown);
        assert_eq!(StepCondition::parse("priority=HIGH=EXTRA"), StepCondition::Unknown);
        assert_eq!(StepCondition::parse("region=EU"), StepCondition::Unknown);
        assert_eq!(StepCondition::parse("=HIGH"), StepCondition::Unknown);

        let req = request(Priority::Low, CommunicationType::Push);
        assert!(evaluate_condition("priority=HIGH=EXTRA", &req));
        assert!(evaluate_condition("region=EU", &req));
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let req = request(Priority::High, CommunicationType::Sms);
        for condition in ["priority=HIGH", "priority=LOW", "priority=", "bogus", ""] {
            assert_eq!(
                evaluate_condition(condition, &req),
                evaluate_condition(condition, &req)
            );
        }
    }
}
