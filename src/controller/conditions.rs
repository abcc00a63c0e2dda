//! Condition management helpers following Kubernetes API conventions.

use chrono::Utc;

use crate::crd::types::{
    Condition, ConditionStatus, CONDITION_DEGRADED, CONDITION_DEPRECATION_WARNING,
    CONDITION_PROGRESSING, CONDITION_READY,
};

/// Updates or adds a condition. A condition with the same type that has a
/// different status gets a fresh `lastTransitionTime`; reason/message
/// changes without a status change do not move the transition time.
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    type_: &str,
    status: ConditionStatus,
    reason: &str,
    message: &str,
) {
    let now = Utc::now().to_rfc3339();

    if let Some(existing) = conditions.iter_mut().find(|c| c.type_ == type_) {
        let should_update_time = existing.status != status;

        existing.status = status;
        existing.reason = reason.to_string();
        existing.message = message.to_string();

        if should_update_time {
            existing.last_transition_time = now;
        }
    } else {
        conditions.push(Condition {
            type_: type_.to_string(),
            status,
            last_transition_time: now,
            reason: reason.to_string(),
            message: message.to_string(),
        });
    }
}

pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

pub fn is_condition_true(conditions: &[Condition], type_: &str) -> bool {
    find_condition(conditions, type_)
        .map(|c| c.status == ConditionStatus::True)
        .unwrap_or(false)
}

pub fn remove_condition(conditions: &mut Vec<Condition>, type_: &str) {
    conditions.retain(|c| c.type_ != type_);
}

pub fn ready_condition(reason: &str, message: &str) -> Condition {
    Condition {
        type_: CONDITION_READY.to_string(),
        status: ConditionStatus::True,
        last_transition_time: Utc::now().to_rfc3339(),
        reason: reason.to_string(),
        message: message.to_string(),
    }
}

pub fn not_ready_condition(reason: &str, message: &str) -> Condition {
    Condition {
        type_: CONDITION_READY.to_string(),
        status: ConditionStatus::False,
        last_transition_time: Utc::now().to_rfc3339(),
        reason: reason.to_string(),
        message: message.to_string(),
    }
}

pub fn progressing_condition(reason: &str, message: &str) -> Condition {
    Condition {
        type_: CONDITION_PROGRESSING.to_string(),
        status: ConditionStatus::True,
        last_transition_time: Utc::now().to_rfc3339(),
        reason: reason.to_string(),
        message: message.to_string(),
    }
}

pub fn not_progressing_condition(reason: &str, message: &str) -> Condition {
    Condition {
        type_: CONDITION_PROGRESSING.to_string(),
        status: ConditionStatus::False,
        last_transition_time: Utc::now().to_rfc3339(),
        reason: reason.to_string(),
        message: message.to_string(),
    }
}

pub fn degraded_condition(reason: &str, message: &str) -> Condition {
    Condition {
        type_: CONDITION_DEGRADED.to_string(),
        status: ConditionStatus::True,
        last_transition_time: Utc::now().to_rfc3339(),
        reason: reason.to_string(),
        message: message.to_string(),
    }
}

pub fn not_degraded_condition() -> Condition {
    Condition {
        type_: CONDITION_DEGRADED.to_string(),
        status: ConditionStatus::False,
        last_transition_time: Utc::now().to_rfc3339(),
        reason: "NoIssues".to_string(),
        message: "No degradation detected".to_string(),
    }
}

pub fn deprecation_warning_condition(message: &str) -> Condition {
    Condition {
        type_: CONDITION_DEPRECATION_WARNING.to_string(),
        status: ConditionStatus::True,
        last_transition_time: Utc::now().to_rfc3339(),
        reason: "DeprecatedFieldInUse".to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_condition_adds_new() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            CONDITION_READY,
            ConditionStatus::True,
            "AllHealthy",
            "All checks passed",
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].type_, CONDITION_READY);
        assert_eq!(conditions[0].status, ConditionStatus::True);
    }

    #[test]
    fn set_condition_updates_existing_and_bumps_transition_time_on_status_change() {
        let mut conditions = vec![Condition {
            type_: CONDITION_READY.to_string(),
            status: ConditionStatus::False,
            last_transition_time: "2024-01-01T00:00:00Z".to_string(),
            reason: "NotHealthy".to_string(),
            message: "platform not ready".to_string(),
        }];

        let old_time = conditions[0].last_transition_time.clone();
        set_condition(
            &mut conditions,
            CONDITION_READY,
            ConditionStatus::True,
            "Healthy",
            "platform is ready",
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, ConditionStatus::True);
        assert_ne!(conditions[0].last_transition_time, old_time);
    }

    #[test]
    fn set_condition_keeps_transition_time_when_status_unchanged() {
        let mut conditions = vec![ready_condition("Healthy", "all good")];
        let old_time = conditions[0].last_transition_time.clone();
        set_condition(
            &mut conditions,
            CONDITION_READY,
            ConditionStatus::True,
            "StillHealthy",
            "still all good",
        );
        assert_eq!(conditions[0].last_transition_time, old_time);
    }

    #[test]
    fn is_condition_true_reports_correctly() {
        let conditions = vec![ready_condition("Healthy", "All good")];
        assert!(is_condition_true(&conditions, CONDITION_READY));
        assert!(!is_condition_true(&conditions, CONDITION_DEGRADED));
    }

    #[test]
    fn find_condition_locates_by_type() {
        let conditions = vec![
            ready_condition("Healthy", "All good"),
            progressing_condition("Syncing", "Syncing data"),
        ];
        assert!(find_condition(&conditions, CONDITION_READY).is_some());
        assert!(find_condition(&conditions, CONDITION_PROGRESSING).is_some());
        assert!(find_condition(&conditions, CONDITION_DEGRADED).is_none());
    }
}
