use std::cmp::Ordering;

use crate::model::{Condition, ConditionStatus, ResourceKind};
use crate::resource::ResourceModel;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Classification {
    Success,
    Warning,
    Error,
    None,
}

impl Classification {
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StatusSummary {
    pub classification: Classification,
    pub reason: String,
    pub tooltip: String,
}

impl StatusSummary {
    fn none() -> Self {
        Self {
            classification: Classification::None,
            reason: String::new(),
            tooltip: String::new(),
        }
    }
}

/// Health signal for a single resource. Never fails: missing fields resolve to
/// `Classification::None` or an empty reason.
pub fn derive(model: &ResourceModel) -> StatusSummary {
    match model.kind() {
        ResourceKind::Pods => derive_pod(model),
        ResourceKind::Namespaces => derive_namespace(model),
        ResourceKind::Deployments | ResourceKind::ReplicaSets | ResourceKind::PriorityClasses => {
            StatusSummary::none()
        }
    }
}

fn derive_pod(model: &ResourceModel) -> StatusSummary {
    let phase = model.phase().unwrap_or_default();
    let classification = match phase {
        "Failed" => Classification::Error,
        "Succeeded" => Classification::Success,
        "Running" if has_true_condition(&model.conditions(), "Ready") => Classification::Success,
        "Running" => Classification::Warning,
        _ => Classification::None,
    };

    let detailed = model.detailed_status();
    let tooltip = if detailed.message.is_empty() {
        format!(
            "Ready {}/{}, restarts {}",
            detailed.ready_containers, detailed.total_containers, detailed.restarts
        )
    } else {
        detailed.message.clone()
    };

    StatusSummary {
        classification,
        reason: detailed.reason,
        tooltip,
    }
}

fn derive_namespace(model: &ResourceModel) -> StatusSummary {
    let phase = model.phase().unwrap_or_default().to_string();
    let classification = match phase.as_str() {
        "Active" => Classification::Success,
        "Terminating" => Classification::Warning,
        _ => Classification::None,
    };

    StatusSummary {
        classification,
        tooltip: phase.clone(),
        reason: phase,
    }
}

fn has_true_condition(conditions: &[Condition], type_: &str) -> bool {
    conditions
        .iter()
        .any(|condition| condition.type_ == type_ && condition.status == ConditionStatus::True)
}

/// Conditions ordered by type; `sort_by` is stable so equal types keep their
/// observed order.
pub fn condition_badges(model: &ResourceModel) -> Vec<Condition> {
    let mut conditions = model.conditions();
    conditions.sort_by(|left, right| left.type_.cmp(&right.type_));
    conditions
}

pub fn compare_replica_availability(left: &ResourceModel, right: &ResourceModel) -> Ordering {
    left.available_replicas()
        .cmp(&right.available_replicas())
        .then_with(|| left.status_replicas().cmp(&right.status_replicas()))
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReadinessGateRatio {
    pub ready: usize,
    pub total: usize,
    pub entries: Vec<(String, ConditionStatus)>,
}

impl ReadinessGateRatio {
    pub fn label(&self) -> String {
        format!("{}/{}", self.ready, self.total)
    }
}

pub fn readiness_gates(model: &ResourceModel) -> Option<ReadinessGateRatio> {
    let gates = model.readiness_gate_types();
    if gates.is_empty() {
        return None;
    }

    let conditions = model.conditions();
    let entries: Vec<(String, ConditionStatus)> = gates
        .into_iter()
        .map(|gate| {
            let status = conditions
                .iter()
                .find(|condition| condition.type_ == gate)
                .map(|condition| condition.status)
                .unwrap_or(ConditionStatus::Unknown);
            (gate, status)
        })
        .collect();
    let ready = entries
        .iter()
        .filter(|(_, status)| *status == ConditionStatus::True)
        .count();

    Some(ReadinessGateRatio {
        ready,
        total: entries.len(),
        entries,
    })
}

pub fn compare_readiness_gates(left: &ResourceModel, right: &ResourceModel) -> Ordering {
    let key = |model: &ResourceModel| {
        readiness_gates(model)
            .map(|ratio| (ratio.total, ratio.ready))
            .unwrap_or((0, 0))
    };
    key(left).cmp(&key(right))
}

#[cfg(test)]
mod tests {
    use super::{
        Classification, compare_replica_availability, condition_badges, derive, readiness_gates,
    };
    use crate::model::ResourceKind;
    use crate::resource::fixtures::{deployment, model, pod};
    use proptest::prelude::*;
    use serde_json::{Value, json};
    use std::cmp::Ordering;

    fn conditions_strategy() -> impl Strategy<Value = Vec<Value>> {
        prop::collection::vec(
            (
                prop::sample::select(vec!["Ready", "Initialized", "PodScheduled"]),
                prop::sample::select(vec!["True", "False", "Unknown"]),
            )
                .prop_map(|(type_, status)| json!({ "type": type_, "status": status })),
            0..5,
        )
    }

    proptest! {
        #[test]
        fn succeeded_pods_are_always_success(conditions in conditions_strategy()) {
            let model = pod("job", json!({ "phase": "Succeeded", "conditions": conditions }));
            prop_assert_eq!(derive(&model).classification, Classification::Success);
        }

        #[test]
        fn replica_comparator_is_lexicographic(
            a in 0..5i32, ar in 0..5i32, b in 0..5i32, br in 0..5i32
        ) {
            let left = deployment("left", Some(ar), Some(a));
            let right = deployment("right", Some(br), Some(b));
            prop_assert_eq!(
                compare_replica_availability(&left, &right),
                (a - b, ar - br).cmp(&(0, 0))
            );
        }
    }

    #[test]
    fn failed_pod_is_error_with_detailed_reason() {
        let model = pod("web", json!({ "phase": "Failed", "reason": "DeadlineExceeded" }));
        let summary = derive(&model);
        assert_eq!(summary.classification, Classification::Error);
        assert_eq!(summary.reason, "DeadlineExceeded");
        assert_eq!(summary.tooltip, "Ready 0/1, restarts 0");
    }

    #[test]
    fn running_pod_needs_ready_condition() {
        let not_ready = pod(
            "web",
            json!({ "phase": "Running", "conditions": [{ "type": "Ready", "status": "False" }] }),
        );
        assert_eq!(derive(&not_ready).classification, Classification::Warning);

        let ready = pod(
            "web",
            json!({ "phase": "Running", "conditions": [{ "type": "Ready", "status": "True" }] }),
        );
        assert_eq!(derive(&ready).classification, Classification::Success);

        let pending = pod("web", json!({ "phase": "Pending" }));
        assert_eq!(derive(&pending).classification, Classification::None);
    }

    #[test]
    fn pod_without_status_is_unclassified_but_still_summarized() {
        let fresh = model(
            ResourceKind::Pods,
            json!({
                "apiVersion": "v1", "kind": "Pod",
                "metadata": { "name": "fresh", "namespace": "default" },
                "spec": { "containers": [{ "name": "app", "image": "nginx" }] }
            }),
        );
        let summary = derive(&fresh);
        assert_eq!(summary.classification, Classification::None);
        assert_eq!(summary.tooltip, "Ready 0/1, restarts 0");

        let unknown = pod("web", json!({ "phase": "Unknown" }));
        assert_eq!(derive(&unknown).classification, Classification::None);
    }

    #[test]
    fn namespaces_and_workloads_classify_by_kind() {
        let terminating = model(
            ResourceKind::Namespaces,
            json!({
                "apiVersion": "v1", "kind": "Namespace",
                "metadata": { "name": "old" },
                "status": { "phase": "Terminating" }
            }),
        );
        assert_eq!(derive(&terminating).classification, Classification::Warning);
        assert_eq!(
            derive(&deployment("api", None, None)).classification,
            Classification::None
        );
    }

    #[test]
    fn badges_sort_by_type_and_keep_ties_in_order() {
        let model = model(
            ResourceKind::Deployments,
            json!({
                "apiVersion": "apps/v1", "kind": "Deployment",
                "metadata": { "name": "api", "namespace": "default" },
                "status": { "conditions": [
                    { "type": "Progressing", "status": "True", "message": "first" },
                    { "type": "Available", "status": "False" },
                    { "type": "Progressing", "status": "Unknown", "message": "second" }
                ]}
            }),
        );

        let badges = condition_badges(&model);
        let types: Vec<&str> = badges.iter().map(|badge| badge.type_.as_str()).collect();
        assert_eq!(types, vec!["Available", "Progressing", "Progressing"]);
        assert_eq!(badges[1].message.as_deref(), Some("first"));
        assert_eq!(badges[2].message.as_deref(), Some("second"));
    }

    #[test]
    fn availability_tie_breaks_on_replicas() {
        let three = deployment("three", Some(3), Some(1));
        let two = deployment("two", Some(2), Some(1));
        assert_eq!(compare_replica_availability(&three, &two), Ordering::Greater);

        let empty = deployment("empty", None, None);
        assert_eq!(compare_replica_availability(&empty, &two), Ordering::Less);
    }

    #[test]
    fn readiness_gates_count_only_true_conditions() {
        let gated = model(
            ResourceKind::Pods,
            json!({
                "apiVersion": "v1", "kind": "Pod",
                "metadata": { "name": "web", "namespace": "default" },
                "spec": {
                    "containers": [{ "name": "app" }],
                    "readinessGates": [
                        { "conditionType": "Ready" },
                        { "conditionType": "ContainersReady" }
                    ]
                },
                "status": { "conditions": [{ "type": "Ready", "status": "True" }] }
            }),
        );

        let ratio = readiness_gates(&gated).expect("gates declared");
        assert_eq!(ratio.label(), "1/2");

        let plain = pod("web", json!({ "phase": "Running" }));
        assert_eq!(readiness_gates(&plain), None);
    }
}
