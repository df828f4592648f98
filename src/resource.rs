use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{
    Container, ContainerStatus, Namespace, Pod, PodSpec, PodStatus,
};
use k8s_openapi::api::scheduling::v1::PriorityClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::jiff::Timestamp;
use serde::Serialize;

use crate::error::ModelError;
use crate::model::{Condition, ConditionStatus, ContainerRef, ResourceId, ResourceKind};

#[derive(Debug, Clone)]
pub enum ResourceObject {
    Pod(Pod),
    Deployment(Deployment),
    ReplicaSet(ReplicaSet),
    Namespace(Namespace),
    PriorityClass(PriorityClass),
}

impl ResourceObject {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Pod(_) => ResourceKind::Pods,
            Self::Deployment(_) => ResourceKind::Deployments,
            Self::ReplicaSet(_) => ResourceKind::ReplicaSets,
            Self::Namespace(_) => ResourceKind::Namespaces,
            Self::PriorityClass(_) => ResourceKind::PriorityClasses,
        }
    }

    fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Pod(pod) => &pod.metadata,
            Self::Deployment(deployment) => &deployment.metadata,
            Self::ReplicaSet(replicaset) => &replicaset.metadata,
            Self::Namespace(namespace) => &namespace.metadata,
            Self::PriorityClass(class) => &class.metadata,
        }
    }
}

impl From<Pod> for ResourceObject {
    fn from(value: Pod) -> Self {
        Self::Pod(value)
    }
}

impl From<Deployment> for ResourceObject {
    fn from(value: Deployment) -> Self {
        Self::Deployment(value)
    }
}

impl From<ReplicaSet> for ResourceObject {
    fn from(value: ReplicaSet) -> Self {
        Self::ReplicaSet(value)
    }
}

impl From<Namespace> for ResourceObject {
    fn from(value: Namespace) -> Self {
        Self::Namespace(value)
    }
}

impl From<PriorityClass> for ResourceObject {
    fn from(value: PriorityClass) -> Self {
        Self::PriorityClass(value)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct PodDetailedStatus {
    pub ready_containers: usize,
    pub total_containers: usize,
    pub restarts: i32,
    pub last_restart: Option<Timestamp>,
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ResourceModel {
    id: ResourceId,
    object: ResourceObject,
}

impl ResourceModel {
    pub fn new(object: impl Into<ResourceObject>) -> Result<Self, ModelError> {
        let object = object.into();
        let kind = object.kind();
        let metadata = object.metadata();
        let name = metadata.name.clone().unwrap_or_default();
        if name.is_empty() {
            return Err(ModelError::EmptyName { kind });
        }

        let namespace = metadata
            .namespace
            .clone()
            .filter(|namespace| !namespace.is_empty());
        match (kind.namespaced(), namespace.as_ref()) {
            (true, None) => return Err(ModelError::MissingNamespace { kind, name }),
            (false, Some(namespace)) => {
                return Err(ModelError::UnexpectedNamespace {
                    kind,
                    name,
                    namespace: namespace.clone(),
                });
            }
            _ => {}
        }

        Ok(Self {
            id: ResourceId {
                kind,
                namespace,
                name,
            },
            object,
        })
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.id.kind
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.id.namespace.as_deref()
    }

    pub fn creation_timestamp(&self) -> Option<Timestamp> {
        self.object
            .metadata()
            .creation_timestamp
            .as_ref()
            .map(|time| time.0)
    }

    pub fn is_terminating(&self) -> bool {
        self.object.metadata().deletion_timestamp.is_some()
    }

    pub fn as_pod(&self) -> Option<&Pod> {
        match &self.object {
            ResourceObject::Pod(pod) => Some(pod),
            _ => None,
        }
    }

    pub fn conditions(&self) -> Vec<Condition> {
        match &self.object {
            ResourceObject::Pod(pod) => pod
                .status
                .as_ref()
                .and_then(|status| status.conditions.as_ref())
                .into_iter()
                .flatten()
                .map(|c| condition(&c.type_, &c.status, c.message.as_deref()))
                .collect(),
            ResourceObject::Deployment(deployment) => deployment
                .status
                .as_ref()
                .and_then(|status| status.conditions.as_ref())
                .into_iter()
                .flatten()
                .map(|c| condition(&c.type_, &c.status, c.message.as_deref()))
                .collect(),
            ResourceObject::ReplicaSet(replicaset) => replicaset
                .status
                .as_ref()
                .and_then(|status| status.conditions.as_ref())
                .into_iter()
                .flatten()
                .map(|c| condition(&c.type_, &c.status, c.message.as_deref()))
                .collect(),
            ResourceObject::Namespace(namespace) => namespace
                .status
                .as_ref()
                .and_then(|status| status.conditions.as_ref())
                .into_iter()
                .flatten()
                .map(|c| condition(&c.type_, &c.status, c.message.as_deref()))
                .collect(),
            ResourceObject::PriorityClass(_) => Vec::new(),
        }
    }

    pub fn containers(&self) -> Vec<ContainerRef> {
        self.pod_spec()
            .map(|spec| spec.containers.iter().map(container_ref).collect())
            .unwrap_or_default()
    }

    pub fn container_names(&self) -> Vec<String> {
        self.containers()
            .into_iter()
            .map(|container| container.name)
            .collect()
    }

    pub fn container_images(&self) -> Vec<String> {
        self.containers()
            .into_iter()
            .map(|container| container.image)
            .collect()
    }

    pub fn match_labels_list(&self) -> Vec<String> {
        let selector: Option<&LabelSelector> = match &self.object {
            ResourceObject::Deployment(deployment) => {
                deployment.spec.as_ref().map(|spec| &spec.selector)
            }
            ResourceObject::ReplicaSet(replicaset) => {
                replicaset.spec.as_ref().map(|spec| &spec.selector)
            }
            _ => None,
        };

        selector
            .and_then(|selector| selector.match_labels.as_ref())
            .map(|labels| {
                labels
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn spec_replicas(&self) -> i32 {
        match &self.object {
            ResourceObject::Deployment(deployment) => deployment
                .spec
                .as_ref()
                .and_then(|spec| spec.replicas)
                .unwrap_or(0),
            ResourceObject::ReplicaSet(replicaset) => replicaset
                .spec
                .as_ref()
                .and_then(|spec| spec.replicas)
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn status_replicas(&self) -> i32 {
        match &self.object {
            ResourceObject::Deployment(deployment) => deployment
                .status
                .as_ref()
                .and_then(|status| status.replicas)
                .unwrap_or(0),
            ResourceObject::ReplicaSet(replicaset) => replicaset
                .status
                .as_ref()
                .map(|status| status.replicas)
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn available_replicas(&self) -> i32 {
        match &self.object {
            ResourceObject::Deployment(deployment) => deployment
                .status
                .as_ref()
                .and_then(|status| status.available_replicas)
                .unwrap_or(0),
            ResourceObject::ReplicaSet(replicaset) => replicaset
                .status
                .as_ref()
                .and_then(|status| status.available_replicas)
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn ready_replicas(&self) -> i32 {
        match &self.object {
            ResourceObject::Deployment(deployment) => deployment
                .status
                .as_ref()
                .and_then(|status| status.ready_replicas)
                .unwrap_or(0),
            ResourceObject::ReplicaSet(replicaset) => replicaset
                .status
                .as_ref()
                .and_then(|status| status.ready_replicas)
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn observed_generation(&self) -> Option<i64> {
        match &self.object {
            ResourceObject::Deployment(deployment) => deployment
                .status
                .as_ref()
                .and_then(|status| status.observed_generation),
            ResourceObject::ReplicaSet(replicaset) => replicaset
                .status
                .as_ref()
                .and_then(|status| status.observed_generation),
            _ => None,
        }
    }

    pub fn phase(&self) -> Option<&str> {
        match &self.object {
            ResourceObject::Pod(pod) => pod_status(pod).and_then(|status| status.phase.as_deref()),
            ResourceObject::Namespace(namespace) => namespace
                .status
                .as_ref()
                .and_then(|status| status.phase.as_deref()),
            _ => None,
        }
    }

    pub fn pod_ip(&self) -> Option<&str> {
        self.as_pod()
            .and_then(pod_status)
            .and_then(|status| status.pod_ip.as_deref())
    }

    pub fn node_name(&self) -> Option<&str> {
        self.pod_spec().and_then(|spec| spec.node_name.as_deref())
    }

    pub fn nominated_node_name(&self) -> Option<&str> {
        self.as_pod()
            .and_then(pod_status)
            .and_then(|status| status.nominated_node_name.as_deref())
    }

    pub fn readiness_gate_types(&self) -> Vec<String> {
        self.as_pod()
            .and_then(|pod| pod.spec.as_ref())
            .and_then(|spec| spec.readiness_gates.as_ref())
            .into_iter()
            .flatten()
            .map(|gate| gate.condition_type.clone())
            .collect()
    }

    pub fn priority_value(&self) -> Option<i32> {
        match &self.object {
            ResourceObject::PriorityClass(class) => Some(class.value),
            _ => None,
        }
    }

    pub fn global_default(&self) -> Option<bool> {
        match &self.object {
            ResourceObject::PriorityClass(class) => class.global_default,
            _ => None,
        }
    }

    pub fn preemption_policy(&self) -> Option<&str> {
        match &self.object {
            ResourceObject::PriorityClass(class) => class.preemption_policy.as_deref(),
            _ => None,
        }
    }

    pub fn detailed_status(&self) -> PodDetailedStatus {
        let Some(pod) = self.as_pod() else {
            return PodDetailedStatus::default();
        };

        let status = pod_status(pod);
        let statuses = status
            .and_then(|status| status.container_statuses.as_deref())
            .unwrap_or(&[]);
        let declared = pod.spec.as_ref().map(|spec| spec.containers.len()).unwrap_or(0);
        let total_containers = if statuses.is_empty() {
            declared
        } else {
            statuses.len()
        };
        let ready_containers = statuses.iter().filter(|container| container.ready).count();
        let restarts = statuses
            .iter()
            .map(|container| container.restart_count)
            .sum();
        let last_restart = statuses.iter().filter_map(last_restart_time).max();

        let (reason, container_message) = if self.is_terminating() {
            ("Terminating".to_string(), None)
        } else {
            init_container_reason(status)
                .or_else(|| container_reason(statuses))
                .unwrap_or_else(|| (fallback_reason(status), None))
        };

        let message = status
            .and_then(|status| status.message.clone())
            .filter(|message| !message.is_empty())
            .or(container_message)
            .unwrap_or_default();

        PodDetailedStatus {
            ready_containers,
            total_containers,
            restarts,
            last_restart,
            reason,
            message,
        }
    }

    pub fn to_yaml(&self) -> String {
        match &self.object {
            ResourceObject::Pod(pod) => yaml_detail(pod),
            ResourceObject::Deployment(deployment) => yaml_detail(deployment),
            ResourceObject::ReplicaSet(replicaset) => yaml_detail(replicaset),
            ResourceObject::Namespace(namespace) => yaml_detail(namespace),
            ResourceObject::PriorityClass(class) => yaml_detail(class),
        }
    }

    fn pod_spec(&self) -> Option<&PodSpec> {
        match &self.object {
            ResourceObject::Pod(pod) => pod.spec.as_ref(),
            ResourceObject::Deployment(deployment) => deployment
                .spec
                .as_ref()
                .and_then(|spec| spec.template.spec.as_ref()),
            ResourceObject::ReplicaSet(replicaset) => replicaset
                .spec
                .as_ref()
                .and_then(|spec| spec.template.as_ref())
                .and_then(|template| template.spec.as_ref()),
            _ => None,
        }
    }
}

fn pod_status(pod: &Pod) -> Option<&PodStatus> {
    pod.status.as_ref()
}

fn condition(type_: &str, status: &str, message: Option<&str>) -> Condition {
    Condition {
        type_: type_.to_string(),
        status: ConditionStatus::parse(status),
        message: message.map(str::to_string),
    }
}

fn container_ref(container: &Container) -> ContainerRef {
    ContainerRef {
        name: container.name.clone(),
        image: container.image.clone().unwrap_or_default(),
    }
}

fn last_restart_time(container: &ContainerStatus) -> Option<Timestamp> {
    container
        .last_state
        .as_ref()
        .and_then(|state| state.terminated.as_ref())
        .and_then(|terminated| terminated.finished_at.as_ref())
        .map(|time| time.0)
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|value| !value.is_empty()).cloned()
}

fn init_container_reason(status: Option<&PodStatus>) -> Option<(String, Option<String>)> {
    let init_statuses = status?.init_container_statuses.as_deref()?;
    let total = init_statuses.len();

    for (index, container) in init_statuses.iter().enumerate() {
        let Some(state) = container.state.as_ref() else {
            continue;
        };
        if let Some(terminated) = state.terminated.as_ref() {
            if terminated.exit_code == 0 {
                continue;
            }
            let reason = non_empty(terminated.reason.as_ref())
                .unwrap_or_else(|| terminated_label(terminated.signal, terminated.exit_code));
            return Some((format!("Init:{reason}"), terminated.message.clone()));
        }
        if let Some(waiting) = state.waiting.as_ref()
            && let Some(reason) = non_empty(waiting.reason.as_ref())
            && reason != "PodInitializing"
        {
            return Some((format!("Init:{reason}"), waiting.message.clone()));
        }
        return Some((format!("Init:{index}/{total}"), None));
    }

    None
}

/// The first container that is not both running and ready decides the reason.
fn container_reason(statuses: &[ContainerStatus]) -> Option<(String, Option<String>)> {
    for container in statuses {
        let Some(state) = container.state.as_ref() else {
            continue;
        };
        if state.running.is_some() && container.ready {
            continue;
        }
        if let Some(waiting) = state.waiting.as_ref()
            && let Some(reason) = non_empty(waiting.reason.as_ref())
        {
            return Some((reason, waiting.message.clone()));
        }
        if let Some(terminated) = state.terminated.as_ref() {
            let reason = non_empty(terminated.reason.as_ref())
                .unwrap_or_else(|| terminated_label(terminated.signal, terminated.exit_code));
            return Some((reason, terminated.message.clone()));
        }
    }

    None
}

fn fallback_reason(status: Option<&PodStatus>) -> String {
    status
        .and_then(|status| non_empty(status.reason.as_ref()).or_else(|| non_empty(status.phase.as_ref())))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn terminated_label(signal: Option<i32>, exit_code: i32) -> String {
    match signal {
        Some(signal) if signal != 0 => format!("Signal:{signal}"),
        _ => format!("ExitCode:{exit_code}"),
    }
}

pub fn age_label(timestamp: Option<Timestamp>, now: Timestamp) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };

    format_elapsed_seconds((now.as_second() - timestamp.as_second()).max(0))
}

pub fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }

    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }

    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }

    format!("{seconds}s")
}

fn yaml_detail<T>(value: &T) -> String
where
    T: Serialize,
{
    serde_yaml::to_string(value).unwrap_or_else(|error| format!("failed to format detail: {error}"))
}
