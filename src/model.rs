use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Pods,
    Deployments,
    ReplicaSets,
    Namespaces,
    PriorityClasses,
}

impl ResourceKind {
    pub const ALL: [Self; 5] = [
        Self::Pods,
        Self::Deployments,
        Self::ReplicaSets,
        Self::Namespaces,
        Self::PriorityClasses,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Pods => "Pods",
            Self::Deployments => "Deployments",
            Self::ReplicaSets => "Replica Sets",
            Self::Namespaces => "Namespaces",
            Self::PriorityClasses => "Priority Classes",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Pods => "pods",
            Self::Deployments => "deployments",
            Self::ReplicaSets => "replicasets",
            Self::Namespaces => "namespaces",
            Self::PriorityClasses => "priorityclasses",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.path() == path)
    }

    pub fn namespaced(self) -> bool {
        matches!(self, Self::Pods | Self::Deployments | Self::ReplicaSets)
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "po" | "pod" | "pods" => Some(Self::Pods),
            "deploy" | "deployment" | "deployments" | "dp" => Some(Self::Deployments),
            "rs" | "replicaset" | "replicasets" | "replica-set" | "replica-sets" => {
                Some(Self::ReplicaSets)
            }
            "ns" | "namespace" | "namespaces" => Some(Self::Namespaces),
            "pc" | "priorityclass" | "priorityclasses" | "priority-class" | "priority-classes" => {
                Some(Self::PriorityClasses)
            }
            _ => None,
        }
    }

    pub fn short_token(self) -> &'static str {
        match self {
            Self::Pods => "po",
            Self::Deployments => "deploy",
            Self::ReplicaSets => "rs",
            Self::Namespaces => "ns",
            Self::PriorityClasses => "pc",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceKind, namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.map(str::to_string),
            name: name.into(),
        }
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}", namespace, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "True" => Self::True,
            "False" => Self::False,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Condition {
    pub type_: String,
    pub status: ConditionStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContainerRef {
    pub name: String,
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::{ConditionStatus, NamespaceScope, ResourceId, ResourceKind};

    #[test]
    fn resource_aliases_map_to_expected_kinds() {
        assert_eq!(ResourceKind::from_token("po"), Some(ResourceKind::Pods));
        assert_eq!(
            ResourceKind::from_token("Deployments"),
            Some(ResourceKind::Deployments)
        );
        assert_eq!(
            ResourceKind::from_token("replica-sets"),
            Some(ResourceKind::ReplicaSets)
        );
        assert_eq!(
            ResourceKind::from_token("pc"),
            Some(ResourceKind::PriorityClasses)
        );
        assert_eq!(ResourceKind::from_token("services"), None);
    }

    #[test]
    fn path_round_trips_through_from_path() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_path(kind.path()), Some(kind));
        }
        assert_eq!(ResourceKind::from_path("pod"), None);
    }

    #[test]
    fn only_workload_kinds_are_namespaced() {
        assert!(ResourceKind::Pods.namespaced());
        assert!(ResourceKind::ReplicaSets.namespaced());
        assert!(!ResourceKind::Namespaces.namespaced());
        assert!(!ResourceKind::PriorityClasses.namespaced());
    }

    #[test]
    fn condition_status_defaults_to_unknown() {
        assert_eq!(ConditionStatus::parse("True"), ConditionStatus::True);
        assert_eq!(ConditionStatus::parse("false"), ConditionStatus::Unknown);
        assert_eq!(ConditionStatus::parse(""), ConditionStatus::Unknown);
    }

    #[test]
    fn resource_id_displays_namespace_prefix() {
        let pod = ResourceId::new(ResourceKind::Pods, Some("default"), "web-0");
        let ns = ResourceId::new(ResourceKind::Namespaces, None, "default");
        assert_eq!(pod.to_string(), "default/web-0");
        assert_eq!(ns.to_string(), "default");
    }

    #[test]
    fn namespace_scope_displays_all_or_the_name() {
        assert_eq!(NamespaceScope::All.to_string(), "all");
        assert_eq!(NamespaceScope::Named("kube-system".to_string()).to_string(), "kube-system");
    }
}
