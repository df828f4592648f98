use crate::model::{ResourceId, ResourceKind};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ListRoute {
    pub cluster: String,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RouteMatch {
    List,
    Resource(ResourceId),
    Foreign,
}

impl ListRoute {
    pub fn new(cluster: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            cluster: cluster.into(),
            kind,
        }
    }

    pub fn path(&self) -> String {
        format!("/c/{}/{}", self.cluster, self.kind.path())
    }

    pub fn resource_path(&self, id: &ResourceId) -> String {
        match &id.namespace {
            Some(namespace) => format!("{}/{}/{}", self.path(), namespace, id.name),
            None => format!("{}/{}", self.path(), id.name),
        }
    }

    pub fn classify(&self, path: &str) -> RouteMatch {
        let segments: Vec<&str> = path
            .trim_end_matches('/')
            .split('/')
            .skip(1)
            .collect();

        let ["c", cluster, kind, rest @ ..] = segments.as_slice() else {
            return RouteMatch::Foreign;
        };
        if *cluster != self.cluster || ResourceKind::from_path(kind) != Some(self.kind) {
            return RouteMatch::Foreign;
        }

        match (self.kind.namespaced(), rest) {
            (_, []) => RouteMatch::List,
            (true, [namespace, name]) if !namespace.is_empty() && !name.is_empty() => {
                RouteMatch::Resource(ResourceId::new(self.kind, Some(*namespace), *name))
            }
            (false, [name]) if !name.is_empty() => {
                RouteMatch::Resource(ResourceId::new(self.kind, None, *name))
            }
            _ => RouteMatch::Foreign,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.classify(path) != RouteMatch::Foreign
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct History {
    entries: Vec<String>,
    index: usize,
}

impl History {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: vec![initial.into()],
            index: 0,
        }
    }

    pub fn current(&self) -> &str {
        &self.entries[self.index]
    }

    pub fn push(&mut self, path: impl Into<String>) {
        self.entries.truncate(self.index + 1);
        self.entries.push(path.into());
        self.index = self.entries.len() - 1;
    }

    pub fn replace(&mut self, path: impl Into<String>) {
        self.entries[self.index] = path.into();
    }

    pub fn back(&mut self) -> Option<&str> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::{History, ListRoute, RouteMatch};
    use crate::model::{ResourceId, ResourceKind};

    #[test]
    fn classifies_list_resource_and_foreign_paths() {
        let route = ListRoute::new("prod", ResourceKind::Pods);
        assert_eq!(route.path(), "/c/prod/pods");
        assert_eq!(route.classify("/c/prod/pods"), RouteMatch::List);
        assert_eq!(route.classify("/c/prod/pods/"), RouteMatch::List);
        assert_eq!(
            route.classify("/c/prod/pods/default/web-0"),
            RouteMatch::Resource(ResourceId::new(ResourceKind::Pods, Some("default"), "web-0"))
        );
        assert_eq!(route.classify("/c/prod/deployments"), RouteMatch::Foreign);
        assert_eq!(route.classify("/c/staging/pods"), RouteMatch::Foreign);
        assert_eq!(route.classify("/c/prod/pods/web-0"), RouteMatch::Foreign);
        assert_eq!(route.classify("/settings"), RouteMatch::Foreign);
    }

    #[test]
    fn cluster_scoped_resource_paths_omit_namespace() {
        let route = ListRoute::new("prod", ResourceKind::Namespaces);
        let id = ResourceId::new(ResourceKind::Namespaces, None, "kube-system");
        assert_eq!(route.resource_path(&id), "/c/prod/namespaces/kube-system");
        assert_eq!(
            route.classify("/c/prod/namespaces/kube-system"),
            RouteMatch::Resource(id)
        );
    }

    #[test]
    fn replace_rewrites_without_adding_entries() {
        let mut history = History::new("/c/prod/pods");
        history.replace("/c/prod/pods/default/web-0");
        assert_eq!(history.current(), "/c/prod/pods/default/web-0");
        history.push("/c/prod/deployments");
        history.push("/c/prod/namespaces");
        history.back();
        history.push("/c/prod/priorityclasses");
        assert_eq!(history.back(), Some("/c/prod/deployments"));
        assert_eq!(history.back(), Some("/c/prod/pods/default/web-0"));
        assert_eq!(history.back(), None);
    }
}
