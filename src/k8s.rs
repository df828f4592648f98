use anyhow::{Context, Result};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{Namespace, Pod};
use k8s_openapi::api::scheduling::v1::PriorityClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::model::{NamespaceScope, ResourceId, ResourceKind};
use crate::resource::{ResourceModel, ResourceObject};

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
    default_namespace: String,
}

impl KubeGateway {
    pub async fn new() -> Result<Self> {
        Self::from_kube_selection(None).await
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    async fn from_kube_selection(context: Option<String>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().ok();

        let config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .context("failed to infer Kubernetes configuration")?
        } else {
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;

        let active_context = context
            .or_else(|| {
                kubeconfig
                    .as_ref()
                    .and_then(|cfg| cfg.current_context.clone())
            })
            .unwrap_or_else(|| "in-cluster".to_string());
        let cluster = kubeconfig
            .as_ref()
            .and_then(|cfg| cluster_for_context(cfg, &active_context))
            .unwrap_or_else(|| "in-cluster".to_string());

        debug!(context = %active_context, cluster = %cluster, "kubernetes client ready");
        Ok(Self {
            client,
            context: active_context,
            cluster,
            default_namespace,
        })
    }

    pub async fn list(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> Result<Vec<ResourceModel>, ApiError> {
        let mut models = match kind {
            ResourceKind::Pods => collect(self.scoped_api::<Pod>(scope)).await?,
            ResourceKind::Deployments => collect(self.scoped_api::<Deployment>(scope)).await?,
            ResourceKind::ReplicaSets => collect(self.scoped_api::<ReplicaSet>(scope)).await?,
            ResourceKind::Namespaces => {
                collect(Api::<Namespace>::all(self.client.clone())).await?
            }
            ResourceKind::PriorityClasses => {
                collect(Api::<PriorityClass>::all(self.client.clone())).await?
            }
        };

        models.sort_by(|left, right| {
            left.namespace()
                .cmp(&right.namespace())
                .then_with(|| left.name().cmp(right.name()))
        });
        Ok(models)
    }

    pub async fn delete(&self, id: &ResourceId) -> Result<(), ApiError> {
        let params = DeleteParams::default();
        match id.kind {
            ResourceKind::Pods => {
                let _ = self
                    .namespaced_api::<Pod>(id)?
                    .delete(&id.name, &params)
                    .await?;
            }
            ResourceKind::Deployments => {
                let _ = self
                    .namespaced_api::<Deployment>(id)?
                    .delete(&id.name, &params)
                    .await?;
            }
            ResourceKind::ReplicaSets => {
                let _ = self
                    .namespaced_api::<ReplicaSet>(id)?
                    .delete(&id.name, &params)
                    .await?;
            }
            ResourceKind::Namespaces => {
                let api: Api<Namespace> = Api::all(self.client.clone());
                let _ = api.delete(&id.name, &params).await?;
            }
            ResourceKind::PriorityClasses => {
                let api: Api<PriorityClass> = Api::all(self.client.clone());
                let _ = api.delete(&id.name, &params).await?;
            }
        }

        Ok(())
    }

    pub async fn create_namespace(&self, name: &str) -> Result<(), ApiError> {
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        };
        let api: Api<Namespace> = Api::all(self.client.clone());
        let _ = api.create(&PostParams::default(), &namespace).await?;
        Ok(())
    }

    pub async fn scale(&self, id: &ResourceId, replicas: i32) -> Result<(), ApiError> {
        let patch = serde_json::json!({ "spec": { "replicas": replicas } });
        let params = PatchParams::default();

        match id.kind {
            ResourceKind::Deployments => {
                let _ = self
                    .namespaced_api::<Deployment>(id)?
                    .patch(&id.name, &params, &Patch::Merge(&patch))
                    .await?;
            }
            ResourceKind::ReplicaSets => {
                let _ = self
                    .namespaced_api::<ReplicaSet>(id)?
                    .patch(&id.name, &params, &Patch::Merge(&patch))
                    .await?;
            }
            kind => {
                return Err(ApiError::new(
                    None,
                    format!("scale is not supported for {}", kind.title()),
                ));
            }
        }

        Ok(())
    }

    fn scoped_api<K>(&self, scope: &NamespaceScope) -> Api<K>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        match scope {
            NamespaceScope::All => Api::all(self.client.clone()),
            NamespaceScope::Named(namespace) => Api::namespaced(self.client.clone(), namespace),
        }
    }

    fn namespaced_api<K>(&self, id: &ResourceId) -> Result<Api<K>, ApiError>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        let namespace = id.namespace.as_deref().ok_or_else(|| {
            ApiError::new(
                None,
                format!("namespace is required for {} {}", id.kind.title(), id.name),
            )
        })?;
        Ok(Api::namespaced(self.client.clone(), namespace))
    }
}

async fn collect<K>(api: Api<K>) -> Result<Vec<ResourceModel>, ApiError>
where
    K: Clone + Debug + DeserializeOwned + Into<ResourceObject>,
{
    let mut models = Vec::new();
    let mut continue_token: Option<String> = None;
    loop {
        let list = api.list(&list_params(continue_token.as_deref())).await?;
        continue_token = next_page_token(list.metadata.continue_.as_deref());
        models.extend(list.items.into_iter().filter_map(|item| {
            match ResourceModel::new(item) {
                Ok(model) => Some(model),
                Err(error) => {
                    warn!("skipping object: {error}");
                    None
                }
            }
        }));
        if continue_token.is_none() {
            break;
        }
        debug!(fetched = models.len(), "fetching next list page");
    }
    Ok(models)
}

fn cluster_for_context(kubeconfig: &Kubeconfig, context: &str) -> Option<String> {
    kubeconfig
        .contexts
        .iter()
        .find(|named| named.name == context)
        .and_then(|named| named.context.as_ref())
        .map(|context| context.cluster.clone())
        .filter(|cluster| !cluster.is_empty())
}

fn list_params(continue_token: Option<&str>) -> ListParams {
    let params = ListParams::default().limit(500);
    match continue_token {
        Some(token) => params.continue_token(token),
        None => params,
    }
}

fn next_page_token(raw: Option<&str>) -> Option<String> {
    raw.filter(|token| !token.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{cluster_for_context, list_params, next_page_token};
    use kube::config::Kubeconfig;

    #[test]
    fn cluster_name_comes_from_the_active_context() {
        let kubeconfig = Kubeconfig::from_yaml(
            r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
  - name: dev-cluster
    cluster:
      server: https://127.0.0.1:6443
contexts:
  - name: dev
    context:
      cluster: dev-cluster
      user: dev-user
users:
  - name: dev-user
    user: {}
"#,
        )
        .unwrap();

        assert_eq!(
            cluster_for_context(&kubeconfig, "dev").as_deref(),
            Some("dev-cluster")
        );
        assert_eq!(cluster_for_context(&kubeconfig, "prod"), None);
    }

    #[test]
    fn list_pages_follow_the_continue_token_until_it_is_empty() {
        let first = list_params(None);
        assert_eq!(first.limit, Some(500));
        assert_eq!(first.continue_token, None);

        let next = next_page_token(Some("eyJvZmZzZXQiOjUwMH0"));
        let second = list_params(next.as_deref());
        assert_eq!(second.limit, Some(500));
        assert_eq!(second.continue_token.as_deref(), Some("eyJvZmZzZXQiOjUwMH0"));

        assert_eq!(next_page_token(Some("")), None);
        assert_eq!(next_page_token(None), None);
    }
}
