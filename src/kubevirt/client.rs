/// Infra cluster client: Kubernetes core APIs plus KubeVirt/CDI resources
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, ResourceExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::resources::{label_selector, matches_labels, ResourceKind};
use super::InfraError;
use crate::utils::polling::{PollError, PollingConfig};

/// Checks made after a delete before giving up on the resource disappearing
pub const DELETE_WAIT_ATTEMPTS: u32 = 5;
/// Pause before each of those checks
pub const DELETE_WAIT_INTERVAL: Duration = Duration::from_secs(1);

/// Operations the installer needs from the infra cluster
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InfraClient: Send + Sync {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, InfraError>;

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, InfraError>;

    async fn get_storage_class(&self, name: &str) -> Result<StorageClass, InfraError>;

    async fn get_network_attachment_definition(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<DynamicObject, InfraError>;

    async fn delete_virtual_machine(
        &self,
        namespace: &str,
        name: &str,
        wait: bool,
    ) -> Result<(), InfraError>;

    async fn list_virtual_machine_names(
        &self,
        namespace: &str,
        required_labels: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, InfraError>;

    async fn delete_data_volume(
        &self,
        namespace: &str,
        name: &str,
        wait: bool,
    ) -> Result<(), InfraError>;

    async fn list_data_volume_names(
        &self,
        namespace: &str,
        required_labels: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, InfraError>;

    async fn delete_secret(&self, namespace: &str, name: &str, wait: bool)
        -> Result<(), InfraError>;

    async fn list_secret_names(
        &self,
        namespace: &str,
        required_labels: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, InfraError>;
}

/// Read the raw kubeconfig file the client is built from
pub async fn load_kubeconfig_content(path: &Path) -> Result<Vec<u8>, InfraError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| InfraError::KubeconfigRead {
            path: path.to_path_buf(),
            source,
        })
}

/// `InfraClient` backed by a live kube client
#[derive(Clone)]
pub struct KubevirtClient {
    client: Client,
    deletion_polling: PollingConfig,
}

impl KubevirtClient {
    /// Build a client from the kubeconfig at `kubeconfig_path`
    pub async fn from_kubeconfig(kubeconfig_path: &Path) -> Result<Self, InfraError> {
        let content = load_kubeconfig_content(kubeconfig_path).await?;
        let content =
            String::from_utf8(content).map_err(|source| InfraError::KubeconfigEncoding {
                path: kubeconfig_path.to_path_buf(),
                source,
            })?;
        let kubeconfig = Kubeconfig::from_yaml(&content)?;
        let config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        debug!("Infra cluster API server: {}", config.cluster_url);

        Ok(Self::from_client(Client::try_from(config)?))
    }

    /// Wrap an existing kube client
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            deletion_polling: PollingConfig::new(
                DELETE_WAIT_ATTEMPTS,
                DELETE_WAIT_INTERVAL,
                "Waiting for resource deletion",
            ),
        }
    }

    fn dynamic_api(&self, kind: ResourceKind, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &kind.api_resource())
    }

    async fn get_resource(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, InfraError> {
        Ok(self.dynamic_api(kind, namespace).get(name).await?)
    }

    async fn delete_resource(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        wait: bool,
    ) -> Result<(), InfraError> {
        let api = self.dynamic_api(kind, namespace);
        info!("Deleting {} {}/{}", kind, namespace, name);
        api.delete(name, &DeleteParams::default()).await?;

        if !wait {
            return Ok(());
        }

        let polling = PollingConfig {
            description: format!("Waiting for {} {}/{} to be deleted", kind, namespace, name),
            ..self.deletion_polling.clone()
        };
        wait_until_absent(kind, name, &polling, || {
            let api = api.clone();
            let name = name.to_string();
            async move {
                let found = api.get_opt(&name).await?;
                Ok::<_, InfraError>(found.is_some())
            }
        })
        .await
    }

    async fn list_resource(
        &self,
        kind: ResourceKind,
        namespace: &str,
        required_labels: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, InfraError> {
        if required_labels.is_empty() {
            debug!("Empty label selector for {}, nothing selected", kind.plural());
            return Ok(Vec::new());
        }

        let params = ListParams::default().labels(&label_selector(required_labels));
        let list = self.dynamic_api(kind, namespace).list(&params).await?;

        let names = select_names(&list.items, namespace, required_labels);
        debug!(
            "Found {} {} in {} matching {:?}",
            names.len(),
            kind.plural(),
            namespace,
            required_labels
        );
        Ok(names)
    }
}

/// Names of objects in `namespace` carrying every required label
pub(crate) fn select_names(
    objects: &[DynamicObject],
    namespace: &str,
    required_labels: &BTreeMap<String, String>,
) -> Vec<String> {
    objects
        .iter()
        .filter(|obj| obj.namespace().as_deref() == Some(namespace))
        .filter(|obj| matches_labels(obj.labels(), required_labels))
        .map(|obj| obj.name_any())
        .collect()
}

/// Poll `exists` until it reports false, within the polling budget
pub(crate) async fn wait_until_absent<F, Fut>(
    kind: ResourceKind,
    name: &str,
    polling: &PollingConfig,
    exists: F,
) -> Result<(), InfraError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool, InfraError>>,
{
    polling
        .poll_until(|| {
            let check = exists();
            async move { check.await.map(|present| !present) }
        })
        .await
        .map_err(|e| match e {
            PollError::Exhausted { attempts, .. } => InfraError::DeletionTimeout {
                kind,
                name: name.to_string(),
                attempts,
            },
            PollError::Condition(e) => e,
        })
}

#[async_trait]
impl InfraClient for KubevirtClient {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, InfraError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.get(name).await?)
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, InfraError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn get_storage_class(&self, name: &str) -> Result<StorageClass, InfraError> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        Ok(api.get(name).await?)
    }

    async fn get_network_attachment_definition(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<DynamicObject, InfraError> {
        self.get_resource(ResourceKind::NetworkAttachmentDefinition, namespace, name)
            .await
    }

    async fn delete_virtual_machine(
        &self,
        namespace: &str,
        name: &str,
        wait: bool,
    ) -> Result<(), InfraError> {
        self.delete_resource(ResourceKind::VirtualMachine, namespace, name, wait)
            .await
    }

    async fn list_virtual_machine_names(
        &self,
        namespace: &str,
        required_labels: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, InfraError> {
        self.list_resource(ResourceKind::VirtualMachine, namespace, required_labels)
            .await
    }

    async fn delete_data_volume(
        &self,
        namespace: &str,
        name: &str,
        wait: bool,
    ) -> Result<(), InfraError> {
        self.delete_resource(ResourceKind::DataVolume, namespace, name, wait)
            .await
    }

    async fn list_data_volume_names(
        &self,
        namespace: &str,
        required_labels: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, InfraError> {
        self.list_resource(ResourceKind::DataVolume, namespace, required_labels)
            .await
    }

    async fn delete_secret(
        &self,
        namespace: &str,
        name: &str,
        wait: bool,
    ) -> Result<(), InfraError> {
        self.delete_resource(ResourceKind::Secret, namespace, name, wait)
            .await
    }

    async fn list_secret_names(
        &self,
        namespace: &str,
        required_labels: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, InfraError> {
        self.list_resource(ResourceKind::Secret, namespace, required_labels)
            .await
    }
}
