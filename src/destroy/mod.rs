/// Teardown of a tenant cluster's KubeVirt resources
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::kubevirt::{InfraClient, ResourceKind};
use crate::progress::OperationProgress;

/// Resources owned by one tenant cluster, grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterResources {
    pub virtual_machines: Vec<String>,
    pub data_volumes: Vec<String>,
    pub secrets: Vec<String>,
}

impl ClusterResources {
    pub fn total(&self) -> usize {
        self.virtual_machines.len() + self.data_volumes.len() + self.secrets.len()
    }

    /// Deletion order: VMs go before the volumes and secrets they reference
    fn in_deletion_order(&self) -> impl Iterator<Item = (ResourceKind, &String)> {
        let vms = self
            .virtual_machines
            .iter()
            .map(|n| (ResourceKind::VirtualMachine, n));
        let dvs = self
            .data_volumes
            .iter()
            .map(|n| (ResourceKind::DataVolume, n));
        let secrets = self.secrets.iter().map(|n| (ResourceKind::Secret, n));
        vms.chain(dvs).chain(secrets)
    }
}

/// Finds and deletes everything labelled with a cluster's infra id
pub struct ClusterDestroyer<'a> {
    client: &'a dyn InfraClient,
    namespace: String,
    labels: BTreeMap<String, String>,
}

impl<'a> ClusterDestroyer<'a> {
    /// Create a destroyer for resources in `namespace` matching `labels`
    pub fn new(
        client: &'a dyn InfraClient,
        namespace: impl Into<String>,
        labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            labels,
        }
    }

    /// List the cluster's VMs, data volumes and secrets
    pub async fn discover(&self) -> Result<ClusterResources> {
        let (virtual_machines, data_volumes, secrets) = futures::try_join!(
            async {
                self.client
                    .list_virtual_machine_names(&self.namespace, &self.labels)
                    .await
                    .context("Failed to list virtual machines")
            },
            async {
                self.client
                    .list_data_volume_names(&self.namespace, &self.labels)
                    .await
                    .context("Failed to list data volumes")
            },
            async {
                self.client
                    .list_secret_names(&self.namespace, &self.labels)
                    .await
                    .context("Failed to list secrets")
            },
        )?;

        Ok(ClusterResources {
            virtual_machines,
            data_volumes,
            secrets,
        })
    }

    /// Delete every discovered resource, waiting for each to disappear
    ///
    /// Stops at the first failure; the returned progress is finished either way.
    pub async fn destroy(&self, resources: &ClusterResources) -> (OperationProgress, Result<()>) {
        let total = resources.total();
        let mut progress = OperationProgress::started();
        info!(
            "Destroying {} resource(s) in namespace {}",
            total, self.namespace
        );

        let mut result = Ok(());
        for (done, (kind, name)) in resources.in_deletion_order().enumerate() {
            if let Err(e) = self.delete(kind, name).await {
                result = Err(e);
                break;
            }
            progress.record(done + 1, total);
            info!("Destroy progress: {} ({} {} deleted)", progress, kind, name);
        }

        if total == 0 {
            progress.record(0, 0);
            info!("Nothing to destroy in namespace {}", self.namespace);
        }
        progress.finish();

        (progress, result)
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<()> {
        let ns = self.namespace.as_str();
        let deleted = match kind {
            ResourceKind::VirtualMachine => self.client.delete_virtual_machine(ns, name, true).await,
            ResourceKind::DataVolume => self.client.delete_data_volume(ns, name, true).await,
            ResourceKind::Secret => self.client.delete_secret(ns, name, true).await,
            ResourceKind::NetworkAttachmentDefinition => {
                anyhow::bail!("network attachment definitions are not owned by the cluster")
            }
        };

        match deleted {
            Ok(()) => Ok(()),
            // Owned objects (e.g. a VM's data volume templates) can be garbage collected
            // between discovery and their own delete
            Err(e) if e.is_not_found() => {
                debug!("{} {}/{} already gone", kind, ns, name);
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete {} {}/{}", kind, ns, name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubevirt::{api_error, InfraError, MockInfraClient};
    use mockall::predicate::{always, eq};
    use mockall::Sequence;

    fn labels() -> BTreeMap<String, String> {
        [(crate::kubevirt::INFRA_ID_LABEL.to_string(), "abc".to_string())]
            .into_iter()
            .collect()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_discover_lists_each_kind() {
        let mut client = MockInfraClient::new();
        client
            .expect_list_virtual_machine_names()
            .with(eq("tenant"), eq(labels()))
            .returning(|_, _| Ok(names(&["vm-0", "vm-1"])));
        client
            .expect_list_data_volume_names()
            .with(eq("tenant"), eq(labels()))
            .returning(|_, _| Ok(names(&["dv-0"])));
        client
            .expect_list_secret_names()
            .with(eq("tenant"), eq(labels()))
            .returning(|_, _| Ok(Vec::new()));

        let destroyer = ClusterDestroyer::new(&client, "tenant", labels());
        let found = destroyer.discover().await.unwrap();

        assert_eq!(found.virtual_machines, names(&["vm-0", "vm-1"]));
        assert_eq!(found.data_volumes, names(&["dv-0"]));
        assert!(found.secrets.is_empty());
        assert_eq!(found.total(), 3);
    }

    #[tokio::test]
    async fn test_destroy_deletes_vms_first_and_waits() {
        let mut client = MockInfraClient::new();
        let mut seq = Sequence::new();
        client
            .expect_delete_virtual_machine()
            .with(eq("tenant"), eq("vm-0"), eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        client
            .expect_delete_data_volume()
            .with(eq("tenant"), eq("dv-0"), eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        client
            .expect_delete_secret()
            .with(eq("tenant"), eq("pull-secret"), eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let resources = ClusterResources {
            virtual_machines: names(&["vm-0"]),
            data_volumes: names(&["dv-0"]),
            secrets: names(&["pull-secret"]),
        };
        let destroyer = ClusterDestroyer::new(&client, "tenant", labels());
        let (progress, result) = destroyer.destroy(&resources).await;

        assert!(result.is_ok());
        assert_eq!(progress.progress_percent, 100);
        assert!(progress.is_done());
    }

    #[tokio::test]
    async fn test_destroy_stops_on_deletion_timeout() {
        let mut client = MockInfraClient::new();
        client
            .expect_delete_virtual_machine()
            .with(eq("tenant"), eq("vm-0"), always())
            .returning(|_, _, _| Ok(()));
        client
            .expect_delete_virtual_machine()
            .with(eq("tenant"), eq("vm-1"), always())
            .returning(|_, name, _| {
                Err(InfraError::DeletionTimeout {
                    kind: ResourceKind::VirtualMachine,
                    name: name.to_string(),
                    attempts: 5,
                })
            });
        client.expect_delete_data_volume().never();
        client.expect_delete_secret().never();

        let resources = ClusterResources {
            virtual_machines: names(&["vm-0", "vm-1"]),
            data_volumes: names(&["dv-0"]),
            secrets: names(&["s-0"]),
        };
        let destroyer = ClusterDestroyer::new(&client, "tenant", labels());
        let (progress, result) = destroyer.destroy(&resources).await;

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("vm-1"));
        assert_eq!(progress.progress_percent, 25);
        assert!(progress.is_done());
    }

    #[tokio::test]
    async fn test_destroy_treats_already_deleted_as_done() {
        let mut client = MockInfraClient::new();
        client
            .expect_delete_virtual_machine()
            .with(eq("tenant"), eq("vm-0"), eq(true))
            .times(1)
            .returning(|_, _, _| Ok(()));
        // Collected along with its owning VM
        client
            .expect_delete_data_volume()
            .with(eq("tenant"), eq("vm-0-rootdisk"), eq(true))
            .times(1)
            .returning(|_, _, _| Err(api_error(404)));
        client
            .expect_delete_secret()
            .with(eq("tenant"), eq("s-0"), eq(true))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let resources = ClusterResources {
            virtual_machines: names(&["vm-0"]),
            data_volumes: names(&["vm-0-rootdisk"]),
            secrets: names(&["s-0"]),
        };
        let destroyer = ClusterDestroyer::new(&client, "tenant", labels());
        let (progress, result) = destroyer.destroy(&resources).await;

        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(progress.progress_percent, 100);
    }

    #[tokio::test]
    async fn test_destroy_nothing() {
        let client = MockInfraClient::new();
        let destroyer = ClusterDestroyer::new(&client, "tenant", labels());
        let (progress, result) = destroyer.destroy(&ClusterResources::default()).await;

        assert!(result.is_ok());
        assert_eq!(progress.progress_percent, 100);
    }
}
