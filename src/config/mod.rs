/// Configuration management for virtinfra
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Install configuration for a tenant cluster on KubeVirt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Tenant cluster name
    pub cluster_name: String,

    /// Unique infrastructure id, stamped as a label on every resource the cluster owns
    pub infra_id: String,

    /// Infra cluster kubeconfig (defaults to $KUBECONFIG, then ~/.kube/config)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// KubeVirt platform configuration
    pub platform: KubevirtPlatform,
}

/// Where and how the tenant cluster's VMs run on the infra cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubevirtPlatform {
    /// Infra cluster namespace holding the tenant's VMs
    pub namespace: String,

    /// Storage class used for VM data volumes
    pub storage_class: String,

    /// Network attachment definition the VMs attach to
    pub network_name: String,

    /// Virtual IP for the tenant API server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_vip: Option<String>,

    /// Virtual IP for tenant ingress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_vip: Option<String>,

    /// Access mode for the VMs' persistent volumes (e.g., "ReadWriteMany")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_access_mode: Option<String>,

    /// Default machine pool for tenant nodes
    pub default_machine_platform: MachinePool,
}

/// Sizing of KubeVirt machines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinePool {
    /// Number of virtual CPUs
    pub cpu: u32,

    /// Memory as a quantity (e.g., "8G")
    pub memory: String,

    /// Root disk size as a quantity (e.g., "35Gi")
    pub storage_size: String,
}

impl InstallConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: InstallConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration structure
    ///
    /// Field-level checks of sizes and cluster objects live in `crate::validation`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cluster_name.is_empty() {
            anyhow::bail!("cluster_name cannot be empty");
        }

        if self.infra_id.is_empty() {
            anyhow::bail!("infra_id cannot be empty");
        }

        if self.platform.namespace.is_empty() {
            anyhow::bail!("platform.namespace cannot be empty");
        }

        Ok(())
    }

    /// Kubeconfig path from config, environment, or the default location
    pub fn kubeconfig_path(&self) -> anyhow::Result<PathBuf> {
        match &self.kubeconfig {
            Some(path) => Ok(path.clone()),
            None => default_kubeconfig_path(),
        }
    }

    /// Labels every resource owned by this cluster carries
    pub fn owner_labels(&self) -> std::collections::BTreeMap<String, String> {
        [(
            crate::kubevirt::INFRA_ID_LABEL.to_string(),
            self.infra_id.clone(),
        )]
        .into_iter()
        .collect()
    }

    /// Generate an example configuration file
    pub fn example() -> Self {
        Self {
            cluster_name: "tenant-cluster".to_string(),
            infra_id: "tenant-cluster-x7k2p".to_string(),
            kubeconfig: None,
            platform: KubevirtPlatform {
                namespace: "tenant-cluster".to_string(),
                storage_class: "standard".to_string(),
                network_name: "tenant-network".to_string(),
                api_vip: Some("10.123.124.20".to_string()),
                ingress_vip: Some("10.123.124.21".to_string()),
                persistent_volume_access_mode: Some("ReadWriteMany".to_string()),
                default_machine_platform: MachinePool {
                    cpu: 4,
                    memory: "8G".to_string(),
                    storage_size: "35Gi".to_string(),
                },
            },
        }
    }
}

/// `$KUBECONFIG` if set and non-empty, otherwise `$HOME/.kube/config`
pub fn default_kubeconfig_path() -> anyhow::Result<PathBuf> {
    kubeconfig_path_from(
        std::env::var_os(KUBECONFIG_ENV),
        std::env::var_os("HOME"),
    )
}

fn kubeconfig_path_from(
    kubeconfig: Option<std::ffi::OsString>,
    home: Option<std::ffi::OsString>,
) -> anyhow::Result<PathBuf> {
    if let Some(path) = kubeconfig.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let home = home
        .filter(|h| !h.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Neither KUBECONFIG nor HOME is set; cannot locate kubeconfig"))?;
    Ok(PathBuf::from(home).join(".kube").join("config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_validation() {
        let mut config = InstallConfig::example();
        assert!(config.validate().is_ok());

        config.cluster_name = String::new();
        assert!(config.validate().is_err());

        let mut config = InstallConfig::example();
        config.infra_id = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_roundtrips_example() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let yaml = serde_yaml::to_string(&InstallConfig::example()).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = InstallConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cluster_name, "tenant-cluster");
        assert_eq!(config.platform.default_machine_platform.cpu, 4);
        assert_eq!(config.platform.default_machine_platform.storage_size, "35Gi");
    }

    #[test]
    fn test_from_file_rejects_empty_namespace() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut config = InstallConfig::example();
        config.platform.namespace = String::new();
        file.write_all(serde_yaml::to_string(&config).unwrap().as_bytes())
            .unwrap();

        assert!(InstallConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_kubeconfig_location() {
        assert_eq!(
            kubeconfig_path_from(Some("/tmp/kc".into()), Some("/home/me".into())).unwrap(),
            PathBuf::from("/tmp/kc")
        );
        assert_eq!(
            kubeconfig_path_from(Some("".into()), Some("/home/me".into())).unwrap(),
            PathBuf::from("/home/me/.kube/config")
        );
        assert!(kubeconfig_path_from(None, None).is_err());

        let mut config = InstallConfig::example();
        config.kubeconfig = Some(PathBuf::from("/etc/infra.kubeconfig"));
        assert_eq!(
            config.kubeconfig_path().unwrap(),
            PathBuf::from("/etc/infra.kubeconfig")
        );
    }

    #[test]
    fn test_owner_labels() {
        let labels = InstallConfig::example().owner_labels();
        assert_eq!(labels.len(), 1);
        assert_eq!(
            labels.get(crate::kubevirt::INFRA_ID_LABEL).map(String::as_str),
            Some("tenant-cluster-x7k2p")
        );
    }
}
