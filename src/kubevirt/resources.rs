/// Resource kinds managed on the infra cluster
use kube::api::{ApiResource, GroupVersionKind};
use std::collections::BTreeMap;
use std::fmt;

/// Kinds the installer reads, lists or deletes through the dynamic API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    VirtualMachine,
    DataVolume,
    Secret,
    NetworkAttachmentDefinition,
}

impl ResourceKind {
    /// Group, version, kind and plural resource name
    fn gvk_plural(&self) -> (&'static str, &'static str, &'static str, &'static str) {
        match self {
            ResourceKind::VirtualMachine => ("kubevirt.io", "v1", "VirtualMachine", "virtualmachines"),
            ResourceKind::DataVolume => ("cdi.kubevirt.io", "v1beta1", "DataVolume", "datavolumes"),
            ResourceKind::Secret => ("", "v1", "Secret", "secrets"),
            ResourceKind::NetworkAttachmentDefinition => (
                "k8s.cni.cncf.io",
                "v1",
                "NetworkAttachmentDefinition",
                "network-attachment-definitions",
            ),
        }
    }

    /// Dynamic API resource descriptor for this kind
    pub fn api_resource(&self) -> ApiResource {
        let (group, version, kind, plural) = self.gvk_plural();
        ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(group, version, kind), plural)
    }

    pub fn plural(&self) -> &'static str {
        self.gvk_plural().3
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::VirtualMachine => "virtual machine",
            ResourceKind::DataVolume => "data volume",
            ResourceKind::Secret => "secret",
            ResourceKind::NetworkAttachmentDefinition => "network attachment definition",
        };
        write!(f, "{}", name)
    }
}

/// True if every required label is present with the same value
///
/// An empty requirement matches nothing, so a missing selector can never select a whole namespace.
pub fn matches_labels(
    labels: &BTreeMap<String, String>,
    required: &BTreeMap<String, String>,
) -> bool {
    !required.is_empty()
        && required
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
}

/// Label selector string for server-side filtering, e.g. `a=1,b=2`
pub fn label_selector(required: &BTreeMap<String, String>) -> String {
    required
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",")
}
