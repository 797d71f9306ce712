/// KubeVirt infra cluster access
pub mod client;
pub mod resources;

pub use client::{InfraClient, KubevirtClient};
pub use resources::ResourceKind;

#[cfg(test)]
pub use client::MockInfraClient;

use std::path::PathBuf;

/// Label carrying the tenant cluster's infra id on every resource it owns
pub const INFRA_ID_LABEL: &str = "virtinfra.io/infra-id";

/// Errors from the infra cluster client
#[derive(Debug, thiserror::Error)]
pub enum InfraError {
    #[error("failed to read kubeconfig {}: {source}", path.display())]
    KubeconfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("kubeconfig {} is not valid UTF-8: {source}", path.display())]
    KubeconfigEncoding {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },

    #[error("invalid kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error("failed to delete {kind} {name}: checked {attempts} times and it still exists")]
    DeletionTimeout {
        kind: ResourceKind,
        name: String,
        attempts: u32,
    },
}

impl InfraError {
    /// True when the API server answered 404 for the requested object
    pub fn is_not_found(&self) -> bool {
        matches!(self, InfraError::Kube(kube::Error::Api(response)) if response.code == 404)
    }
}

#[cfg(test)]
pub(crate) fn api_error(code: u16) -> InfraError {
    InfraError::Kube(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: "test".to_string(),
        reason: if code == 404 { "NotFound" } else { "Forbidden" }.to_string(),
        code,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        assert!(api_error(404).is_not_found());
        assert!(!api_error(403).is_not_found());

        let timeout = InfraError::DeletionTimeout {
            kind: ResourceKind::VirtualMachine,
            name: "vm-a".to_string(),
            attempts: 5,
        };
        assert!(!timeout.is_not_found());
        assert_eq!(
            timeout.to_string(),
            "failed to delete virtual machine vm-a: checked 5 times and it still exists"
        );
    }
}
