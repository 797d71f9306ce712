/// Checks of the KubeVirt platform config against the live infra cluster
use tracing::debug;

use super::field::{FieldError, FieldPath};
use super::machine_pool::validate_machine_pool;
use crate::config::KubevirtPlatform;
use crate::kubevirt::{InfraClient, InfraError};

/// Validate the platform: required fields, referenced cluster objects, and machine sizing
///
/// Missing objects become field errors; any other API failure aborts the check.
pub async fn validate_platform(
    client: &dyn InfraClient,
    platform: &KubevirtPlatform,
    path: &FieldPath,
) -> Result<Vec<FieldError>, InfraError> {
    let mut errors = Vec::new();

    let namespace_path = path.child("namespace");
    let mut namespace_exists = false;
    if platform.namespace.is_empty() {
        errors.push(FieldError::required(&namespace_path, "namespace is required"));
    } else {
        let lookup = client.get_namespace(&platform.namespace).await;
        match not_found(lookup, &namespace_path, &platform.namespace)? {
            Some(err) => errors.push(err),
            None => namespace_exists = true,
        }
    }

    let storage_path = path.child("storage_class");
    if platform.storage_class.is_empty() {
        errors.push(FieldError::required(&storage_path, "storage class is required"));
    } else if let Some(err) = not_found(
        client.get_storage_class(&platform.storage_class).await,
        &storage_path,
        &platform.storage_class,
    )? {
        errors.push(err);
    }

    let network_path = path.child("network_name");
    if platform.network_name.is_empty() {
        errors.push(FieldError::required(&network_path, "network name is required"));
    } else if namespace_exists {
        // Network attachment definitions are namespaced; a missing namespace is already reported
        let lookup = client
            .get_network_attachment_definition(&platform.network_name, &platform.namespace)
            .await;
        if let Some(err) = not_found(lookup, &network_path, &platform.network_name)? {
            errors.push(err);
        }
    }

    errors.extend(validate_machine_pool(
        &platform.default_machine_platform,
        &path.child("default_machine_platform"),
    ));

    debug!(
        "Platform validation found {} problem(s): {:?}",
        errors.len(),
        errors.iter().map(FieldError::field).collect::<Vec<_>>()
    );
    Ok(errors)
}

/// Turn a 404 into a field error, pass other errors through
fn not_found<T>(
    lookup: Result<T, InfraError>,
    path: &FieldPath,
    value: &str,
) -> Result<Option<FieldError>, InfraError> {
    match lookup {
        Ok(_) => Ok(None),
        Err(e) if e.is_not_found() => Ok(Some(FieldError::not_found(path, value))),
        Err(e) => Err(e),
    }
}
