/// Machine pool sizing checks
use tracing::debug;

use super::field::{FieldError, FieldPath};
use super::quantity::Quantity;
use crate::config::MachinePool;

/// Check that the machine pool is valid, collecting one error per bad field
pub fn validate_machine_pool(pool: &MachinePool, path: &FieldPath) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if pool.cpu == 0 {
        errors.push(FieldError::invalid(
            &path.child("cpu"),
            pool.cpu,
            "CPU must be positive",
        ));
    }

    if let Some(err) = check_positive_quantity(
        &pool.storage_size,
        &path.child("storage"),
        "Storage size",
    ) {
        errors.push(err);
    }

    if let Some(err) = check_positive_quantity(&pool.memory, &path.child("memory"), "Memory") {
        errors.push(err);
    }

    errors
}

fn check_positive_quantity(value: &str, path: &FieldPath, what: &str) -> Option<FieldError> {
    match Quantity::parse(value) {
        Err(_) => Some(FieldError::invalid(
            path,
            value,
            format!("{} must be of Quantity type format", what),
        )),
        Ok(q) if q.sign() != 1 => Some(FieldError::invalid(
            path,
            value,
            format!("{} must be positive value", what),
        )),
        Ok(q) => {
            debug!("{} = {} ({:?}, exponent {})", path, q, q.format(), q.exponent());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(cpu: u32, memory: &str, storage: &str) -> MachinePool {
        MachinePool {
            cpu,
            memory: memory.to_string(),
            storage_size: storage.to_string(),
        }
    }

    fn path() -> FieldPath {
        FieldPath::root("platform").child("kubevirt")
    }

    #[test]
    fn test_valid_pool() {
        assert!(validate_machine_pool(&pool(4, "8G", "35Gi"), &path()).is_empty());
        assert!(validate_machine_pool(&pool(1, "512Mi", "1e10"), &path()).is_empty());
    }

    #[test]
    fn test_zero_cpu() {
        let errors = validate_machine_pool(&pool(0, "8G", "35Gi"), &path());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), "platform.kubevirt.cpu");
        assert!(errors[0].to_string().contains("CPU must be positive"));
    }

    #[test]
    fn test_bad_storage_format() {
        let errors = validate_machine_pool(&pool(2, "8G", "lots"), &path());
        assert_eq!(
            errors,
            vec![FieldError::Invalid {
                field: "platform.kubevirt.storage".to_string(),
                value: "\"lots\"".to_string(),
                detail: "Storage size must be of Quantity type format".to_string(),
            }]
        );
    }

    #[test]
    fn test_non_positive_memory() {
        for memory in ["0", "-1Gi"] {
            let errors = validate_machine_pool(&pool(2, memory, "35Gi"), &path());
            assert_eq!(errors.len(), 1, "{memory}");
            assert_eq!(errors[0].field(), "platform.kubevirt.memory");
            assert!(errors[0].to_string().contains("Memory must be positive value"));
        }
    }

    #[test]
    fn test_errors_accumulate() {
        let errors = validate_machine_pool(&pool(0, "", "0Gi"), &path());
        let fields: Vec<_> = errors.iter().map(|e| e.field()).collect();
        assert_eq!(
            fields,
            vec![
                "platform.kubevirt.cpu",
                "platform.kubevirt.storage",
                "platform.kubevirt.memory"
            ]
        );
        assert!(errors[1].to_string().contains("Storage size must be positive value"));
        assert!(errors[2]
            .to_string()
            .contains("Memory must be of Quantity type format"));
    }
}
