/// Field paths and field-level validation errors
use std::fmt;

/// Dotted path to a field in the install config, e.g. `platform.kubevirt.cpu`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Path to a child field of this one
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// A single problem with a single field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("{field}: Invalid value: {value}: {detail}")]
    Invalid {
        field: String,
        value: String,
        detail: String,
    },

    #[error("{field}: Required value: {detail}")]
    Required { field: String, detail: String },

    #[error("{field}: Not found: {value}")]
    NotFound { field: String, value: String },
}

impl FieldError {
    /// The value is rendered with `Debug`, so strings show up quoted
    pub fn invalid(path: &FieldPath, value: impl fmt::Debug, detail: impl Into<String>) -> Self {
        FieldError::Invalid {
            field: path.to_string(),
            value: format!("{:?}", value),
            detail: detail.into(),
        }
    }

    pub fn required(path: &FieldPath, detail: impl Into<String>) -> Self {
        FieldError::Required {
            field: path.to_string(),
            detail: detail.into(),
        }
    }

    pub fn not_found(path: &FieldPath, value: impl fmt::Debug) -> Self {
        FieldError::NotFound {
            field: path.to_string(),
            value: format!("{:?}", value),
        }
    }

    /// Path of the offending field
    pub fn field(&self) -> &str {
        match self {
            FieldError::Invalid { field, .. }
            | FieldError::Required { field, .. }
            | FieldError::NotFound { field, .. } => field,
        }
    }
}

/// Render a list of field errors as one message, one error per line
pub fn aggregate(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
