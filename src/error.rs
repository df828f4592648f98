use crate::model::ResourceKind;
use thiserror::Error;

#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    pub status_code: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn timeout(kind: ResourceKind) -> Self {
        Self::new(None, format!("timed out listing {}", kind.path()))
    }
}

impl From<kube::Error> for ApiError {
    fn from(error: kube::Error) -> Self {
        match &error {
            kube::Error::Api(response) => Self::new(Some(response.code), response.message.clone()),
            _ => Self::new(None, error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ModelError {
    #[error("{kind} object has an empty name")]
    EmptyName { kind: ResourceKind },
    #[error("{kind} {name} is namespaced but carries no namespace")]
    MissingNamespace { kind: ResourceKind, name: String },
    #[error("{kind} {name} is cluster-scoped but carries namespace {namespace}")]
    UnexpectedNamespace {
        kind: ResourceKind,
        name: String,
        namespace: String,
    },
}

/// Table-level message for a failed list call. `None` means the table renders
/// normally (an absent snapshot is an empty table, not an error).
pub fn error_message(kind: ResourceKind, error: Option<&ApiError>) -> Option<String> {
    let error = error?;
    let message = match error.status_code {
        Some(404) => format!("Error: {} not found", kind.title()),
        Some(403) => format!("Error: No permissions to list {}", kind.path()),
        Some(code) => format!("Error ({code}): {}", error.message),
        None => format!("Error: {}", error.message),
    };
    Some(message)
}
