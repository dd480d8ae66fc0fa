use thiserror::Error;

/// Failure loading component data outside a store
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure fetching a component record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Component '{id}' not found")]
    NotFound { id: String },

    #[error("Component '{id}' could not be fetched: {message}")]
    Unavailable { id: String, message: String },

    #[error("Component '{id}' is malformed: {message}")]
    Malformed { id: String, message: String },
}

impl StoreError {
    pub fn id(&self) -> &str {
        match self {
            StoreError::NotFound { id }
            | StoreError::Unavailable { id, .. }
            | StoreError::Malformed { id, .. } => id,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
