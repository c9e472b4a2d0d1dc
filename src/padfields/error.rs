use thiserror::Error;

#[derive(Error, Debug)]
pub enum FieldsError {
    /// Two providers claimed the same type id. Raised only while building a registry.
    #[error("Field type already registered: {0}")]
    DuplicateFieldType(String),

    #[error("Invalid attribute '{name}' for {type_id}: {reason}")]
    InvalidAttribute {
        type_id: String,
        name: String,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid date format: {0}")]
    InvalidFormat(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Api Error: {0}")]
    Api(String),
}

impl FieldsError {
    pub fn invalid_attribute(
        type_id: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        FieldsError::InvalidAttribute {
            type_id: type_id.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FieldsError>;
