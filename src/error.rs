use thiserror::Error;

/// Coarse classification of engine failures, used by callers that only
/// need to pick a message or an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InvalidTransition,
    ReferenceNotFound,
    Store,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, detected before anything is written.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cannot delete {entity} {id}: {count} dependent {children} remain")]
    HasDependents {
        entity: &'static str,
        id: String,
        count: usize,
        children: &'static str,
    },

    #[error("cannot {operation} {entity} {id} in status '{status}'")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        status: String,
        operation: &'static str,
    },

    #[error("job {job_id} has {remaining} unfinished action(s)")]
    ActionsIncomplete { job_id: String, remaining: usize },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store connection poisoned by a panicked operation")]
    Poisoned,

    #[error("database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: i32, supported: i32 },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) | EngineError::HasDependents { .. } => ErrorKind::Validation,
            EngineError::InvalidTransition { .. } | EngineError::ActionsIncomplete { .. } => {
                ErrorKind::InvalidTransition
            }
            EngineError::NotFound { .. } => ErrorKind::ReferenceNotFound,
            EngineError::Store(_)
            | EngineError::Io(_)
            | EngineError::Poisoned
            | EngineError::SchemaTooNew { .. } => ErrorKind::Store,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
