use thiserror::Error;

/// Errors returned by content stores and the room catalog.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Missing or stale version token for an existing path.
    #[error("Version conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// A multi-step operation failed after an earlier step succeeded.
    #[error("{operation} partially failed: {detail}")]
    PartialFailure { operation: String, detail: String },

    /// Tree deletion attempted every leaf but some deletes failed.
    #[error("Deleting {path} incomplete: {failed} of {attempted} deletes failed")]
    Incomplete {
        path: String,
        attempted: usize,
        failed: usize,
    },
}

impl StoreError {
    /// Text suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Unauthorized(_) => {
                "Access denied. Check that the access token is valid and has write access to the repository.".to_string()
            }
            StoreError::NotFound(what) => format!("Nothing found at {}.", what),
            StoreError::Conflict(_) => {
                "The file changed since it was last read. Reload and try again.".to_string()
            }
            StoreError::AlreadyExists(what) => format!("{} already exists.", what),
            StoreError::RateLimited(_) => {
                "The remote store is rate limiting requests. Try again later.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether the error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(e.to_string())
        } else {
            StoreError::Io(e.to_string())
        }
    }
}
