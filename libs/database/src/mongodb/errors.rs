use mongodb::error::{CommandError, Error, ErrorKind, WriteError, WriteFailure};

/// Server code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Error type for connection bootstrap
#[derive(Debug, thiserror::Error)]
pub enum MongoError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] Error),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

/// Whether the write was rejected by a unique index.
pub fn is_duplicate_key(err: &Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError {
            code: DUPLICATE_KEY,
            ..
        })) | ErrorKind::Command(CommandError {
            code: DUPLICATE_KEY,
            ..
        })
    )
}

/// Whether the failure is a connectivity problem worth retrying.
///
/// Network errors, server selection timeouts and cleared pools are transient;
/// everything else (bad queries, write conflicts, auth) is treated as permanent.
pub fn is_transient(err: &Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::ConnectionPoolCleared { .. }
    )
}
