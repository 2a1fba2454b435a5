//! Errors surfaced by tracker operations.

use ebs_core::CoreError;
use ebs_storage::StorageError;

/// Result alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Coarse error category, for callers that map errors to user messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input
    Validation,
    /// Referenced task or segment does not exist
    NotFound,
    /// Snapshot could not be read or written
    Io,
}

/// Any failure of a tracker operation.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Model rejected the operation
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Snapshot read/write failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TrackerError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(CoreError::Validation(_)) => ErrorKind::Validation,
            Self::Core(CoreError::TaskNotFound(_) | CoreError::SegmentOutOfRange { .. }) => {
                ErrorKind::NotFound
            }
            Self::Core(CoreError::InvalidSnapshot(_)) | Self::Storage(_) => ErrorKind::Io,
        }
    }
}
