//! Error types for body buffering.

use std::fmt;

/// Errors returned by [`BodyBuffer::append`](crate::body::BodyBuffer::append).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    /// Storage for a chunk record or its data could not be allocated.
    ///
    /// The buffer is left exactly as it was before the failed call.
    Alloc {
        /// Number of data bytes the chunk needed.
        requested: usize,
    },
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::Alloc { requested } => {
                write!(f, "failed to allocate body chunk of {} bytes", requested)
            }
        }
    }
}

impl std::error::Error for BodyError {}

impl From<std::collections::TryReserveError> for BodyError {
    fn from(_: std::collections::TryReserveError) -> Self {
        // Record slot reservation failures carry no data size.
        BodyError::Alloc { requested: 0 }
    }
}
