//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use strata_core::AllocError;

/// Errors that can occur when configuring or feeding a linear allocator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The [`ArenaConfig`](crate::ArenaConfig) failed validation.
    InvalidConfig {
        /// Description of the offending parameter.
        reason: String,
    },
    /// The underlying allocator could not satisfy a request.
    Alloc(AllocError),
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
            Self::Alloc(err) => write!(f, "arena allocation failed: {err}"),
        }
    }
}

impl Error for ArenaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Alloc(err) => Some(err),
            Self::InvalidConfig { .. } => None,
        }
    }
}

impl From<AllocError> for ArenaError {
    fn from(err: AllocError) -> Self {
        Self::Alloc(err)
    }
}
