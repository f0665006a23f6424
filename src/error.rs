//! Error types for pool operations

use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Pool operation errors
///
/// Every failure is reported through this type; no pool operation panics.
/// An `Err` always leaves the pool in a fully consistent, reusable state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The backing allocator could not supply memory
    #[error("out of memory: backing allocator refused {requested} bytes")]
    OutOfMemory {
        /// Size of the acquisition that failed
        requested: usize,
    },

    /// Request size is unusable (zero or too large for a layout)
    #[error("invalid size {size}: {reason}")]
    InvalidSize {
        /// The rejected size
        size: usize,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Pool configuration failed validation
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Why validation failed
        reason: &'static str,
    },
}

impl PoolError {
    /// Create an out of memory error
    pub fn out_of_memory(requested: usize) -> Self {
        Self::OutOfMemory { requested }
    }

    /// Create an invalid size error
    pub fn invalid_size(size: usize, reason: &'static str) -> Self {
        Self::InvalidSize { size, reason }
    }

    /// Create a configuration error
    pub fn invalid_config(reason: &'static str) -> Self {
        Self::InvalidConfig { reason }
    }

    /// Checks if this is an out of memory error
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }
}
