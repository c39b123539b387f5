//! Error types shared by the map, the secret provider and the handle registry.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Table or entry storage could not be obtained. The map is left as it
    /// was before the failing call.
    #[error("failed to allocate {what} storage")]
    AllocationFailure { what: &'static str },

    /// The requested (or resize-required) size exponent is larger than the
    /// widest supported index store can address.
    #[error("size exponent {exponent} exceeds the largest supported table")]
    CapacityOverflow { exponent: u32 },

    /// The OS randomness source could not produce a secret.
    #[error("OS entropy source unavailable: {0}")]
    EntropySource(String),

    /// A registry handle that was destroyed or never issued.
    #[error("stale or destroyed map handle")]
    InvalidHandle,
}

impl Error {
    pub(crate) fn alloc(what: &'static str) -> Self {
        Error::AllocationFailure { what }
    }
}
