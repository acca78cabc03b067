use thiserror::Error;

/// Errors returned by pools, items and lifecycle policies.
///
/// All of these indicate a violated invariant in the calling code (or an input the lifecycle
/// policy cannot handle). None of them are retried or recovered from by the pool itself.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The item was already destroyed or its value was moved out.
    #[error("item used after it was destroyed")]
    UseAfterDestroy,

    /// The item was destroyed more than once, or lost a race against another destroy.
    #[error("item destroyed more than once")]
    DoubleDestroy,

    /// Another access to the same item was already in flight.
    ///
    /// Only reported when the pool was built with
    /// [`sync_check(true)`][crate::PoolBuilder::sync_check]. Otherwise, overlapping accesses
    /// wait for each other.
    #[error("overlapping access to the same item")]
    ConcurrentAccess,

    /// The lifecycle policy does not recognize the configuration it was given.
    #[error("unsupported configuration: {reason}")]
    UnsupportedConfig {
        /// A human-readable description of the problem.
        reason: String,
    },

    /// The lifecycle policy does not recognize the source object it was asked to adopt.
    #[error("unsupported source: {reason}")]
    UnsupportedSource {
        /// A human-readable description of the problem.
        reason: String,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
