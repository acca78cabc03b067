use thiserror::Error;

/// Errors returned by buffer pools and byte views.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The underlying pooled item rejected the operation.
    #[error(transparent)]
    Pool(#[from] custody_pool::Error),

    /// A range does not fit in the bytes it was applied to.
    ///
    /// Returned when slicing a view beyond its bounds (the range is relative to the view) and
    /// when a view no longer fits in its buffer because the buffer was shrunk (the range is
    /// relative to the buffer).
    #[error("range {start}..{end} is out of bounds for {len} bytes")]
    OutOfRange {
        /// Start of the range.
        start: usize,

        /// End of the range.
        end: usize,

        /// Number of bytes the range was applied to.
        len: usize,
    },
}

/// A specialized `Result` type for buffer operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
