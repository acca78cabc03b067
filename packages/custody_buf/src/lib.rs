//! Pooled byte buffers with ownership tracking.
//!
//! This crate instantiates [`custody_pool`] for `Vec<u8>` values. It provides:
//!
//! * [`BufferLifecycle`] - the lifecycle policy, which reuses recycled capacity and releases
//!   oversized buffers instead of retaining them.
//! * [`BufferPool`] - a convenience wrapper for obtaining buffers as items or as views.
//! * [`Bytes`] - a view of a range of a pooled buffer, with slicing helpers.
//!
//! # Example
//!
//! ```
//! use custody_buf::BufferPool;
//!
//! let pool = BufferPool::new();
//!
//! let mut bytes = pool.new_bytes(8)?;
//! bytes.p(|b| b.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]))?;
//!
//! bytes.slice(2..5)?;
//! assert_eq!(bytes.to_vec()?, vec![3, 4, 5]);
//!
//! bytes.manual_destroy()?;
//! assert_eq!(pool.count_outstanding_and_retained(), (0, 1));
//! # Ok::<(), custody_buf::Error>(())
//! ```

mod bytes;
mod error;
mod lifecycle;
mod pool;

pub use bytes::*;
pub use error::*;
pub use lifecycle::*;
pub use pool::*;
