//! Thread-safe object pool whose values are handed out as ownership-tracking items.
//!
//! A [`Pool`] recycles the storage of pooled values to avoid repeated allocation. It hands out
//! each value wrapped in an [`Item`], which records in one atomic bitfield whether the value is
//! still live, whether it was moved out, and whether someone is currently accessing it. This
//! turns common ownership mistakes into errors instead of silent corruption:
//!
//! * Using an item after it was destroyed returns [`Error::UseAfterDestroy`].
//! * Destroying an item twice returns [`Error::DoubleDestroy`].
//! * Overlapping access to the same item can be detected and reported as
//!   [`Error::ConcurrentAccess`] (see [`PoolBuilder::sync_check()`]).
//! * An item dropped without being destroyed is recovered, reset and recycled. A metric counts
//!   these so that leaks remain visible.
//!
//! How values are constructed, adopted from external objects, cleared for reuse and copied is up
//! to a [`Lifecycle`] policy supplied when the pool is created.
//!
//! # Quick start
//!
//! ```
//! use custody_pool::{Error, Lifecycle, Pool, Result};
//!
//! #[derive(Debug)]
//! struct Lines;
//!
//! impl Lifecycle for Lines {
//!     type Value = Vec<String>;
//!     type Config = usize;
//!     type Source = Vec<String>;
//!
//!     fn new(&self, capacity: &usize, mut recycled: Vec<String>) -> Result<Vec<String>> {
//!         recycled.reserve(*capacity);
//!         Ok(recycled)
//!     }
//!
//!     fn parse(&self, source: Vec<String>, _: Vec<String>) -> Result<Vec<String>> {
//!         Ok(source)
//!     }
//!
//!     fn reset(&self, value: &mut Vec<String>) {
//!         value.clear();
//!     }
//!
//!     fn copy(&self, dst: &mut Vec<String>, src: &Vec<String>) -> Result<()> {
//!         dst.clone_from(src);
//!         Ok(())
//!     }
//! }
//!
//! let pool = Pool::new(Lines);
//!
//! let item = pool.new_item(8)?;
//! item.p(|lines| lines.push("first".to_string()))?;
//! assert_eq!(item.v(|lines| lines.len())?, 1);
//!
//! item.destroy()?;
//! assert_eq!(item.destroy(), Err(Error::DoubleDestroy));
//! # Ok::<(), Error>(())
//! ```
//!
//! # Metrics
//!
//! The pool reports the following events via the `nm` crate:
//!
//! * `custody_pool_leaks_recovered` - items dropped without being destroyed.
//! * `custody_pool_items_abandoned` - such items that had no safety net and were released.
//! * `custody_pool_slots_reused` - items issued with recycled storage.
//! * `custody_pool_slots_discarded` - storage released instead of recycled.

mod builder;
mod error;
mod item;
mod lifecycle;
mod metrics;
mod pool;
mod slot;
mod state;

pub use builder::*;
pub use error::*;
pub use item::*;
pub use lifecycle::*;
pub(crate) use pool::Settings;
pub use pool::Pool;
pub(crate) use slot::Slot;
