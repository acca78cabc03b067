use std::any::type_name;
use std::fmt;
use std::num::NonZero;

use new_zealand::nz;

use crate::{Lifecycle, Pool, Settings};

const DEFAULT_OUTSTANDING_LIMIT: NonZero<usize> = nz!(4096_usize);
const DEFAULT_RETAINED_LIMIT: NonZero<usize> = nz!(4096_usize);

/// Builder for creating an instance of [`Pool`].
///
/// The lifecycle policy is mandatory, whereas other settings are optional.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use custody_pool::Pool;
/// # use custody_pool::{Lifecycle, Result};
/// #
/// # #[derive(Debug)]
/// # struct Counters;
/// #
/// # impl Lifecycle for Counters {
/// #     type Value = u64;
/// #     type Config = u64;
/// #     type Source = u64;
/// #     fn new(&self, config: &u64, _: u64) -> Result<u64> { Ok(*config) }
/// #     fn parse(&self, source: u64, _: u64) -> Result<u64> { Ok(source) }
/// #     fn reset(&self, value: &mut u64) { *value = 0; }
/// #     fn copy(&self, dst: &mut u64, src: &u64) -> Result<()> { *dst = *src; Ok(()) }
/// # }
///
/// let pool = Pool::builder(Counters)
///     .retained_limit(NonZero::new(16).unwrap())
///     .sync_check(true)
///     .build();
/// ```
#[must_use]
pub struct PoolBuilder<L: Lifecycle> {
    policy: L,
    settings: Settings,
}

impl<L: Lifecycle> PoolBuilder<L> {
    pub(crate) fn new(policy: L) -> Self {
        Self {
            policy,
            settings: Settings {
                outstanding_limit: DEFAULT_OUTSTANDING_LIMIT,
                retained_limit: DEFAULT_RETAINED_LIMIT,
                no_put_back: false,
                manual_destroy: false,
                sync_check: false,
            },
        }
    }

    /// Sets how many items may be outstanding before newly issued items stop getting a safety
    /// net. Items issued beyond the limit are still fully functional but if they are dropped
    /// without being destroyed, their storage is released instead of recycled.
    ///
    /// Default is 4096.
    pub fn outstanding_limit(mut self, limit: NonZero<usize>) -> Self {
        self.settings.outstanding_limit = limit;
        self
    }

    /// Sets how many recycled slots the pool keeps in its free list. Slots returned while the
    /// free list is full are released instead of retained.
    ///
    /// Default is 4096.
    pub fn retained_limit(mut self, limit: NonZero<usize>) -> Self {
        self.settings.retained_limit = limit;
        self
    }

    /// Enables strict mode, in which storage of destroyed items is never recycled.
    ///
    /// Enable this to shake out coding errors that would otherwise be hidden by reuse.
    pub fn no_put_back(mut self, on: bool) -> Self {
        self.settings.no_put_back = on;
        self
    }

    /// Enables manual-destroy mode, in which items never get a safety net. Every item must be
    /// retired explicitly via [`Item::destroy()`][crate::Item::destroy],
    /// [`Item::manual_destroy()`][crate::Item::manual_destroy] or a move.
    ///
    /// Items dropped while still live are released without being recycled and a warning is
    /// logged.
    pub fn manual_destroy(mut self, on: bool) -> Self {
        self.settings.manual_destroy = on;
        self
    }

    /// Enables detection of overlapping accesses to the same item.
    ///
    /// When enabled, an access that finds another access in flight fails with
    /// [`Error::ConcurrentAccess`][crate::Error::ConcurrentAccess]. When disabled, it waits.
    pub fn sync_check(mut self, on: bool) -> Self {
        self.settings.sync_check = on;
        self
    }

    /// Builds the pool with the specified configuration.
    #[must_use]
    pub fn build(self) -> Pool<L> {
        Pool::new_inner(self.policy, self.settings)
    }
}

impl<L: Lifecycle> fmt::Debug for PoolBuilder<L> {
    #[cfg_attr(test, mutants::skip)] // Debug output is not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
