use std::any::type_name;
use std::fmt;
use std::mem::{self, ManuallyDrop};

use tracing::{debug, trace, warn};

use crate::metrics::{ITEMS_ABANDONED, LEAKS_RECOVERED};
use crate::state::{DESTROYED, Flags, IGNORED, IN_TRANSFER};
use crate::{Error, Lifecycle, Pool, Result, Slot};

/// The unit of ownership of a pooled value.
///
/// An item is issued by a [`Pool`] and owns one value until it is retired. Retirement happens
/// exactly once, by whichever of these comes first:
///
/// * [`destroy()`][Self::destroy] or [`manual_destroy()`][Self::manual_destroy], which clear the
///   value (via [`Lifecycle::reset()`] for buffered items, by replacing it with its default
///   otherwise) and return the storage to the pool.
/// * [`take()`][Self::take] or [`into_inner()`][Self::into_inner], which move the value out to
///   the caller. The value is no longer tracked by the pool after that.
/// * Dropping the item while it is still live. This is the safety net that recovers leaked
///   items; it performs the same work as [`destroy()`][Self::destroy].
///
/// Every other operation on a retired item fails with [`Error::UseAfterDestroy`].
///
/// # Access
///
/// The value is only reachable inside the closures given to [`v()`][Self::v] and
/// [`p()`][Self::p]. Each access holds a per-item gate for its duration. An access that finds the
/// gate taken either waits for it or, if the pool was built with
/// [`sync_check(true)`][crate::PoolBuilder::sync_check], fails with
/// [`Error::ConcurrentAccess`].
///
/// Calling methods of the same item from within an access closure waits for the gate that the
/// caller itself holds, so it never returns unless `sync_check` is enabled.
///
/// # Thread safety
///
/// Items are [`Send`] and [`Sync`] when the pool is and the value and config types are [`Send`].
/// Sharing an item between threads is safe because the gate serializes access to the value, the
/// same way a mutex would.
///
/// # Example
///
/// ```
/// use custody_pool::{Error, Pool};
/// # use custody_pool::{Lifecycle, Result};
/// #
/// # #[derive(Debug)]
/// # struct Words;
/// #
/// # impl Lifecycle for Words {
/// #     type Value = String;
/// #     type Config = &'static str;
/// #     type Source = String;
/// #     fn new(&self, text: &&'static str, mut recycled: String) -> Result<String> {
/// #         recycled.push_str(text);
/// #         Ok(recycled)
/// #     }
/// #     fn parse(&self, source: String, _: String) -> Result<String> { Ok(source) }
/// #     fn reset(&self, value: &mut String) { value.clear(); }
/// #     fn copy(&self, dst: &mut String, src: &String) -> Result<()> {
/// #         dst.clone_from(src);
/// #         Ok(())
/// #     }
/// # }
///
/// let pool = Pool::new(Words);
///
/// let item = pool.new_item("hello")?;
/// item.p(|s| s.push_str(" world"))?;
///
/// let copy = item.copy()?;
///
/// // Move the value out; the item is retired.
/// let value = item.take()?;
/// assert_eq!(value, "hello world");
/// assert_eq!(item.v(|s| s.len()), Err(Error::UseAfterDestroy));
///
/// // The copy is independent.
/// assert_eq!(copy.v(|s| s.clone())?, "hello world");
/// copy.destroy()?;
/// assert_eq!(copy.destroy(), Err(Error::DoubleDestroy));
/// # Ok::<(), custody_pool::Error>(())
/// ```
pub struct Item<L: Lifecycle> {
    /// Always present until `drop()` moves it out.
    slot: ManuallyDrop<Box<Slot<L>>>,

    pool: Pool<L>,
}

impl<L: Lifecycle> Item<L> {
    pub(crate) fn new(slot: Box<Slot<L>>, pool: Pool<L>) -> Self {
        Self {
            slot: ManuallyDrop::new(slot),
            pool,
        }
    }

    /// Runs `f` with shared access to the value.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UseAfterDestroy`] if the item was retired and with
    /// [`Error::ConcurrentAccess`] if the pool checks for overlapping access and finds one.
    pub fn v<R>(&self, f: impl FnOnce(&L::Value) -> R) -> Result<R> {
        let access = self.slot.access(self.pool.sync_check())?;
        Ok(f(access.value()))
    }

    /// Runs `f` with exclusive access to the value.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UseAfterDestroy`] if the item was retired and with
    /// [`Error::ConcurrentAccess`] if the pool checks for overlapping access and finds one.
    pub fn p<R>(&self, f: impl FnOnce(&mut L::Value) -> R) -> Result<R> {
        let mut access = self.slot.access(self.pool.sync_check())?;
        Ok(f(access.value_mut()))
    }

    /// Whether the value was constructed by the pool, meaning destroy will pass it through
    /// [`Lifecycle::reset()`]. Items from [`Pool::parse_item()`] report `false`; their values are
    /// replaced with the default on destroy.
    #[must_use]
    pub fn has_involved(&self) -> bool {
        self.slot.state.load().is_buffered()
    }

    /// Whether the item has been retired, by any means.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.slot.state.load().is_destroyed()
    }

    /// Whether the item was retired by moving its value out.
    #[must_use]
    pub fn is_transferred(&self) -> bool {
        self.slot.state.load().is_in_transfer()
    }

    /// Moves the value out and retires the item.
    ///
    /// The value is no longer tracked by the pool afterwards and is not reset. Of any number of
    /// concurrent or repeated calls, exactly one succeeds.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UseAfterDestroy`] if the item was already retired and with
    /// [`Error::ConcurrentAccess`] if the pool checks for overlapping access and finds one.
    pub fn take(&self) -> Result<L::Value> {
        let mut access = self.slot.access(self.pool.sync_check())?;

        access.retire(IN_TRANSFER);
        let value = mem::take(access.value_mut());
        drop(access);

        self.pool.retire_outstanding();

        Ok(value)
    }

    /// Moves the value out and returns the item's storage to the pool right away.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UseAfterDestroy`] if the item was already retired via a shared
    /// reference.
    pub fn into_inner(self) -> Result<L::Value> {
        self.take()
    }

    /// Issues a new item from the same pool, constructed with the same config as this one, and
    /// deep-copies this item's value into it. The two items are independent afterwards.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UseAfterDestroy`] if the item was retired, with
    /// [`Error::ConcurrentAccess`] if the pool checks for overlapping access and finds one, and
    /// with any error the lifecycle policy returns.
    pub fn copy(&self) -> Result<Self> {
        let access = self.slot.access(self.pool.sync_check())?;

        let config = access.config().cloned().ok_or(Error::UseAfterDestroy)?;

        let mut copy = self.pool.new_item(config)?;

        if let Err(e) = self
            .pool
            .policy()
            .copy(copy.slot.value_mut(), access.value())
        {
            copy.discard();
            return Err(e);
        }

        Ok(copy)
    }

    /// Retires the item, clearing the value.
    ///
    /// Buffered items (see [`has_involved()`][Self::has_involved]) have their value passed
    /// through [`Lifecycle::reset()`]; other items have it replaced with the default. The
    /// storage is returned to the pool when the item is dropped. Of any number of concurrent or
    /// repeated calls, exactly one succeeds.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DoubleDestroy`] if the item was already retired and with
    /// [`Error::ConcurrentAccess`] if the pool checks for overlapping access and finds one.
    pub fn destroy(&self) -> Result<()> {
        let mut access = self
            .slot
            .access(self.pool.sync_check())
            .map_err(|e| match e {
                Error::UseAfterDestroy => Error::DoubleDestroy,
                other => other,
            })?;

        let previous = access.retire(0);
        clear_value(self.pool.policy(), previous, access.value_mut());
        drop(access);

        self.pool.retire_outstanding();

        Ok(())
    }

    /// Retires the item like [`destroy()`][Self::destroy] and returns its storage to the pool
    /// right away.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DoubleDestroy`] if the item was already retired via a shared
    /// reference.
    pub fn manual_destroy(self) -> Result<()> {
        self.destroy()
    }

    /// Retires a live item we have exclusive access to, without any diagnostics.
    ///
    /// Returns whether the item was live.
    fn retire_exclusive(&mut self) -> bool {
        let previous = self.slot.state.load();

        if previous.is_destroyed() {
            return false;
        }

        self.slot.state.reset(previous.bits() | DESTROYED | IGNORED);
        clear_value(self.pool.policy(), previous, self.slot.value_mut());
        self.slot.set_config(None);
        self.pool.retire_outstanding();

        true
    }

    /// Retires an item that never reached the caller.
    fn discard(mut self) {
        self.retire_exclusive();
    }

    #[cfg(test)]
    pub(crate) fn slot_flags(&self) -> Flags {
        self.slot.state.load()
    }
}

/// Clears a value according to the flags captured when its item was retired.
fn clear_value<L: Lifecycle>(policy: &L, previous: Flags, value: &mut L::Value) {
    if previous.needs_reset() {
        policy.reset(value);
    } else if !previous.is_in_transfer() {
        *value = L::Value::default();
    }
}

impl<L: Lifecycle> Drop for Item<L> {
    fn drop(&mut self) {
        let flags = self.slot.state.load();

        if !flags.is_destroyed() {
            if flags.is_ignored() {
                // No safety net was armed for this item, so we release the value with the
                // storage instead of recycling it.
                self.pool.retire_outstanding();
                ITEMS_ABANDONED.with(|e| e.observe_once());

                if self.pool.manual_destroy_mode() {
                    warn!(
                        value = type_name::<L::Value>(),
                        "item dropped without being destroyed in manual-destroy mode"
                    );
                } else {
                    trace!(
                        value = type_name::<L::Value>(),
                        "unarmed item dropped, releasing its storage"
                    );
                }

                // SAFETY: We are in drop, the slot is never touched again.
                drop(unsafe { ManuallyDrop::take(&mut self.slot) });
                return;
            }

            self.retire_exclusive();
            LEAKS_RECOVERED.with(|e| e.observe_once());
            debug!(
                value = type_name::<L::Value>(),
                "recovered item dropped without being destroyed"
            );
        }

        // SAFETY: We are in drop, the slot is never touched again.
        let slot = unsafe { ManuallyDrop::take(&mut self.slot) };
        self.pool.recycle(slot);
    }
}

impl<L: Lifecycle> fmt::Debug for Item<L> {
    #[cfg_attr(test, mutants::skip)] // Debug output is not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("state", &self.slot.state)
            .finish_non_exhaustive()
    }
}
