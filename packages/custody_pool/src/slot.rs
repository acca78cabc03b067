use std::cell::UnsafeCell;
use std::fmt;
use std::mem;

use crate::state::{AccessGate, Flags, StateField};
use crate::{Lifecycle, Result};

/// The recyclable storage behind an [`Item`][crate::Item].
///
/// Slots travel between the free list of the pool and the items it hands out. The value and the
/// config are only ever touched either with exclusive access to the slot (`&mut`) or while
/// holding the access gate in the slot's state field.
pub(crate) struct Slot<L: Lifecycle> {
    pub(crate) state: StateField,

    /// We use `UnsafeCell` because the access gate in `state` does our own synchronization of
    /// reads and writes.
    value: UnsafeCell<L::Value>,

    /// The construction argument last used to initialize `value`. `None` while destroyed.
    config: UnsafeCell<Option<L::Config>>,
}

impl<L: Lifecycle> Slot<L> {
    /// Creates a slot in the same state as one freshly taken out of the free list would be in.
    #[must_use]
    pub(crate) fn new() -> Box<Self> {
        Box::new(Self {
            state: StateField::destroyed(),
            value: UnsafeCell::new(L::Value::default()),
            config: UnsafeCell::new(None),
        })
    }

    #[must_use]
    pub(crate) fn value_mut(&mut self) -> &mut L::Value {
        self.value.get_mut()
    }

    pub(crate) fn set_config(&mut self, config: Option<L::Config>) {
        *self.config.get_mut() = config;
    }

    /// Initializes the value in place through a lifecycle operation that consumes the current
    /// (recycled) value and produces a new one.
    ///
    /// On failure the slot is left holding a default value.
    pub(crate) fn init_with(
        &mut self,
        f: impl FnOnce(L::Value) -> Result<L::Value>,
    ) -> Result<()> {
        let recycled = mem::take(self.value.get_mut());
        *self.value.get_mut() = f(recycled)?;
        Ok(())
    }

    /// Acquires the access gate and returns a view with exclusive access to the contents.
    pub(crate) fn access(&self, fail_on_contention: bool) -> Result<SlotAccess<'_, L>> {
        let (gate, _) = self.state.acquire(fail_on_contention)?;

        Ok(SlotAccess { slot: self, gate })
    }
}

impl<L: Lifecycle> fmt::Debug for Slot<L> {
    #[cfg_attr(test, mutants::skip)] // Debug output is not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// SAFETY: Sharing a slot between threads only ever exposes the value and config to the single
// thread that holds the access gate, so it is the same contract as `Mutex<T>: Sync where T: Send`.
unsafe impl<L> Sync for Slot<L>
where
    L: Lifecycle,
    L::Value: Send,
    L::Config: Send,
{
}

/// Exclusive access to the contents of a slot, for as long as the access gate is held.
#[derive(Debug)]
pub(crate) struct SlotAccess<'a, L: Lifecycle> {
    slot: &'a Slot<L>,
    gate: AccessGate<'a>,
}

impl<L: Lifecycle> SlotAccess<'_, L> {
    #[must_use]
    pub(crate) fn value(&self) -> &L::Value {
        // SAFETY: Holding the gate grants exclusive access to the value and the borrow is bound
        // to the lifetime of the gate holder.
        unsafe { &*self.slot.value.get() }
    }

    #[must_use]
    pub(crate) fn value_mut(&mut self) -> &mut L::Value {
        // SAFETY: Holding the gate grants exclusive access to the value and we take `&mut self`,
        // so no other borrow derived from this view can coexist.
        unsafe { &mut *self.slot.value.get() }
    }

    #[must_use]
    pub(crate) fn config(&self) -> Option<&L::Config> {
        // SAFETY: Holding the gate grants exclusive access to the config.
        unsafe { (*self.slot.config.get()).as_ref() }
    }

    /// Retires the slot. See [`AccessGate::retire`].
    pub(crate) fn retire(&mut self, extra: usize) -> Flags {
        let previous = self.gate.retire(extra);

        // SAFETY: Holding the gate grants exclusive access to the config.
        unsafe {
            *self.slot.config.get() = None;
        }

        previous
    }
}
