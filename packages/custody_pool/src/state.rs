//! Item lifecycle flags. All lifecycle truth of an item lives in a single machine word that is
//! only ever updated through atomic read-modify-write operations.
//!
//! The following flags exist:
//!
//! * `BUFFERED` - the value was constructed by the pool itself (`new`/`involve`) and must be
//!   passed through `Lifecycle::reset` when the item is destroyed.
//! * `DESTROYED` - terminal; the value has been released. Set exactly once per item lifetime.
//! * `IN_TRANSFER` - the value was lifted out of the item by a move; destroy bookkeeping must not
//!   reset it because there is nothing left behind to reset.
//! * `IN_SYNC_OP` - an access is in flight. This is the access gate: whoever sets it has
//!   exclusive access to the value and config of the slot until it clears the flag again.
//! * `IGNORED` - the safety net is disarmed, either because it was never armed (limits exceeded,
//!   manual-destroy mode) or because the item was already retired by an explicit action.
//!
//! A slot in the free list always has `DESTROYED` set. Drawing a slot clears every flag.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::Backoff;

use crate::{Error, Result};

pub(crate) const BUFFERED: usize = 1 << 0;
pub(crate) const DESTROYED: usize = 1 << 1;
pub(crate) const IN_TRANSFER: usize = 1 << 2;
pub(crate) const IN_SYNC_OP: usize = 1 << 3;
pub(crate) const IGNORED: usize = 1 << 4;

/// A point-in-time copy of the flags of a [`StateField`].
#[derive(Clone, Copy, Default, Eq, PartialEq)]
pub(crate) struct Flags(usize);

impl Flags {
    #[must_use]
    pub(crate) const fn bits(self) -> usize {
        self.0
    }

    #[must_use]
    pub(crate) const fn contains(self, flag: usize) -> bool {
        self.0 & flag == flag
    }

    #[must_use]
    pub(crate) const fn is_buffered(self) -> bool {
        self.contains(BUFFERED)
    }

    #[must_use]
    pub(crate) const fn is_destroyed(self) -> bool {
        self.contains(DESTROYED)
    }

    #[must_use]
    pub(crate) const fn is_in_transfer(self) -> bool {
        self.contains(IN_TRANSFER)
    }

    #[must_use]
    pub(crate) const fn is_ignored(self) -> bool {
        self.contains(IGNORED)
    }

    /// Whether a destroy of an item in this state must run the lifecycle `reset` on the value.
    ///
    /// If not, the value is replaced with its default instead.
    #[must_use]
    pub(crate) const fn needs_reset(self) -> bool {
        self.is_buffered() && !self.is_in_transfer()
    }
}

impl fmt::Debug for Flags {
    #[cfg_attr(test, mutants::skip)] // Debug output is not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flags")
            .field("buffered", &self.is_buffered())
            .field("destroyed", &self.is_destroyed())
            .field("in_transfer", &self.is_in_transfer())
            .field("in_sync_op", &self.contains(IN_SYNC_OP))
            .field("ignored", &self.is_ignored())
            .finish()
    }
}

/// The atomically updated lifecycle bitfield of one slot.
pub(crate) struct StateField {
    bits: AtomicUsize,
}

impl StateField {
    /// A field in the state used by slots sitting in the free list.
    #[must_use]
    pub(crate) const fn destroyed() -> Self {
        Self {
            bits: AtomicUsize::new(DESTROYED),
        }
    }

    #[must_use]
    pub(crate) fn load(&self) -> Flags {
        Flags(self.bits.load(Ordering::Acquire))
    }

    /// Overwrites all flags. Requires exclusive access, so no atomic operation is needed.
    pub(crate) fn reset(&mut self, flags: usize) {
        *self.bits.get_mut() = flags;
    }

    /// Acquires the access gate of the slot.
    ///
    /// Fails with [`Error::UseAfterDestroy`] if the slot is destroyed (whether observed before
    /// or after waiting for the gate). If the gate is held by someone else, either fails with
    /// [`Error::ConcurrentAccess`] (when `fail_on_contention` is set) or spins until it is free.
    ///
    /// Returns the flags as they were at the moment of acquisition.
    pub(crate) fn acquire(&self, fail_on_contention: bool) -> Result<(AccessGate<'_>, Flags)> {
        let backoff = Backoff::new();
        let mut current = self.bits.load(Ordering::Acquire);

        loop {
            if current & DESTROYED != 0 {
                return Err(Error::UseAfterDestroy);
            }

            if current & IN_SYNC_OP != 0 {
                if fail_on_contention {
                    return Err(Error::ConcurrentAccess);
                }

                backoff.snooze();
                current = self.bits.load(Ordering::Acquire);
                continue;
            }

            // Acquire on success pairs with the Release in `AccessGate::drop` so we observe every
            // write the previous gate holder made to the value.
            match self.bits.compare_exchange_weak(
                current,
                current | IN_SYNC_OP,
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok((AccessGate { field: self }, Flags(current))),
                Err(actual) => current = actual,
            }
        }
    }
}

impl fmt::Debug for StateField {
    #[cfg_attr(test, mutants::skip)] // Debug output is not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.load().fmt(f)
    }
}

/// Proof of holding the access gate of a slot. Releases the gate when dropped.
#[derive(Debug)]
pub(crate) struct AccessGate<'a> {
    field: &'a StateField,
}

impl AccessGate<'_> {
    /// Marks the slot destroyed, together with any `extra` flags, and disarms the safety net.
    ///
    /// Only the gate holder may retire a slot, so the transition cannot race with another
    /// retirement. Returns the flags captured at the moment of the swap.
    pub(crate) fn retire(&self, extra: usize) -> Flags {
        let previous = self
            .field
            .bits
            .fetch_or(DESTROYED | IGNORED | extra, Ordering::AcqRel);

        debug_assert!(
            previous & DESTROYED == 0,
            "gate holder observed an already destroyed slot"
        );

        Flags(previous)
    }
}

impl Drop for AccessGate<'_> {
    fn drop(&mut self) {
        self.field.bits.fetch_and(!IN_SYNC_OP, Ordering::Release);
    }
}
