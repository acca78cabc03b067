use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::queue::SegQueue;
use tracing::trace;

use crate::metrics::{SLOTS_DISCARDED, SLOTS_REUSED};
use crate::state::{BUFFERED, DESTROYED, IGNORED};
use crate::{Item, Lifecycle, PoolBuilder, Result, Slot};

/// Pool-wide policy flags and limits, fixed at construction time.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Settings {
    pub(crate) outstanding_limit: NonZero<usize>,
    pub(crate) retained_limit: NonZero<usize>,
    pub(crate) no_put_back: bool,
    pub(crate) manual_destroy: bool,
    pub(crate) sync_check: bool,
}

pub(crate) struct PoolInner<L: Lifecycle> {
    policy: L,

    /// Slots of retired items, ready to be handed out again. Every slot in here is in the
    /// destroyed state with its config cleared.
    free: SegQueue<Box<Slot<L>>>,

    /// Items issued and not yet retired.
    outstanding: AtomicUsize,

    /// Slots in `free`. Incremented before a push and decremented after a pop, so it never
    /// under-reports the length of the free list.
    retained: AtomicUsize,

    settings: Settings,
}

/// A thread-safe pool of reusable values, handed out as [`Item`]s that track ownership.
///
/// The pool delegates construction, adoption, clearing and duplication of values to its
/// [`Lifecycle`] policy. It keeps the storage of retired items in a lock-free free list and hands
/// it out again to new items, so a steady workload stops allocating.
///
/// This type acts as a cloneable handle to a shared pool instance. Every item also holds such a
/// handle, so the pool remains alive as long as any clone or any item exists.
///
/// # Item lifecycle
///
/// An item is issued by [`new_item()`][Self::new_item], [`involve_item()`][Self::involve_item] or
/// [`parse_item()`][Self::parse_item] and is retired exactly once by one of:
///
/// * [`Item::destroy()`] or [`Item::manual_destroy()`] - the value is reset (or zeroed).
/// * [`Item::take()`] or [`Item::into_inner()`] - the value is moved out to the caller.
/// * Dropping the item while it is still live - the safety net destroys it.
///
/// # Thread safety
///
/// The pool is [`Send`] and [`Sync`] when its policy is, and when the values and configs are
/// [`Send`].
///
/// # Example
///
/// ```
/// use custody_pool::Pool;
/// # use custody_pool::{Lifecycle, Result};
/// #
/// # #[derive(Debug)]
/// # struct Buffers;
/// #
/// # impl Lifecycle for Buffers {
/// #     type Value = Vec<u8>;
/// #     type Config = usize;
/// #     type Source = Vec<u8>;
/// #     fn new(&self, len: &usize, mut recycled: Vec<u8>) -> Result<Vec<u8>> {
/// #         recycled.resize(*len, 0);
/// #         Ok(recycled)
/// #     }
/// #     fn parse(&self, source: Vec<u8>, _: Vec<u8>) -> Result<Vec<u8>> { Ok(source) }
/// #     fn reset(&self, value: &mut Vec<u8>) { value.clear(); }
/// #     fn copy(&self, dst: &mut Vec<u8>, src: &Vec<u8>) -> Result<()> {
/// #         dst.clone_from(src);
/// #         Ok(())
/// #     }
/// # }
///
/// let pool = Pool::new(Buffers);
///
/// let item = pool.new_item(16)?;
/// item.p(|buf| buf[0] = 42)?;
/// assert_eq!(item.v(|buf| buf[0])?, 42);
///
/// item.manual_destroy()?;
///
/// // The storage went back to the free list.
/// assert_eq!(pool.count_outstanding_and_retained(), (0, 1));
/// # Ok::<(), custody_pool::Error>(())
/// ```
pub struct Pool<L: Lifecycle> {
    inner: Arc<PoolInner<L>>,
}

impl<L: Lifecycle> Pool<L> {
    /// Creates a new pool with default settings.
    ///
    /// Use [`Pool::builder()`] for custom configuration.
    #[must_use]
    pub fn new(policy: L) -> Self {
        Self::builder(policy).build()
    }

    /// Creates a builder for configuring the pool.
    pub fn builder(policy: L) -> PoolBuilder<L> {
        PoolBuilder::new(policy)
    }

    pub(crate) fn new_inner(policy: L, settings: Settings) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                policy,
                free: SegQueue::new(),
                outstanding: AtomicUsize::new(0),
                retained: AtomicUsize::new(0),
                settings,
            }),
        }
    }

    /// Issues an item whose value is constructed by the policy from `config`.
    ///
    /// The item is buffered: destroying it resets the value via [`Lifecycle::reset()`].
    ///
    /// # Errors
    ///
    /// Returns whatever error [`Lifecycle::new()`] returns, typically
    /// [`Error::UnsupportedConfig`][crate::Error::UnsupportedConfig].
    pub fn new_item(&self, config: L::Config) -> Result<Item<L>> {
        self.issue(true, config, |policy, config, recycled| policy.new(config, recycled))
    }

    /// Issues an item that adopts an external object into the pool.
    ///
    /// The item is buffered like one from [`new_item()`][Self::new_item], so the pool may keep
    /// and reuse the adopted storage after the item is destroyed. The config is kept for
    /// [`Item::copy()`].
    ///
    /// # Errors
    ///
    /// Returns whatever error [`Lifecycle::parse()`] returns, typically
    /// [`Error::UnsupportedSource`][crate::Error::UnsupportedSource].
    pub fn involve_item(&self, config: L::Config, source: L::Source) -> Result<Item<L>> {
        self.issue(true, config, |policy, _, recycled| policy.parse(source, recycled))
    }

    /// Issues an item that wraps an external object without assuming it is pool-shaped.
    ///
    /// The item is not buffered: destroying it replaces the value with its default instead of
    /// calling [`Lifecycle::reset()`]. The config is kept for [`Item::copy()`].
    ///
    /// # Errors
    ///
    /// Returns whatever error [`Lifecycle::parse()`] returns, typically
    /// [`Error::UnsupportedSource`][crate::Error::UnsupportedSource].
    pub fn parse_item(&self, config: L::Config, source: L::Source) -> Result<Item<L>> {
        self.issue(false, config, |policy, _, recycled| policy.parse(source, recycled))
    }

    /// Returns the number of items currently issued and not retired, and the number of slots
    /// sitting in the free list, in that order.
    ///
    /// The two values are read independently and are not synchronized with concurrent
    /// operations, so they are only suitable for diagnostics.
    #[must_use]
    pub fn count_outstanding_and_retained(&self) -> (usize, usize) {
        (
            self.inner.outstanding.load(Ordering::Relaxed),
            self.inner.retained.load(Ordering::Relaxed),
        )
    }

    /// The lifecycle policy of the pool.
    #[must_use]
    pub fn policy(&self) -> &L {
        &self.inner.policy
    }

    pub(crate) fn sync_check(&self) -> bool {
        self.inner.settings.sync_check
    }

    pub(crate) fn manual_destroy_mode(&self) -> bool {
        self.inner.settings.manual_destroy
    }

    fn issue(
        &self,
        buffered: bool,
        config: L::Config,
        init: impl FnOnce(&L, &L::Config, L::Value) -> Result<L::Value>,
    ) -> Result<Item<L>> {
        let mut slot = self.draw(buffered);

        if let Err(e) = slot.init_with(|recycled| init(&self.inner.policy, &config, recycled)) {
            // The slot never became an item, so this is neither a leak nor a destroy.
            self.retire_outstanding();
            self.recycle(slot);
            return Err(e);
        }

        slot.set_config(Some(config));

        Ok(Item::new(slot, self.clone()))
    }

    /// Takes a slot from the free list or allocates a new one, and prepares it for a new item.
    fn draw(&self, buffered: bool) -> Box<Slot<L>> {
        let mut slot = if let Some(slot) = self.inner.free.pop() {
            self.inner.retained.fetch_sub(1, Ordering::Relaxed);
            SLOTS_REUSED.with(|e| e.observe_once());
            slot
        } else {
            Slot::new()
        };

        let outstanding = self
            .inner
            .outstanding
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1);
        let retained = self.inner.retained.load(Ordering::Relaxed);

        let settings = &self.inner.settings;

        // `recycle()` never lets the free list grow past its limit, so the retained check only
        // guards the invariant and never withholds the safety net in practice.
        let within_limits = outstanding <= settings.outstanding_limit.get()
            && retained <= settings.retained_limit.get();
        let armed = within_limits && !settings.manual_destroy;

        let mut flags = 0;

        if buffered {
            flags |= BUFFERED;
        }

        if !armed {
            flags |= IGNORED;
        }

        slot.state.reset(flags);
        slot
    }

    /// Accounts for one item leaving the outstanding set. Called exactly once per issued item.
    pub(crate) fn retire_outstanding(&self) {
        self.inner.outstanding.fetch_sub(1, Ordering::Relaxed);
    }

    /// Returns the storage of a retired item to the free list, or releases it if the pool is in
    /// strict mode or the free list is full.
    pub(crate) fn recycle(&self, mut slot: Box<Slot<L>>) {
        slot.set_config(None);
        slot.state.reset(DESTROYED);

        let settings = &self.inner.settings;

        if settings.no_put_back {
            trace!(pool = type_name::<L>(), "strict mode, releasing slot");
            SLOTS_DISCARDED.with(|e| e.observe_once());
            return;
        }

        let limit = settings.retained_limit.get();

        // Reserve a place in the free list before pushing so that concurrent returns cannot
        // overshoot the limit.
        let reserved = self
            .inner
            .retained
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |retained| {
                (retained < limit).then(|| retained.saturating_add(1))
            })
            .is_ok();

        if reserved {
            self.inner.free.push(slot);
        } else {
            trace!(
                pool = type_name::<L>(),
                limit, "free list is full, releasing slot"
            );
            SLOTS_DISCARDED.with(|e| e.observe_once());
        }
    }
}

impl<L: Lifecycle> Clone for Pool<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: Lifecycle> fmt::Debug for Pool<L> {
    #[cfg_attr(test, mutants::skip)] // Debug output is not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (outstanding, retained) = self.count_outstanding_and_retained();

        f.debug_struct(type_name::<Self>())
            .field("outstanding", &outstanding)
            .field("retained", &retained)
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}
