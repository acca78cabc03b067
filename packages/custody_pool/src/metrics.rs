//! Metrics for item recycling.
//!
//! The events are per-thread instances to minimize contention on the hot path.

use nm::Event;

thread_local! {
    /// Items that were dropped while still live and had to be destroyed by the safety net.
    ///
    /// A steadily growing count means some caller forgets to destroy its items.
    pub(crate) static LEAKS_RECOVERED: Event = Event::builder()
        .name("custody_pool_leaks_recovered")
        .build();

    /// Items that were dropped while still live without an armed safety net, so their storage
    /// was released without being recycled.
    pub(crate) static ITEMS_ABANDONED: Event = Event::builder()
        .name("custody_pool_items_abandoned")
        .build();

    /// Slots drawn from the free list instead of being allocated.
    pub(crate) static SLOTS_REUSED: Event = Event::builder()
        .name("custody_pool_slots_reused")
        .build();

    /// Slots released instead of being returned to the free list, either because of strict mode
    /// or because the retention limit was reached.
    pub(crate) static SLOTS_DISCARDED: Event = Event::builder()
        .name("custody_pool_slots_discarded")
        .build();
}
