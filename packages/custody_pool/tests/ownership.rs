//! Integration tests for item ownership and pool accounting, driven only through the public API.

use std::num::NonZero;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

use custody_pool::{Error, Item, Lifecycle, Pool, Result};
use rand::Rng;

/// Sized byte buffers. Adopting copies into recycled storage when it is large enough.
#[derive(Debug, Default)]
struct SizedBytes {
    resets: AtomicUsize,
}

impl Lifecycle for SizedBytes {
    type Value = Vec<u8>;
    type Config = usize;
    type Source = Vec<u8>;

    fn new(&self, len: &usize, mut recycled: Vec<u8>) -> Result<Vec<u8>> {
        recycled.clear();
        recycled.resize(*len, 0);
        Ok(recycled)
    }

    fn parse(&self, source: Vec<u8>, mut recycled: Vec<u8>) -> Result<Vec<u8>> {
        if recycled.capacity() >= source.len() {
            recycled.clear();
            recycled.extend_from_slice(&source);
            return Ok(recycled);
        }

        Ok(source)
    }

    fn reset(&self, value: &mut Vec<u8>) {
        self.resets.fetch_add(1, Ordering::Relaxed);
        value.clear();
    }

    fn copy(&self, dst: &mut Vec<u8>, src: &Vec<u8>) -> Result<()> {
        dst.clone_from(src);
        Ok(())
    }
}

fn random_item(pool: &Pool<SizedBytes>, len: usize) -> Item<SizedBytes> {
    let item = pool.new_item(len).unwrap();
    item.p(|buf| rand::rng().fill(buf.as_mut_slice())).unwrap();
    item
}

#[test]
fn copy_then_take_round_trip() {
    let pool = Pool::new(SizedBytes::default());

    let item = random_item(&pool, 4096);
    let copy = item.copy().unwrap();

    let value = item.take().unwrap();
    assert_eq!(value.len(), 4096);
    assert!(copy.v(|buf| buf == &value).unwrap());

    copy.destroy().unwrap();

    assert_eq!(item.v(|_| ()), Err(Error::UseAfterDestroy));
    assert_eq!(copy.v(|_| ()), Err(Error::UseAfterDestroy));
}

#[test]
fn copy_is_independent_of_original() {
    let pool = Pool::new(SizedBytes::default());

    let item = pool.new_item(8).unwrap();
    let copy = item.copy().unwrap();

    copy.p(|buf| buf.fill(0xFF)).unwrap();

    assert_eq!(item.v(Clone::clone).unwrap(), vec![0; 8]);
    assert_eq!(copy.v(Clone::clone).unwrap(), vec![0xFF; 8]);
}

#[test]
fn take_returns_last_observed_value() {
    let pool = Pool::new(SizedBytes::default());

    let item = random_item(&pool, 64);
    let observed = item.v(Clone::clone).unwrap();

    assert_eq!(item.take().unwrap(), observed);

    assert_eq!(item.v(|_| ()), Err(Error::UseAfterDestroy));
    assert_eq!(item.p(|_| ()), Err(Error::UseAfterDestroy));
    assert_eq!(item.copy().unwrap_err(), Error::UseAfterDestroy);
    assert_eq!(item.take().unwrap_err(), Error::UseAfterDestroy);
}

#[test]
fn accounting_follows_issue_and_destroy() {
    let pool = Pool::builder(SizedBytes::default())
        .retained_limit(NonZero::new(3).unwrap())
        .build();

    let items = (0..10).map(|n| pool.new_item(n).unwrap()).collect::<Vec<_>>();
    assert_eq!(pool.count_outstanding_and_retained(), (10, 0));

    for item in &items {
        item.destroy().unwrap();
    }

    // Destroyed items keep their storage until they are dropped.
    assert_eq!(pool.count_outstanding_and_retained(), (0, 0));

    drop(items);
    assert_eq!(pool.count_outstanding_and_retained(), (0, 3));
}

#[test]
fn steady_workload_reuses_single_slot() {
    let pool = Pool::new(SizedBytes::default());

    pool.new_item(200).unwrap().manual_destroy().unwrap();
    assert_eq!(pool.count_outstanding_and_retained(), (0, 1));

    for len in 0..2000 {
        let item = pool.new_item(len).unwrap();
        assert_eq!(pool.count_outstanding_and_retained(), (1, 0));
        item.manual_destroy().unwrap();
    }

    assert_eq!(pool.count_outstanding_and_retained(), (0, 1));
}

#[test]
fn buffered_items_reset_and_parsed_items_zero() {
    let pool = Pool::new(SizedBytes::default());

    let created = pool.new_item(16).unwrap();
    let involved = pool.involve_item(3, vec![1, 2, 3]).unwrap();
    let parsed = pool.parse_item(3, vec![4, 5, 6]).unwrap();

    assert!(created.has_involved());
    assert!(involved.has_involved());
    assert!(!parsed.has_involved());

    created.destroy().unwrap();
    involved.destroy().unwrap();
    parsed.destroy().unwrap();

    assert_eq!(pool.policy().resets.load(Ordering::Relaxed), 2);
}

#[test]
fn dropped_item_is_recovered() {
    let pool = Pool::new(SizedBytes::default());

    let item = random_item(&pool, 32);
    drop(item);

    assert_eq!(pool.policy().resets.load(Ordering::Relaxed), 1);
    assert_eq!(pool.count_outstanding_and_retained(), (0, 1));

    // The recovered storage is handed out again, clean.
    let item = pool.new_item(4).unwrap();
    assert_eq!(item.v(Clone::clone).unwrap(), vec![0; 4]);
    assert_eq!(pool.count_outstanding_and_retained(), (1, 0));
}

#[test]
fn dropped_item_in_manual_destroy_mode_is_not_recycled() {
    let pool = Pool::builder(SizedBytes::default()).manual_destroy(true).build();

    drop(pool.new_item(32).unwrap());

    assert_eq!(pool.policy().resets.load(Ordering::Relaxed), 0);
    assert_eq!(pool.count_outstanding_and_retained(), (0, 0));

    // Explicitly retired items are still recycled.
    pool.new_item(32).unwrap().manual_destroy().unwrap();
    assert_eq!(pool.count_outstanding_and_retained(), (0, 1));
}

#[test]
fn item_keeps_pool_alive() {
    let item = {
        let pool = Pool::new(SizedBytes::default());
        pool.new_item(4).unwrap()
    };

    assert_eq!(item.v(Vec::len).unwrap(), 4);
    item.manual_destroy().unwrap();
}

#[cfg_attr(miri, ignore)] // Too slow under Miri.
#[test]
fn sync_check_reports_overlap_across_threads() {
    let pool = Pool::builder(SizedBytes::default()).sync_check(true).build();
    let item = pool.new_item(1).unwrap();

    let entered = Barrier::new(2);
    let checked = Barrier::new(2);

    thread::scope(|s| {
        s.spawn(|| {
            item.p(|_| {
                entered.wait();
                checked.wait();
            })
            .unwrap();
        });

        entered.wait();
        assert_eq!(item.v(|_| ()), Err(Error::ConcurrentAccess));
        assert_eq!(item.destroy(), Err(Error::ConcurrentAccess));
        checked.wait();
    });

    item.destroy().unwrap();
}

#[cfg_attr(miri, ignore)] // Too slow under Miri.
#[test]
fn racing_retirements_have_one_winner() {
    let pool = Pool::new(SizedBytes::default());
    let winners = AtomicUsize::new(0);

    for _ in 0..200 {
        let item = pool.new_item(8).unwrap();
        let start = Barrier::new(4);

        thread::scope(|s| {
            for worker in 0..4 {
                let item = &item;
                let start = &start;
                let winners = &winners;

                s.spawn(move || {
                    start.wait();

                    let won = if worker % 2 == 0 {
                        match item.destroy() {
                            Ok(()) => true,
                            Err(e) => {
                                assert_eq!(e, Error::DoubleDestroy);
                                false
                            }
                        }
                    } else {
                        match item.take() {
                            Ok(_) => true,
                            Err(e) => {
                                assert_eq!(e, Error::UseAfterDestroy);
                                false
                            }
                        }
                    };

                    if won {
                        winners.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        assert!(item.is_destroyed());
    }

    assert_eq!(winners.load(Ordering::Relaxed), 200);
    assert_eq!(pool.count_outstanding_and_retained(), (0, 1));
}

#[cfg_attr(miri, ignore)] // Too slow under Miri.
#[test]
fn copies_and_moves_across_threads() {
    let pool = Pool::new(SizedBytes::default());

    let expected = random_item(&pool, 256).into_inner().unwrap();

    thread::scope(|s| {
        for len in 0..256 {
            let item = pool.new_item(len).unwrap();
            item.p(|buf| buf.copy_from_slice(&expected[..len])).unwrap();

            let copy = item.copy().unwrap();
            s.spawn(move || {
                copy.p(|buf| rand::rng().fill(buf.as_mut_slice())).unwrap();
                copy.manual_destroy().unwrap();
            });

            let value = item.into_inner().unwrap();
            let expected = &expected;
            s.spawn(move || {
                assert_eq!(value.as_slice(), &expected[..len]);
            });
        }
    });

    assert_eq!(pool.count_outstanding_and_retained().0, 0);
}
