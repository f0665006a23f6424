//! Lifecycle tests against an instrumented backing allocator
//!
//! The counting backing proves the resource contract: every acquisition is
//! matched by a release once the pool is gone, failure paths unwind what
//! they already took, and reset serves a new phase without going back to
//! the backing allocator.

use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

use rand::Rng;
use region_pool::{BackingAlloc, Pool, PoolError, SystemBacking};

#[derive(Default)]
struct Ledger {
    acquired: Cell<u64>,
    released: Cell<u64>,
    /// Deny acquisitions once this many have succeeded
    deny_after: Cell<Option<u64>>,
}

#[derive(Clone, Default)]
struct CountingBacking {
    ledger: Rc<Ledger>,
}

impl CountingBacking {
    fn new() -> (Self, Rc<Ledger>) {
        let backing = Self::default();
        let ledger = Rc::clone(&backing.ledger);
        (backing, ledger)
    }
}

unsafe impl BackingAlloc for CountingBacking {
    fn acquire(&self, size: usize) -> Option<NonNull<u8>> {
        if let Some(limit) = self.ledger.deny_after.get() {
            if self.ledger.acquired.get() >= limit {
                return None;
            }
        }
        let ptr = SystemBacking.acquire(size)?;
        self.ledger.acquired.set(self.ledger.acquired.get() + 1);
        Some(ptr)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: usize) {
        self.ledger.released.set(self.ledger.released.get() + 1);
        unsafe { SystemBacking.release(ptr, size) };
    }
}

#[test]
fn every_acquisition_is_released_at_teardown() {
    let (backing, ledger) = CountingBacking::new();
    let mut pool = Pool::create_in(64 * 1024, backing).unwrap();

    for _ in 0..50 {
        pool.alloc(512).unwrap();
    }
    let big_a = pool.alloc(10_000).unwrap();
    let _big_b = pool.alloc(20_000).unwrap();
    pool.free_large(big_a);

    drop(pool);
    assert!(ledger.acquired.get() >= 3); // first block + two payloads
    assert_eq!(ledger.acquired.get(), ledger.released.get());
}

#[test]
fn failed_creation_has_no_side_effects() {
    let (backing, ledger) = CountingBacking::new();
    ledger.deny_after.set(Some(0));

    let result = Pool::create_in(4096, backing);
    assert!(matches!(result, Err(PoolError::OutOfMemory { .. })));
    assert_eq!(ledger.acquired.get(), 0);
    assert_eq!(ledger.released.get(), 0);
}

#[test]
fn failed_growth_propagates_and_pool_recovers() {
    let (backing, ledger) = CountingBacking::new();
    let mut pool = Pool::create_in(1, backing).unwrap(); // minimum-size pool
    ledger.deny_after.set(Some(1));

    let chunk = pool.max_small();
    pool.alloc(chunk).unwrap(); // fills the only block
    let err = pool.alloc(chunk).unwrap_err();
    assert!(err.is_out_of_memory());

    // the failure left the pool consistent: a reset makes it serve again
    pool.reset();
    pool.alloc(chunk).unwrap();

    drop(pool);
    assert_eq!(ledger.acquired.get(), ledger.released.get());
}

#[test]
fn failed_large_payload_acquisition_is_clean() {
    let (backing, ledger) = CountingBacking::new();
    let mut pool = Pool::create_in(16 * 1024, backing).unwrap();
    ledger.deny_after.set(Some(1));

    let err = pool.alloc(100_000).unwrap_err();
    assert!(err.is_out_of_memory());
    assert_eq!(ledger.acquired.get(), 1);

    // small path is untouched by the large failure
    pool.alloc(256).unwrap();
    drop(pool);
    assert_eq!(ledger.acquired.get(), ledger.released.get());
}

#[test]
fn failed_record_bookkeeping_releases_the_payload() {
    let (backing, ledger) = CountingBacking::new();
    let mut pool = Pool::create_in(1, backing).unwrap();

    // fill the only block so the record charge will need a growth block,
    // then allow exactly one more acquisition: the payload itself
    let chunk = pool.max_small();
    pool.alloc(chunk).unwrap();
    ledger.deny_after.set(Some(2));

    let err = pool.alloc(8192).unwrap_err();
    assert!(err.is_out_of_memory());
    assert_eq!(ledger.acquired.get(), 2, "payload was acquired");
    assert_eq!(ledger.released.get(), 1, "payload was handed back, not leaked");

    drop(pool);
    assert_eq!(ledger.acquired.get(), ledger.released.get());
}

#[test]
fn dropped_cleanup_registration_never_fires() {
    let (backing, ledger) = CountingBacking::new();
    let mut pool = Pool::create_in(1, backing).unwrap();

    let chunk = pool.max_small();
    pool.alloc(chunk).unwrap();
    ledger.deny_after.set(Some(1)); // no room for the registration record

    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);
    pool.add_cleanup(move || flag.set(true));

    drop(pool);
    assert!(!fired.get(), "silently dropped registration must not fire");
    assert_eq!(ledger.acquired.get(), ledger.released.get());
}

#[test]
fn cleanups_run_before_memory_is_released() {
    let (backing, ledger) = CountingBacking::new();
    let mut pool = Pool::create_in(16 * 1024, backing).unwrap();
    pool.alloc(50_000).unwrap(); // one live large payload

    let observed = Rc::new(Cell::new(u64::MAX));
    let seen = Rc::clone(&observed);
    let at_cleanup = Rc::clone(&ledger);
    pool.add_cleanup(move || seen.set(at_cleanup.released.get()));

    drop(pool);
    assert_eq!(observed.get(), 0, "handler must run before any release");
    assert_eq!(ledger.acquired.get(), ledger.released.get());
}

#[test]
fn reset_serves_a_new_phase_without_new_acquisitions() {
    let (backing, ledger) = CountingBacking::new();
    let mut pool = Pool::create_in(8 * 1024, backing).unwrap();

    for _ in 0..12 {
        pool.alloc(600).unwrap();
    }
    pool.reset();
    let before = ledger.acquired.get();

    for _ in 0..12 {
        pool.alloc(600).unwrap();
    }
    assert_eq!(
        ledger.acquired.get(),
        before,
        "rewound blocks must satisfy the new phase"
    );

    drop(pool);
    assert_eq!(ledger.acquired.get(), ledger.released.get());
}

#[test]
fn stress_random_allocations_balance_out() {
    let (backing, ledger) = CountingBacking::new();
    let mut pool = Pool::create_in(1024 * 1024, backing).unwrap();
    let mut rng = rand::rng();

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for _ in 0..1000 {
        let size = rng.random_range(1..=2048);
        let ptr = pool.alloc(size).unwrap();
        ranges.push((ptr.as_ptr() as usize, size));
    }

    ranges.sort();
    for pair in ranges.windows(2) {
        assert!(
            pair[0].0 + pair[0].1 <= pair[1].0,
            "allocations overlap: {:#x}+{} vs {:#x}",
            pair[0].0,
            pair[0].1,
            pair[1].0
        );
    }

    drop(pool);
    assert_eq!(ledger.acquired.get(), ledger.released.get());
}
