//! Property tests for the allocation contract

use proptest::prelude::*;
use region_pool::{Pool, ALIGNMENT};

proptest! {
    #[test]
    fn small_allocations_are_aligned_and_disjoint(
        sizes in prop::collection::vec(1usize..=512, 1..48),
    ) {
        let mut pool = Pool::with_capacity(8 * 1024).unwrap();
        let mut ranges: Vec<(usize, usize)> = Vec::new();

        for &size in &sizes {
            let ptr = pool.alloc(size).unwrap();
            let addr = ptr.as_ptr() as usize;
            prop_assert_eq!(addr % ALIGNMENT, 0);
            ranges.push((addr, size));
        }

        ranges.sort();
        for pair in ranges.windows(2) {
            prop_assert!(
                pair[0].0 + pair[0].1 <= pair[1].0,
                "overlap between {:#x}+{} and {:#x}",
                pair[0].0, pair[0].1, pair[1].0,
            );
        }
    }

    #[test]
    fn zeroed_regions_read_zero(size in 1usize..=10_000) {
        let mut pool = Pool::with_capacity(4096).unwrap();
        let ptr = pool.alloc_zeroed(size).unwrap();
        // SAFETY: freshly allocated region of `size` bytes.
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), size) };
        prop_assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn pool_keeps_serving_across_resets(
        ops in prop::collection::vec((1usize..=2048, any::<bool>()), 1..64),
    ) {
        let mut pool = Pool::with_capacity(16 * 1024).unwrap();
        for (size, reset_after) in ops {
            pool.alloc(size).unwrap();
            if reset_after {
                pool.reset();
            }
        }
    }
}
