use std::collections::HashSet;

use filch::{GhostPoolAllocator, GhostToken};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Operation {
    Allocate(usize),
    /// Free the live allocation at this (wrapped) position.
    Free(usize),
}

proptest! {
    // Any sequence of allocations and frees keeps live blocks disjoint and
    // the usage accounting exact.
    #[test]
    fn pool_serves_disjoint_blocks(ops in proptest::collection::vec(
        prop_oneof![
            (1usize..4096).prop_map(Operation::Allocate),
            any::<usize>().prop_map(Operation::Free),
        ],
        1..150
    )) {
        let sizes = [16usize, 64, 512, 4096];
        GhostToken::new(|token| {
            let pool: GhostPoolAllocator<'_> = GhostPoolAllocator::with_sizes(&sizes);
            let mut live: Vec<(core::ptr::NonNull<u8>, usize)> = Vec::new();
            let mut expected_in_use = 0usize;

            for op in ops {
                match op {
                    Operation::Allocate(n) => {
                        let p = pool.allocate(&token, n).unwrap();
                        let bucket = sizes.iter().copied().find(|&s| s >= n).unwrap();
                        expected_in_use += bucket;
                        live.push((p, n));
                    }
                    Operation::Free(raw) => {
                        if live.is_empty() {
                            continue;
                        }
                        let (p, n) = live.swap_remove(raw % live.len());
                        let bucket = sizes.iter().copied().find(|&s| s >= n).unwrap();
                        expected_in_use -= bucket;
                        unsafe { pool.deallocate(&token, p, n) };
                    }
                }

                // Live blocks never alias.
                let addrs: HashSet<usize> =
                    live.iter().map(|(p, _)| p.as_ptr() as usize).collect();
                prop_assert_eq!(addrs.len(), live.len());
                prop_assert_eq!(pool.stats().in_use_bytes, expected_in_use);
            }

            for (p, n) in live.drain(..) {
                unsafe { pool.deallocate(&token, p, n) };
            }
            prop_assert_eq!(pool.stats().in_use_bytes, 0);
            Ok(())
        })?;
    }
}
