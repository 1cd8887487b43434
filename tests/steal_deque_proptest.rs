use core::ptr::NonNull;
use std::collections::VecDeque;

use filch::{GhostStealDeque, GhostToken};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Operation {
    PushBottom(u8),
    PopBottom,
    PopTop,
}

proptest! {
    // Single-threaded model check: with no contention the deque must agree
    // with a double-ended queue exactly, including its empty signals.
    #[test]
    fn deque_matches_model(ops in proptest::collection::vec(
        prop_oneof![
            any::<u8>().prop_map(Operation::PushBottom),
            Just(Operation::PopBottom),
            Just(Operation::PopTop),
        ],
        1..200
    )) {
        let mut arena: Vec<u64> = (0..=u8::MAX as u64).collect();
        let base = arena.as_mut_ptr();
        let mut model: VecDeque<u64> = VecDeque::new();

        GhostToken::new(|token| {
            let deque: GhostStealDeque<'_, u64, 16> = GhostStealDeque::new();
            let (mut owner, thief) = token.split_roles();

            for op in ops {
                match op {
                    Operation::PushBottom(v) => {
                        model.push_back(u64::from(v));
                        let ptr = NonNull::new(unsafe { base.add(v as usize) }).unwrap();
                        deque.push_bottom(&mut owner, ptr);
                    }
                    Operation::PopBottom => {
                        let expected = model.pop_back();
                        let got = deque
                            .pop_bottom(&mut owner)
                            .map(|p| unsafe { *p.as_ref() });
                        prop_assert_eq!(got, expected);
                    }
                    Operation::PopTop => {
                        let expected = model.pop_front();
                        let (stolen, now_empty) = deque.pop_top(&thief);
                        let got = stolen.map(|p| unsafe { *p.as_ref() });
                        // An uncontended steal never loses its CAS.
                        prop_assert_eq!(got, expected);
                        prop_assert_eq!(now_empty, model.is_empty());
                    }
                }
                prop_assert_eq!(deque.is_empty(&token), model.is_empty());
                prop_assert_eq!(deque.len_hint(&token), model.len() as u64);
            }

            // Drain what is left; LIFO from the owner's end.
            while let Some(expected) = model.pop_back() {
                let got = deque.pop_bottom(&mut owner).map(|p| unsafe { *p.as_ref() });
                prop_assert_eq!(got, Some(expected));
            }
            prop_assert_eq!(deque.pop_bottom(&mut owner), None);
            Ok(())
        })?;
    }
}
