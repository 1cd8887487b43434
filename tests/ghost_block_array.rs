use core::ptr::NonNull;

use filch::{GhostBlockArray, GhostStealDeque, GhostToken};

#[test]
fn head_writes_are_readable_from_both_ends() {
    const N: usize = 100;
    let mut values: Vec<u64> = (0..N as u64).collect();
    GhostToken::new(|token| {
        let array: GhostBlockArray<'_, u64, 16> = GhostBlockArray::new();
        let (mut owner, thief) = token.split_roles();

        let base = values.as_mut_ptr();
        for i in 0..N {
            array.put_head(&mut owner, i as u64, unsafe { base.add(i) });
        }
        for i in 0..N {
            let from_head = array.get_head(&mut owner, i as u64);
            let from_tail = array.get_tail(&thief, i as u64);
            assert_eq!(from_head, unsafe { base.add(i) });
            assert_eq!(from_tail, from_head);
            assert_eq!(unsafe { *from_head }, i as u64);
        }
    });
}

#[test]
fn owner_cursor_walks_both_directions() {
    const N: u64 = 64;
    let mut values: Vec<u64> = (0..N).collect();
    GhostToken::new(|token| {
        let array: GhostBlockArray<'_, u64, 16> = GhostBlockArray::new();
        let (mut owner, _thief) = token.split_roles();

        let base = values.as_mut_ptr();
        for i in 0..N {
            array.put_head(&mut owner, i, unsafe { base.add(i as usize) });
        }
        // Jump the cursor several blocks back, then forward again.
        assert_eq!(array.get_head(&mut owner, 3), unsafe { base.add(3) });
        assert_eq!(array.get_head(&mut owner, 60), unsafe { base.add(60) });
        assert_eq!(array.get_head(&mut owner, 17), unsafe { base.add(17) });
    });
}

#[test]
fn stolen_blocks_are_retired_and_reused() {
    const CAP: usize = 16;
    const PUSHES: u64 = 3 * CAP as u64;
    let mut values: Vec<u64> = (0..PUSHES + 32).collect();
    GhostToken::new(|token| {
        let deque: GhostStealDeque<'_, u64, CAP> = GhostStealDeque::new();
        let (mut owner, thief) = token.split_roles();

        let (first, rest) = values.split_at_mut(PUSHES as usize);
        for v in first.iter_mut() {
            deque.push_bottom(&mut owner, NonNull::from(v));
        }
        assert_eq!(deque.tail_block_id(&token), 0);

        // Stealing through two whole blocks plus the first slot of the
        // third retires blocks 0 and 1.
        for i in 0..(2 * CAP as u64 + 1) {
            let (stolen, _) = deque.pop_top(&thief);
            assert_eq!(unsafe { *stolen.expect("uncontended steal lost").as_ref() }, i);
        }
        assert_eq!(deque.tail_block_id(&token), 2);

        deque.reclaim(&mut owner);
        assert_eq!(deque.reuse_depth(&mut owner), 2);

        // The next block boundary is served from the reuse pool.
        for v in rest.iter_mut() {
            deque.push_bottom(&mut owner, NonNull::from(v));
        }
        assert_eq!(deque.reuse_depth(&mut owner), 0);

        // Everything still in the deque drains intact.
        let mut remaining = Vec::new();
        while let Some(v) = deque.pop_bottom(&mut owner) {
            remaining.push(unsafe { *v.as_ref() });
        }
        let expected: Vec<u64> = ((2 * CAP as u64 + 1)..(PUSHES + 32)).rev().collect();
        assert_eq!(remaining, expected);
    });
}

#[test]
fn reclaim_with_nothing_retired_is_a_no_op() {
    GhostToken::new(|token| {
        let array: GhostBlockArray<'_, u64, 16> = GhostBlockArray::new();
        let (mut owner, _thief) = token.split_roles();
        array.reclaim(&mut owner);
        assert_eq!(array.reuse_depth(&mut owner), 0);
        assert_eq!(array.tail_block_id(&token), 0);
    });
}
