#![cfg(test)]

// Property tests for DenseHashSet kept inside the crate so they can check
// the internal layout after every step.

use crate::dense_hash_set::DenseHashSet;
use crate::error::SetError;
use crate::prime;
use proptest::prelude::*;
use std::collections::BTreeSet;

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// values, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize),
    Remove(usize),
    Contains(usize),
    Enumerate,
    MutateWhileEnumerating(usize),
    Snapshot,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>, usize)> {
    (proptest::collection::vec("[a-z]{0,4}", 1..=12), 0usize..=20).prop_flat_map(
        |(pool, initial)| {
            let idxs: Vec<usize> = (0..pool.len()).collect();
            let idx = proptest::sample::select(idxs);
            let op = prop_oneof![
                3 => idx.clone().prop_map(OpI::Insert),
                2 => idx.clone().prop_map(OpI::Remove),
                1 => idx.clone().prop_map(OpI::Contains),
                1 => Just(OpI::Enumerate),
                1 => idx.clone().prop_map(OpI::MutateWhileEnumerating),
                1 => Just(OpI::Snapshot),
            ];
            proptest::collection::vec(op, 1..80)
                .prop_map(move |ops| (pool.clone(), ops, initial))
        },
    )
}

fn string_hash(s: &str) -> u32 {
    // FNV-1a; any deterministic function of the value works.
    s.bytes()
        .fold(0x811c_9dc5u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193))
}

fn run(
    pool: &[String],
    ops: Vec<OpI>,
    initial: usize,
    hash: fn(&str) -> u32,
) -> Result<(), TestCaseError> {
    let sut: DenseHashSet<String> = DenseHashSet::with_capacity(initial);
    let mut model: BTreeSet<String> = BTreeSet::new();
    let mut last_capacity = sut.capacity();

    for op in ops {
        match op {
            OpI::Insert(i) => {
                let v = pool[i].clone();
                let already = model.contains(&v);
                let before = sut.len();
                match sut.insert(v.clone(), hash(&v)) {
                    Ok(()) => {
                        prop_assert!(!already, "insert must fail on duplicate");
                        model.insert(v);
                    }
                    Err(SetError::DuplicateValue) => {
                        prop_assert!(already, "duplicate error only when value exists");
                        prop_assert_eq!(sut.len(), before);
                    }
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            OpI::Remove(i) => {
                let v = &pool[i];
                let present = model.remove(v);
                let layout = sut.raw_layout();
                let removed = sut.remove(v, hash(v)).expect("no enumeration is open");
                prop_assert_eq!(removed.as_ref(), present.then_some(v));
                if !present {
                    prop_assert_eq!(sut.raw_layout(), layout, "absent remove must not touch layout");
                }
            }
            OpI::Contains(i) => {
                let v = &pool[i];
                prop_assert_eq!(sut.contains(v, hash(v)).unwrap(), model.contains(v));
            }
            OpI::Enumerate => {
                let seen: Vec<String> = sut.enumerate().unwrap().collect();
                prop_assert_eq!(seen.len(), model.len());
                let set: BTreeSet<String> = seen.into_iter().collect();
                prop_assert_eq!(&set, &model);
                prop_assert!(!sut.is_enumerating());
            }
            OpI::MutateWhileEnumerating(i) => {
                let v = &pool[i];
                let e = sut.enumerate().unwrap();
                let layout = sut.raw_layout();
                prop_assert_eq!(
                    sut.insert(v.clone(), hash(v)),
                    Err(SetError::ConcurrentModification)
                );
                prop_assert_eq!(sut.remove(v, hash(v)), Err(SetError::ConcurrentModification));
                prop_assert_eq!(sut.raw_layout(), layout);
                drop(e);
            }
            OpI::Snapshot => {
                let snap: BTreeSet<String> = sut.snapshot().into_iter().collect();
                prop_assert_eq!(&snap, &model);
            }
        }

        // Post-conditions after each op
        sut.assert_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert!(prime::is_prime(sut.capacity()));
        prop_assert!(sut.capacity() >= last_capacity, "capacity must never shrink");
        last_capacity = sut.capacity();
    }
    Ok(())
}

// Property: State-machine equivalence against a BTreeSet model.
// Invariants exercised across random operation sequences:
// - Duplicate values are rejected and leave `len` unchanged.
// - Removing an absent value leaves the raw layout untouched.
// - Enumeration yields exactly the live values and lowers the guard.
// - Mutation during enumeration fails without side effects.
// - Capacity is prime and never shrinks; chains stay well-formed.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops, initial) in arb_scenario()) {
        run(&pool, ops, initial, string_hash)?;
    }
}

fn const_hash(_: &str) -> u32 {
    0
}

// Property: Same state-machine invariants as above, under worst-case
// collision behavior (constant hash). Every value shares one chain, which
// stresses unlinking and relinking of interior chain nodes.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops, initial) in arb_scenario()) {
        run(&pool, ops, initial, const_hash)?;
    }
}
