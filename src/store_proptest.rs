#![cfg(test)]

// Property tests for the stores kept inside the crate so they can reach the
// test-only invariant checks.

use crate::config::LinearHashConfig;
use crate::error::StoreError;
use crate::identity_hasher::BuildIdentityHasher;
use crate::linear_hash::LinearHashStore;
use crate::linear_probing::LinearProbingStore;
use crate::recency_cache::RecencyCache;
use crate::robin_hood::RobinHoodStore;
use crate::store::Store;
use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};

#[derive(Clone, Debug)]
enum Op {
    Put(u64, i32),
    Get(u64),
    Remove(u64),
}

// Keys drawn from a small range so identity-hashed homes collide often.
fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let key = 0u64..24;
    let op = prop_oneof![
        3 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Put(k, v)),
        2 => key.clone().prop_map(Op::Get),
        2 => key.prop_map(Op::Remove),
    ];
    proptest::collection::vec(op, 1..120)
}

// State-machine equivalence against std::collections::HashMap.
// - `put` returns the replaced value, or CapacityExhausted exactly when the
//   key is new and `capacity` entries are already live.
// - `get`/`remove` agree with the model; removing an absent key is a no-op.
// - `len` matches after each step and `check` holds structurally.
fn run_against_model<T, F>(
    sut: &mut T,
    capacity: Option<usize>,
    ops: Vec<Op>,
    check: F,
) -> Result<(), TestCaseError>
where
    T: Store<u64, i32>,
    F: Fn(&T),
{
    let mut model: HashMap<u64, i32> = HashMap::new();
    for op in ops {
        match op {
            Op::Put(k, v) => {
                let full = capacity.is_some_and(|c| model.len() == c);
                let res = sut.put(k, v);
                if full && !model.contains_key(&k) {
                    prop_assert!(
                        matches!(res, Err(StoreError::CapacityExhausted { .. })),
                        "expected exhaustion, got {:?}",
                        res
                    );
                } else {
                    prop_assert_eq!(res, Ok(model.insert(k, v)));
                    prop_assert_eq!(sut.get(&k), Some(&v));
                }
            }
            Op::Get(k) => {
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            Op::Remove(k) => {
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
                prop_assert_eq!(sut.get(&k), None);
            }
        }
        check(&*sut);
        prop_assert_eq!(sut.len(), model.len());
    }
    for (k, v) in &model {
        prop_assert_eq!(sut.get(k), Some(v));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn prop_linear_probing_matches_model(cap in 1usize..12, ops in arb_ops()) {
        let mut sut = LinearProbingStore::with_capacity_and_hasher(cap, BuildIdentityHasher).unwrap();
        run_against_model(&mut sut, Some(cap), ops, |s| {
            assert!(s.len() + s.tombstone_count() <= s.capacity());
        })?;
    }

    #[test]
    fn prop_robin_hood_matches_model(cap in 1usize..12, ops in arb_ops()) {
        let mut sut = RobinHoodStore::with_capacity_and_hasher(cap, BuildIdentityHasher).unwrap();
        run_against_model(&mut sut, Some(cap), ops, |s| s.assert_invariants())?;
    }

    #[test]
    fn prop_robin_hood_random_hasher(cap in 1usize..12, ops in arb_ops()) {
        let mut sut: RobinHoodStore<u64, i32> = RobinHoodStore::with_capacity(cap).unwrap();
        run_against_model(&mut sut, Some(cap), ops, |s| s.assert_invariants())?;
    }

    #[test]
    fn prop_linear_hash_matches_model(
        base in 1usize..6,
        alpha in prop_oneof![Just(0.5f64), Just(0.8), Just(1.0), Just(2.5)],
        ops in arb_ops(),
    ) {
        let config = LinearHashConfig::new(base, alpha);
        let mut sut = LinearHashStore::with_config_and_hasher(config, BuildIdentityHasher).unwrap();
        run_against_model(&mut sut, None, ops, |s| s.assert_invariants())?;
    }

    #[test]
    fn prop_recency_cache_matches_model_without_eviction(ops in arb_ops()) {
        // Capacity covers the whole key range, so nothing is ever evicted.
        let mut sut = RecencyCache::with_capacity(24).unwrap();
        run_against_model(&mut sut, None, ops, |s| s.assert_invariants())?;
    }
}

// Property: Robin Hood placement equals a direct transcription of the
// displacement rule in which every displaced entry restarts from its own
// home slot. Insert-only sequences below capacity.
proptest! {
    #[test]
    fn prop_robin_hood_matches_restart_reference(
        cap in 2usize..16,
        keys in proptest::collection::vec(0u64..64, 1..16),
    ) {
        let mut sut = RobinHoodStore::with_capacity_and_hasher(cap, BuildIdentityHasher).unwrap();
        let mut reference: Vec<Option<(u64, usize)>> = vec![None; cap];

        fn reference_put(table: &mut [Option<(u64, usize)>], key: u64) {
            let m = table.len();
            let mut index = (key % m as u64) as usize;
            let mut disposition = 0;
            while let Some((resident, distance)) = table[index] {
                if resident == key {
                    return;
                }
                if distance < disposition {
                    break;
                }
                disposition += 1;
                index = (index + 1) % m;
            }
            match table[index].replace((key, disposition)) {
                None => {}
                Some((displaced, _)) => reference_put(table, displaced),
            }
        }

        for k in keys {
            let present = reference.iter().flatten().any(|&(r, _)| r == k);
            let live = reference.iter().flatten().count();
            if !present && live == cap {
                continue;
            }
            reference_put(&mut reference, k);
            prop_assert!(sut.put(k, 0).is_ok());
            sut.assert_invariants();

            for (i, slot) in reference.iter().enumerate() {
                if let Some((rk, rd)) = *slot {
                    prop_assert_eq!(sut.position(&rk), Some(i));
                    prop_assert_eq!(sut.probe_distance(&rk), Some(rd));
                }
            }
            let max = reference.iter().flatten().map(|&(_, d)| d).max().unwrap_or(0);
            prop_assert_eq!(sut.max_probe_distance(), max);
        }
    }
}

// Property: after any sequence of puts, every key sits in the bucket an
// independent addressing rule picks from the final bucket count alone
// (`h mod 2^(L+1)*m0`, falling back to `h mod 2^L*m0` past the end), and the
// load factor never exceeds the configured bound.
proptest! {
    #[test]
    fn prop_linear_hash_routing_matches_rehash_model(
        base in 1usize..5,
        alpha in prop_oneof![Just(0.5f64), Just(0.75), Just(1.0), Just(3.0)],
        keys in proptest::collection::vec(any::<u32>(), 1..200),
    ) {
        let config = LinearHashConfig::new(base, alpha);
        let mut sut = LinearHashStore::with_config_and_hasher(config, BuildIdentityHasher).unwrap();
        for k in keys {
            sut.put(u64::from(k), ());
            prop_assert!(sut.load_factor() <= alpha);
        }

        let n = sut.bucket_count();
        let level = sut.level();
        let expected = |h: u64| -> usize {
            let wide = (base as u64) << (level + 1);
            let a = (h % wide) as usize;
            if a >= n {
                (h % ((base as u64) << level)) as usize
            } else {
                a
            }
        };
        for i in 0..n {
            for &k in sut.bucket_keys(i) {
                prop_assert_eq!(expected(k), i, "key {} misrouted", k);
            }
        }
        sut.assert_invariants();
    }
}

// Property: RecencyCache eviction and recency order match a VecDeque model
// (front = most recently used) under a tight capacity.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_recency_cache_lru_order(cap in 1usize..6, ops in arb_ops()) {
        let mut sut = RecencyCache::with_capacity(cap).unwrap();
        let mut model: VecDeque<(u64, i32)> = VecDeque::new();

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    let prev = model.iter().position(|&(mk, _)| mk == k).and_then(|i| model.remove(i));
                    if prev.is_none() && model.len() == cap {
                        model.pop_back();
                    }
                    model.push_front((k, v));
                    prop_assert_eq!(sut.put(k, v), prev.map(|(_, pv)| pv));
                }
                Op::Get(k) => {
                    let hit = model.iter().position(|&(mk, _)| mk == k).and_then(|i| model.remove(i));
                    if let Some(e) = hit {
                        model.push_front(e);
                    }
                    prop_assert_eq!(sut.get(&k).copied(), hit.map(|(_, v)| v));
                }
                Op::Remove(k) => {
                    let gone = model.iter().position(|&(mk, _)| mk == k).and_then(|i| model.remove(i));
                    prop_assert_eq!(sut.remove(&k), gone.map(|(_, v)| v));
                }
            }
            sut.assert_invariants();
            let order: Vec<(u64, i32)> = sut.iter().map(|(k, v)| (*k, *v)).collect();
            let expected: Vec<(u64, i32)> = model.iter().copied().collect();
            prop_assert_eq!(order, expected);
        }
    }
}
