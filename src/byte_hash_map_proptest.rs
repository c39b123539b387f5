#![cfg(test)]

// Property tests for ByteHashMap kept inside the crate so they can reach
// the internal table and index helpers.

use crate::byte_hash_map::{ByteHashMap, Table};
use crate::entry_store::Entry;
use crate::index_store::Slot;
use crate::probe::Probe;
use crate::secret::Secret;
use hashbrown::HashMap;
use proptest::prelude::*;

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Set(usize, Vec<u8>),
    Get(usize),
    Absent(Vec<u8>),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<OpI>)> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..12), 1..=40).prop_flat_map(
        |pool| {
            let idxs: Vec<usize> = (0..pool.len()).collect();
            let idx = proptest::sample::select(idxs);
            let value = proptest::collection::vec(any::<u8>(), 0..16);
            let op = prop_oneof![
                4 => (idx.clone(), value).prop_map(|(i, v)| OpI::Set(i, v)),
                2 => idx.clone().prop_map(OpI::Get),
                1 => proptest::collection::vec(any::<u8>(), 0..12).prop_map(OpI::Absent),
                1 => Just(OpI::Iterate),
            ];
            proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
        },
    )
}

// Property: State-machine equivalence against hashbrown::HashMap.
// Invariants exercised across random operation sequences:
// - `set` inserts or overwrites; `get` returns exactly the model's bytes.
// - `contains_key` and `get` agree with the model for pool and random keys.
// - `usable + len` equals the usable fraction of the current capacity.
// - `iter` yields each live entry exactly once with its current value.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(k0 in any::<u64>(), k1 in any::<u64>(), (pool, ops) in arb_scenario()) {
        let mut sut = ByteHashMap::with_secret(3, Secret::new(k0, k1)).unwrap();
        let mut model: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();

        for op in ops {
            match op {
                OpI::Set(i, v) => {
                    let k = &pool[i];
                    sut.set(k, &v).unwrap();
                    model.insert(k.clone(), v);
                }
                OpI::Get(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.get(k), model.get(k).map(|v| v.as_slice()));
                    prop_assert_eq!(sut.contains_key(k), model.contains_key(k));
                }
                OpI::Absent(k) => {
                    prop_assert_eq!(sut.get(&k), model.get(&k).map(|v| v.as_slice()));
                }
                OpI::Iterate => {
                    let mut seen: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
                    for (k, v) in sut.iter() {
                        let prev = seen.insert(k.to_vec(), v.to_vec());
                        prop_assert!(prev.is_none(), "key yielded twice");
                    }
                    prop_assert_eq!(&seen, &model);
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            prop_assert_eq!(sut.usable() + sut.len(), (2 * sut.capacity()) / 3);
        }

        for (k, v) in &model {
            prop_assert_eq!(sut.get(k), Some(v.as_slice()));
        }
    }
}

// Property: Table::find_empty_slot returns the first non-live position of
// the hash's perturbation sequence, Table::push records the entry there, and
// filling every usable slot of any table size never runs out of free slots.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_find_empty_slot_takes_first_free_position(
        e in 3u32..10,
        hashes in proptest::collection::vec(any::<u64>(), 1..200),
    ) {
        let mut table = Table::new(e).unwrap();
        let slots = table.mask() + 1;
        let usable = (2 * slots) / 3;

        for (ix, &hash) in hashes.iter().take(usable).enumerate() {
            let key = ix.to_le_bytes();

            let mut seq = Probe::new(hash, table.mask());
            let mut steps = 0usize;
            while let Slot::Live(_) = table.slot(seq.pos()) {
                seq.advance();
                steps += 1;
                prop_assert!(steps <= 64 + slots, "no free slot for hash {:#x}", hash);
            }
            let expected = seq.pos();

            prop_assert_eq!(table.find_empty_slot(hash), expected);
            prop_assert_eq!(table.lookup(hash, &key), None);
            table.push(Entry::new(hash, &key, b"").unwrap());
            prop_assert_eq!(table.slot(expected), Slot::Live(ix));
            prop_assert_eq!(table.lookup(hash, &key), Some(ix));
        }

        let live = (0..slots).filter(|&p| matches!(table.slot(p), Slot::Live(_))).count();
        prop_assert_eq!(live, hashes.len().min(usable));
    }
}
