//! Every strategy must give the linear scan's answers.

use bloomindex::prelude::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
enum Op {
    Add(Vec<u32>),
    Delete(usize),
    Count(Vec<u32>),
}

const BITS: u32 = 40;

fn shape() -> Shape {
    Shape::new(BITS, 3).unwrap()
}

fn filter(bits: &[u32]) -> Filter {
    Filter::from_indices(shape(), bits.iter().copied()).unwrap()
}

// A narrow bit range makes supersets and duplicates common.
fn bits_strategy(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..12, 0..max_len)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => bits_strategy(7).prop_map(Op::Add),
        2 => any::<usize>().prop_map(Op::Delete),
        3 => bits_strategy(3).prop_map(Op::Count),
    ]
}

fn all_indexes() -> Vec<Box<dyn FilterIndex>> {
    let mut indexes: Vec<Box<dyn FilterIndex>> =
        IndexKind::ALL.into_iter().map(|kind| kind.build(64, shape())).collect();
    indexes.push(Box::new(Bloofi::with_order(shape(), 1).unwrap()));
    indexes.push(Box::new(Bloofi::with_order(shape(), 5).unwrap()));
    indexes
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn prop_sequences_match_linear_scan(ops in prop::collection::vec(op_strategy(), 1..120)) {
        let mut reference = LinearIndex::new(shape());
        let mut indexes = all_indexes();
        let mut bloofi = Bloofi::new(shape());
        let mut added: Vec<Filter> = Vec::new();

        for op in &ops {
            match op {
                Op::Add(bits) => {
                    let f = filter(bits);
                    reference.add(f.clone());
                    bloofi.add(f.clone());
                    for index in &mut indexes {
                        index.add(f.clone());
                    }
                    added.push(f);
                }
                Op::Delete(pick) => {
                    if added.is_empty() {
                        continue;
                    }
                    let f = &added[pick % added.len()];
                    let expected = reference.delete(f);
                    prop_assert_eq!(bloofi.delete(f), expected);
                    for index in &mut indexes {
                        prop_assert_eq!(index.delete(f), expected, "{}", index.name());
                    }
                }
                Op::Count(bits) => {
                    let q = filter(bits);
                    let expected = reference.count(&q);
                    prop_assert_eq!(bloofi.count(&q), expected);
                    for index in &indexes {
                        prop_assert_eq!(index.count(&q), expected, "{}", index.name());
                    }
                }
            }
            prop_assert!(bloofi.validate().is_ok(), "{:?}", bloofi.validate());
            prop_assert_eq!(bloofi.size(), reference.size());
        }

        for index in &indexes {
            prop_assert_eq!(index.size(), reference.size(), "{}", index.name());
        }
    }

    #[test]
    fn prop_search_visits_same_multiset(
        population in prop::collection::vec(bits_strategy(8), 0..60),
        query in bits_strategy(3),
    ) {
        let q = filter(&query);
        let mut reference = LinearIndex::new(shape());
        let mut indexes = all_indexes();
        for bits in &population {
            reference.add(filter(bits));
            for index in &mut indexes {
                index.add(filter(bits));
            }
        }

        let mut expected = reference.matches(&q);
        expected.sort_by(|a, b| a.words().cmp(b.words()));
        for index in &indexes {
            let mut found = index.matches(&q);
            found.sort_by(|a, b| a.words().cmp(b.words()));
            prop_assert_eq!(&found, &expected, "{}", index.name());
        }
    }
}

#[test]
fn test_bulk_loaded_bloofi_matches_incremental() {
    let shape = Shape::new(256, 4).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    let filters: Vec<Filter> = (0..2_000)
        .map(|_| {
            let indices: Vec<u32> = (0..20).map(|_| rng.gen_range(0..256)).collect();
            Filter::from_indices(shape, indices).unwrap()
        })
        .collect();

    let bulk = Bloofi::bulk_load(shape, 3, filters.iter().cloned()).unwrap();
    let mut incremental = Bloofi::with_order(shape, 3).unwrap();
    let mut reference = LinearIndex::new(shape);
    for f in &filters {
        incremental.add(f.clone());
        reference.add(f.clone());
    }
    bulk.validate().unwrap();
    incremental.validate().unwrap();
    assert_eq!(bulk.size(), filters.len());

    for _ in 0..200 {
        let q = Filter::from_indices(shape, [rng.gen_range(0..256), rng.gen_range(0..256)]).unwrap();
        let expected = reference.count(&q);
        assert_eq!(bulk.count(&q), expected);
        assert_eq!(incremental.count(&q), expected);
    }
}

#[test]
fn test_random_churn_keeps_bloofi_consistent() {
    let shape = Shape::new(128, 3).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let mut bloofi = Bloofi::with_order(shape, 2).unwrap();
    let mut natural = NaturalBloofi::new(shape, 1_000);
    let mut reference = LinearIndex::new(shape);
    let mut live: Vec<Filter> = Vec::new();

    for step in 0..5_000 {
        if live.is_empty() || rng.gen_bool(0.6) {
            let indices: Vec<u32> = (0..6).map(|_| rng.gen_range(0..128)).collect();
            let f = Filter::from_indices(shape, indices).unwrap();
            bloofi.add(f.clone());
            natural.add(f.clone());
            reference.add(f.clone());
            live.push(f);
        } else {
            let f = live.swap_remove(rng.gen_range(0..live.len()));
            assert!(bloofi.delete(&f));
            assert!(natural.delete(&f));
            assert!(reference.delete(&f));
        }

        if step % 250 == 0 {
            bloofi.validate().unwrap();
            let q = Filter::from_indices(shape, [rng.gen_range(0..128)]).unwrap();
            assert_eq!(bloofi.count(&q), reference.count(&q));
            assert_eq!(natural.count(&q), reference.count(&q));
        }
    }

    for f in live.drain(..) {
        assert!(bloofi.delete(&f));
    }
    bloofi.validate().unwrap();
    assert!(bloofi.is_empty());
    assert_eq!(bloofi.height(), 1);
}

#[cfg(feature = "rayon")]
#[test]
fn test_parallel_counts_match_sequential() {
    use bloomindex::core::par_count_batch;

    let shape = Shape::new(64, 3).unwrap();
    let mut rng = StdRng::seed_from_u64(17);
    let mut index = Bloofi::new(shape);
    for _ in 0..500 {
        let indices: Vec<u32> = (0..5).map(|_| rng.gen_range(0..64)).collect();
        index.add(Filter::from_indices(shape, indices).unwrap());
    }
    let queries: Vec<Filter> = (0..100)
        .map(|_| Filter::from_indices(shape, [rng.gen_range(0..64)]).unwrap())
        .collect();

    assert_eq!(par_count_batch(&index, &queries), index.count_batch(&queries));
}
