//! Behaviour every index strategy must share.

use bloomindex::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn word(shape: Shape, bits: u64) -> Filter {
    Filter::from_words(shape, vec![bits]).unwrap()
}

fn random_filter(rng: &mut StdRng, shape: Shape, set_bits: usize) -> Filter {
    let indices: Vec<u32> = (0..set_bits).map(|_| rng.gen_range(0..shape.bits())).collect();
    Filter::from_indices(shape, indices).unwrap()
}

#[test]
fn test_superset_scenario() {
    let shape = Shape::new(20, 3).unwrap();
    let a = word(shape, 0b0000_0000_0000_0001_0011);
    let b = word(shape, 0b0000_0000_0000_0001_0111);
    let c = word(shape, 0b0000_0000_0000_0010_0000);
    assert_eq!(a.cardinality(), 3);
    assert_eq!(b.cardinality(), 4);
    assert_eq!(c.cardinality(), 1);

    for kind in IndexKind::ALL {
        let mut index = kind.build(3, shape);
        index.add(a.clone());
        index.add(b.clone());
        index.add(c.clone());

        assert_eq!(index.count(&a), 2, "{}: count(A)", kind);
        assert_eq!(index.count(&b), 1, "{}: count(B)", kind);
        assert_eq!(index.count(&c), 1, "{}: count(C)", kind);

        assert!(index.delete(&b), "{}: delete(B)", kind);
        assert_eq!(index.count(&a), 1, "{}: count(A) after delete", kind);
        assert_eq!(index.size(), 2, "{}", kind);
    }
}

#[test]
fn test_added_filter_is_found() {
    let shape = Shape::new(128, 4).unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    for kind in IndexKind::ALL {
        let mut index = kind.build(200, shape);
        for _ in 0..200 {
            let f = random_filter(&mut rng, shape, 12);
            index.add(f.clone());
            assert!(index.count(&f) >= 1, "{} lost a fresh filter", kind);
        }
    }
}

#[test]
fn test_duplicate_handling() {
    let shape = Shape::new(64, 3).unwrap();
    let f = Filter::from_indices(shape, [4, 17, 33, 60]).unwrap();
    let other = Filter::from_indices(shape, [4, 17, 50]).unwrap();

    for kind in IndexKind::ALL {
        let mut index = kind.build(10, shape);
        index.add(other.clone());
        index.add(f.clone());
        index.add(f.clone());
        assert_eq!(index.size(), 3, "{}", kind);
        assert_eq!(index.count(&f), 2, "{}", kind);

        let mut visits = 0;
        index.search(&f, &mut |found| {
            assert_eq!(found, &f);
            visits += 1;
        });
        assert_eq!(visits, 2, "{}: search visits each copy", kind);

        assert!(index.delete(&f));
        assert_eq!(index.count(&f), 1, "{}", kind);
        assert!(index.delete(&f));
        assert_eq!(index.count(&f), 0, "{}", kind);
        assert!(!index.delete(&f), "{}: third delete must miss", kind);
        assert_eq!(index.size(), 1, "{}", kind);
    }
}

#[test]
fn test_delete_is_inverse_of_add() {
    let shape = Shape::new(96, 3).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let population: Vec<Filter> = (0..300).map(|_| random_filter(&mut rng, shape, 9)).collect();
    let probes: Vec<Filter> = (0..40).map(|_| random_filter(&mut rng, shape, 2)).collect();

    for kind in IndexKind::ALL {
        let mut index = kind.build(population.len(), shape);
        for f in &population {
            index.add(f.clone());
        }
        let size_before = index.size();
        let counts_before = index.count_batch(&probes);

        for _ in 0..50 {
            let f = random_filter(&mut rng, shape, 6);
            index.add(f.clone());
            assert!(index.delete(&f), "{}", kind);
            assert_eq!(index.size(), size_before, "{}", kind);
        }
        assert_eq!(index.count_batch(&probes), counts_before, "{}", kind);
    }
}

#[test]
fn test_insert_then_delete_everything() {
    let shape = Shape::new(256, 4).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    let filters: Vec<Filter> = (0..10_000).map(|_| random_filter(&mut rng, shape, 16)).collect();
    let probes: Vec<Filter> = std::iter::once(Filter::new(shape))
        .chain(filters.iter().step_by(997).cloned())
        .chain((0..10).map(|_| random_filter(&mut rng, shape, 1)))
        .collect();

    for kind in IndexKind::ALL {
        let mut index = kind.build(filters.len(), shape);
        for f in &filters {
            index.add(f.clone());
        }
        assert_eq!(index.size(), filters.len(), "{}", kind);
        assert_eq!(index.count(&Filter::new(shape)), filters.len(), "{}", kind);

        for f in &filters {
            assert!(index.delete(f), "{}: delete of stored filter", kind);
        }
        assert_eq!(index.size(), 0, "{}", kind);
        assert!(index.is_empty());
        for probe in &probes {
            assert_eq!(index.count(probe), 0, "{}", kind);
        }
    }
}

#[test]
fn test_empty_index_answers_zero() {
    let shape = Shape::new(32, 2).unwrap();
    let q = Filter::from_indices(shape, [1]).unwrap();

    for kind in IndexKind::ALL {
        let mut index = kind.build(0, shape);
        assert_eq!(index.count(&q), 0);
        assert!(index.matches(&q).is_empty());
        assert!(!index.delete(&q));
        assert_eq!(index.size(), 0);
    }
}

#[test]
fn test_shape_mismatch_panics_for_every_strategy() {
    let shape = Shape::new(64, 3).unwrap();
    let wrong = Filter::new(Shape::new(64, 4).unwrap());

    for kind in IndexKind::ALL {
        let mut index = kind.build(10, shape);
        let added = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            index.add(wrong.clone());
        }));
        assert!(added.is_err(), "{} accepted a foreign shape", kind);

        let index = kind.build(10, shape);
        let counted = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| index.count(&wrong)));
        assert!(counted.is_err(), "{} queried a foreign shape", kind);
    }
}

#[test]
fn test_builder_configured_indexes_follow_contract() {
    let shape = Shape::new(64, 3).unwrap();
    let configured = [
        IndexBuilder::new().kind(IndexKind::Bloofi).shape(shape).bloofi_order(1).build(),
        IndexBuilder::new().kind(IndexKind::Bloofi).shape(shape).bloofi_order(6).build(),
        IndexBuilder::new()
            .kind(IndexKind::NaturalBloofi)
            .shape(shape)
            .shard_capacity(64)
            .bloofi_order(3)
            .build(),
        IndexBuilder::new()
            .kind(IndexKind::ShardedList)
            .shape(shape)
            .shard_capacity(64)
            .build(),
        IndexBuilder::new()
            .kind(IndexKind::Hamming)
            .shape(shape)
            .hamming_keys(KeyPolicy::Exact)
            .build(),
    ];

    let mut rng = StdRng::seed_from_u64(5);
    let filters: Vec<Filter> = (0..500).map(|_| random_filter(&mut rng, shape, 7)).collect();
    let mut reference = LinearIndex::new(shape);
    for f in &filters {
        reference.add(f.clone());
    }

    for index in configured {
        let mut index = index.unwrap();
        for f in &filters {
            index.add(f.clone());
        }
        for q in filters.iter().take(50) {
            let probe = Filter::from_indices(shape, q.iter_ones().take(2).map(|b| b as u32)).unwrap();
            assert_eq!(index.count(&probe), reference.count(&probe), "{}", index.name());
        }
    }
}
