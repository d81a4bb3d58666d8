//! Property tests for the store ordering and removal rules and for the codec
//! round trip.

use std::collections::BTreeSet;

use proptest::prelude::*;

use bandheap::core::codec;
use bandheap::core::store::BandStore;
use bandheap::core::types::{Album, Band, BandId, Coordinates, Genre};

fn arb_genre() -> impl Strategy<Value = Option<Genre>> {
    prop_oneof![
        Just(None),
        Just(Some(Genre::PsychedelicRock)),
        Just(Some(Genre::MathRock)),
        Just(Some(Genre::PostRock)),
    ]
}

fn arb_band(id: BandId) -> impl Strategy<Value = Band> {
    (
        "[A-Za-z][A-Za-z0-9 \\\\\n]{0,12}",
        -1000i64..=554,
        -1000i32..=782,
        1i32..50,
        proptest::option::of("[a-z\\\\\r\n ]{1,16}"),
        arb_genre(),
        "[A-Za-z][A-Za-z ]{0,10}",
        1u32..1_000_000,
    )
        .prop_map(move |(name, x, y, participants, description, genre, album, sales)| {
            let mut band = Band::new(id, name, Coordinates::new(x, y).unwrap())
                .with_participants(participants)
                .with_best_album(Album::new(album, f64::from(sales) / 4.0).unwrap());
            band.description = description;
            band.genre = genre;
            band
        })
}

fn arb_bands() -> impl Strategy<Value = Vec<Band>> {
    proptest::collection::btree_set(1i64..10_000, 0..12).prop_flat_map(|ids| {
        ids.into_iter()
            .map(arb_band)
            .collect::<Vec<_>>()
    })
}

proptest! {
    #[test]
    fn peek_min_is_smallest(ids in proptest::collection::vec(1i64..1_000_000, 1..40)) {
        let mut store = BandStore::new();
        for &id in &ids {
            store.insert(Band::new(id, "b", Coordinates::new(0, 0).unwrap()));
            let expected = store.iter().map(|b| b.id).min();
            prop_assert_eq!(store.peek_min().map(|b| b.id), expected);
        }
    }

    #[test]
    fn remove_greater_removes_exactly_larger(
        ids in proptest::collection::btree_set(1i64..500, 0..40),
        threshold in 0i64..500,
    ) {
        let mut store = BandStore::new();
        for &id in &ids {
            store.insert(Band::new(id, "b", Coordinates::new(0, 0).unwrap()));
        }
        let expected_removed = ids.iter().filter(|&&id| id > threshold).count();
        prop_assert_eq!(store.remove_greater_than(threshold), expected_removed);

        let left: BTreeSet<BandId> = store.iter().map(|b| b.id).collect();
        let expected: BTreeSet<BandId> = ids.iter().copied().filter(|&id| id <= threshold).collect();
        prop_assert_eq!(left, expected);
    }

    #[test]
    fn remove_by_id_then_find_is_empty(
        ids in proptest::collection::vec(1i64..50, 0..20),
        target in 1i64..50,
    ) {
        let mut store = BandStore::new();
        for &id in &ids {
            store.insert(Band::new(id, "b", Coordinates::new(0, 0).unwrap()));
        }
        store.remove_by_id(target);
        prop_assert!(store.find_by_id(target).is_none());
    }

    #[test]
    fn save_then_load_round_trips(bands in arb_bands()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("round.txt");
        let report = codec::save(bands.iter(), &path).unwrap();
        prop_assert_eq!(report.saved, bands.len());

        let loaded = codec::load(&path).unwrap();
        prop_assert!(loaded.warnings.is_empty(), "warnings: {:?}", loaded.warnings);
        prop_assert_eq!(loaded.bands, bands);
    }
}
