mod common;

use common::item;
use spacescout_core::index::SimilarityIndex;
use spacescout_core::model::{Fingerprint, ItemKind};
use spacescout_core::Error;

fn pixels(bits: u64) -> Fingerprint {
    Fingerprint::Pixels {
        bits,
        width: 100,
        height: 100,
    }
}

#[test]
fn identical_content_hashes_share_a_cluster() {
    let mut index = SimilarityIndex::new(10);
    let a = item("a", ItemKind::Other, 100, None);
    let b = item("b", ItemKind::Other, 100, None);

    let ca = index.insert(&a, Fingerprint::Content(42)).unwrap();
    let cb = index.insert(&b, Fingerprint::Content(42)).unwrap();

    assert_eq!(ca, cb);
    let cluster = index.cluster(ca).unwrap();
    assert_eq!(cluster.members.len(), 2);
    assert_eq!(cluster.total_bytes, 200);
}

#[test]
fn different_content_hashes_stay_apart() {
    let mut index = SimilarityIndex::new(10);
    let a = item("a", ItemKind::Other, 100, None);
    let b = item("b", ItemKind::Other, 100, None);

    let ca = index.insert(&a, Fingerprint::Content(1)).unwrap();
    let cb = index.insert(&b, Fingerprint::Content(2)).unwrap();

    assert_ne!(ca, cb);
    assert_eq!(index.len(), 2);
}

#[test]
fn near_phash_joins_within_threshold() {
    let mut index = SimilarityIndex::new(10);
    let a = item("a", ItemKind::Photo, 100, None);
    let b = item("b", ItemKind::Photo, 100, None);
    let c = item("c", ItemKind::Photo, 100, None);

    let ca = index.insert(&a, pixels(0)).unwrap();
    // 3 bits differ: joins
    let cb = index.insert(&b, pixels(0b111)).unwrap();
    // 64 bits differ: new cluster
    let cc = index.insert(&c, pixels(u64::MAX)).unwrap();

    assert_eq!(ca, cb);
    assert_ne!(ca, cc);
}

#[test]
fn threshold_is_configuration() {
    let mut strict = SimilarityIndex::new(0);
    let a = item("a", ItemKind::Photo, 100, None);
    let b = item("b", ItemKind::Photo, 100, None);

    let ca = strict.insert(&a, pixels(0)).unwrap();
    let cb = strict.insert(&b, pixels(1)).unwrap();
    assert_ne!(ca, cb, "distance 1 must not join at threshold 0");
}

#[test]
fn query_orders_by_distance() {
    let mut index = SimilarityIndex::new(0);
    let a = item("a", ItemKind::Photo, 100, None);
    let b = item("b", ItemKind::Photo, 100, None);
    index.insert(&a, pixels(0)).unwrap();
    index.insert(&b, pixels(u64::MAX)).unwrap();

    let hits = index.query(&pixels(0b1));
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].1, 1);
    assert_eq!(hits[1].1, 63);
    assert!(hits[0].1 <= hits[1].1);
}

#[test]
fn query_exact_family_hits_bucket() {
    let mut index = SimilarityIndex::new(10);
    let a = item("a", ItemKind::App, 100, None);
    let ca = index
        .insert(&a, Fingerprint::Package("com.example.app".into()))
        .unwrap();

    let hits = index.query(&Fingerprint::Package("com.example.app".into()));
    assert_eq!(hits, vec![(ca, 0)]);
    assert!(index
        .query(&Fingerprint::Package("com.other.app".into()))
        .is_empty());
}

#[test]
fn members_stay_within_threshold_of_representative() {
    let mut index = SimilarityIndex::new(10);
    for (i, bits) in [0u64, 0b11, 0b101, u64::MAX, u64::MAX ^ 0b1].iter().enumerate() {
        let it = item(&format!("p{}", i), ItemKind::Photo, 10, None);
        index.insert(&it, pixels(*bits)).unwrap();
    }

    for cluster in index.clusters() {
        for member in &cluster.members {
            // Re-query the member's cluster: distance of the cluster it
            // landed in must be within threshold.
            assert_eq!(index.cluster_of(&member.item_id), Some(cluster.id));
        }
    }
    assert_eq!(index.len(), 2);
}

#[test]
fn remove_shrinks_and_then_deletes_cluster() {
    let mut index = SimilarityIndex::new(10);
    let a = item("a", ItemKind::Other, 100, None);
    let b = item("b", ItemKind::Other, 60, None);
    let id = index.insert(&a, Fingerprint::Content(7)).unwrap();
    index.insert(&b, Fingerprint::Content(7)).unwrap();

    assert_eq!(index.remove("a").unwrap(), Some(id));
    let cluster = index.cluster(id).unwrap();
    assert_eq!(cluster.members.len(), 1);
    assert_eq!(cluster.total_bytes, 60);

    // Removing the last member deletes the cluster and its bucket.
    assert_eq!(index.remove("b").unwrap(), Some(id));
    assert!(index.cluster(id).is_none());
    assert!(index.is_empty());

    // A new item with the same hash starts a fresh cluster.
    let c = item("c", ItemKind::Other, 10, None);
    let fresh = index.insert(&c, Fingerprint::Content(7)).unwrap();
    assert_ne!(fresh, id);
}

#[test]
fn remove_unknown_item_is_a_noop() {
    let mut index = SimilarityIndex::new(10);
    assert_eq!(index.remove("ghost").unwrap(), None);
}

#[test]
fn double_insert_poisons_the_index() {
    let mut index = SimilarityIndex::new(10);
    let a = item("a", ItemKind::Other, 100, None);
    index.insert(&a, Fingerprint::Content(1)).unwrap();

    let err = index.insert(&a, Fingerprint::Content(2)).unwrap_err();
    assert!(matches!(err, Error::IndexCorrupted(_)));
    assert!(index.poisoned().is_some());

    // All further writes are rejected until rebuilt.
    let b = item("b", ItemKind::Other, 100, None);
    assert!(matches!(
        index.insert(&b, Fingerprint::Content(3)),
        Err(Error::IndexCorrupted(_))
    ));
    assert!(matches!(index.remove("a"), Err(Error::IndexCorrupted(_))));
}

#[test]
fn higher_resolution_member_becomes_representative() {
    let mut index = SimilarityIndex::new(10);
    let a = item("small", ItemKind::Photo, 100, None);
    let b = item("large", ItemKind::Photo, 100, None);

    let id = index
        .insert(
            &a,
            Fingerprint::Pixels {
                bits: 0,
                width: 10,
                height: 10,
            },
        )
        .unwrap();
    index
        .insert(
            &b,
            Fingerprint::Pixels {
                bits: 0b1,
                width: 4000,
                height: 3000,
            },
        )
        .unwrap();

    let cluster = index.cluster(id).unwrap();
    assert_eq!(cluster.sample_ref.0, "ref://large");
    assert_eq!(cluster.representative.pixel_area(), 12_000_000);
}

#[test]
fn duplicate_clusters_filters_singletons() {
    let mut index = SimilarityIndex::new(10);
    let a = item("a", ItemKind::Other, 100, None);
    let b = item("b", ItemKind::Other, 100, None);
    let c = item("c", ItemKind::Other, 5, None);
    index.insert(&a, Fingerprint::Content(1)).unwrap();
    index.insert(&b, Fingerprint::Content(1)).unwrap();
    index.insert(&c, Fingerprint::Content(2)).unwrap();

    let groups = index.duplicate_clusters(ItemKind::Other);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].members.len(), 2);
}
