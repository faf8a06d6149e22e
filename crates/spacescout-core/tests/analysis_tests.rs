mod common;

use std::collections::BTreeMap;

use common::{item, protected};
use spacescout_core::analysis::classify::{assign_policy_tags, PolicyWindows};
use spacescout_core::index::SimilarityIndex;
use spacescout_core::model::{CatalogEntry, Fingerprint, Item, ItemKind, PolicyTag};

const DAY: i64 = 86_400;
const NOW: i64 = 1_700_000_000;

fn windows() -> PolicyWindows {
    PolicyWindows {
        recent_secs: 30 * DAY,
        stale_secs: 180 * DAY,
    }
}

fn catalog(
    items: Vec<(Item, Fingerprint)>,
) -> (BTreeMap<String, CatalogEntry>, SimilarityIndex) {
    let mut index = SimilarityIndex::new(10);
    let mut entries = BTreeMap::new();
    for (it, fp) in items {
        let cluster_id = index.insert(&it, fp.clone()).unwrap();
        entries.insert(
            it.id.clone(),
            CatalogEntry {
                item: it,
                fingerprint: fp,
                cluster_id,
            },
        );
    }
    (entries, index)
}

fn pixels(bits: u64, width: u32, height: u32) -> Fingerprint {
    Fingerprint::Pixels {
        bits,
        width,
        height,
    }
}

#[test]
fn system_protected_is_always_keep() {
    // Protected even though it sits in a duplicate group.
    let (entries, index) = catalog(vec![
        (
            protected(item("sys", ItemKind::App, 100, Some(NOW - 400 * DAY))),
            Fingerprint::Package("com.os.core".into()),
        ),
        (
            item("copy", ItemKind::App, 100, Some(NOW - 400 * DAY)),
            Fingerprint::Package("com.os.core".into()),
        ),
    ]);

    let tags = assign_policy_tags(&entries, &index, &windows(), NOW);
    assert_eq!(tags["sys"], PolicyTag::Keep);
}

#[test]
fn recent_singleton_is_keep() {
    let (entries, index) = catalog(vec![(
        item("fresh", ItemKind::Other, 100, Some(NOW - 2 * DAY)),
        Fingerprint::Content(1),
    )]);

    let tags = assign_policy_tags(&entries, &index, &windows(), NOW);
    assert_eq!(tags["fresh"], PolicyTag::Keep);
}

#[test]
fn stale_singleton_is_review() {
    let (entries, index) = catalog(vec![(
        item("old", ItemKind::Other, 100, Some(NOW - 365 * DAY)),
        Fingerprint::Content(1),
    )]);

    let tags = assign_policy_tags(&entries, &index, &windows(), NOW);
    assert_eq!(tags["old"], PolicyTag::Review);
}

#[test]
fn middle_aged_singleton_is_keep() {
    // Neither recent nor stale: falls through to Keep.
    let (entries, index) = catalog(vec![(
        item("mid", ItemKind::Other, 100, Some(NOW - 90 * DAY)),
        Fingerprint::Content(1),
    )]);

    let tags = assign_policy_tags(&entries, &index, &windows(), NOW);
    assert_eq!(tags["mid"], PolicyTag::Keep);
}

#[test]
fn never_accessed_singleton_is_review() {
    let (entries, index) = catalog(vec![(
        item("unknown", ItemKind::Other, 100, None),
        Fingerprint::Content(1),
    )]);

    let tags = assign_policy_tags(&entries, &index, &windows(), NOW);
    assert_eq!(tags["unknown"], PolicyTag::Review);
}

#[test]
fn duplicate_group_keeps_most_recent_for_review() {
    let (entries, index) = catalog(vec![
        (
            item("a", ItemKind::Other, 100, Some(NOW - 10 * DAY)),
            Fingerprint::Content(9),
        ),
        (
            item("b", ItemKind::Other, 100, Some(NOW - 1 * DAY)),
            Fingerprint::Content(9),
        ),
        (
            item("c", ItemKind::Other, 100, Some(NOW - 50 * DAY)),
            Fingerprint::Content(9),
        ),
    ]);

    let tags = assign_policy_tags(&entries, &index, &windows(), NOW);
    assert_eq!(tags["b"], PolicyTag::Review);
    assert_eq!(tags["a"], PolicyTag::SafeToDelete);
    assert_eq!(tags["c"], PolicyTag::SafeToDelete);
}

#[test]
fn photo_group_keeps_highest_resolution() {
    let (entries, index) = catalog(vec![
        (
            item("low", ItemKind::Photo, 100, Some(NOW - 1 * DAY)),
            pixels(0, 640, 480),
        ),
        (
            item("high", ItemKind::Photo, 100, Some(NOW - 300 * DAY)),
            pixels(0b1, 4000, 3000),
        ),
    ]);

    let tags = assign_policy_tags(&entries, &index, &windows(), NOW);
    // Resolution trumps recency for photos.
    assert_eq!(tags["high"], PolicyTag::Review);
    assert_eq!(tags["low"], PolicyTag::SafeToDelete);
}

#[test]
fn equal_candidates_break_tie_on_lowest_id() {
    let (entries, index) = catalog(vec![
        (
            item("b", ItemKind::Other, 100, Some(NOW - 10 * DAY)),
            Fingerprint::Content(9),
        ),
        (
            item("a", ItemKind::Other, 100, Some(NOW - 10 * DAY)),
            Fingerprint::Content(9),
        ),
    ]);

    let tags = assign_policy_tags(&entries, &index, &windows(), NOW);
    assert_eq!(tags["a"], PolicyTag::Review);
    assert_eq!(tags["b"], PolicyTag::SafeToDelete);
}

#[test]
fn classification_is_idempotent() {
    let (entries, index) = catalog(vec![
        (
            item("a", ItemKind::Photo, 10, Some(NOW - 1 * DAY)),
            pixels(0, 100, 100),
        ),
        (
            item("b", ItemKind::Photo, 10, Some(NOW - 2 * DAY)),
            pixels(0b11, 100, 100),
        ),
        (
            item("c", ItemKind::Other, 10, Some(NOW - 400 * DAY)),
            Fingerprint::Content(5),
        ),
        (item("d", ItemKind::Other, 10, None), Fingerprint::Content(6)),
    ]);

    let first = assign_policy_tags(&entries, &index, &windows(), NOW);
    let second = assign_policy_tags(&entries, &index, &windows(), NOW);
    assert_eq!(first, second);
}

#[test]
fn three_identical_photos_and_one_distinct() {
    // Candidate group of 4: three visually identical, one far away.
    let (entries, index) = catalog(vec![
        (
            item("p1", ItemKind::Photo, 10, Some(NOW - 3 * DAY)),
            pixels(0, 1000, 1000),
        ),
        (
            item("p2", ItemKind::Photo, 10, Some(NOW - 2 * DAY)),
            pixels(0, 1000, 1000),
        ),
        (
            item("p3", ItemKind::Photo, 10, Some(NOW - 1 * DAY)),
            pixels(0, 1000, 1000),
        ),
        (
            item("solo", ItemKind::Photo, 10, Some(NOW - 1 * DAY)),
            pixels(u64::MAX, 1000, 1000),
        ),
    ]);

    // Exactly one cluster of 3 and one singleton.
    let groups = index.duplicate_clusters(ItemKind::Photo);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].members.len(), 3);
    assert_eq!(index.len(), 2);

    let tags = assign_policy_tags(&entries, &index, &windows(), NOW);
    let safe = tags.values().filter(|t| **t == PolicyTag::SafeToDelete).count();
    let review = tags.values().filter(|t| **t == PolicyTag::Review).count();
    assert_eq!(safe, 2);
    assert_eq!(review, 1);
    assert_eq!(tags["solo"], PolicyTag::Keep);
}
