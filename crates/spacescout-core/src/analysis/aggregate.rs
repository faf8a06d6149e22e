use crate::model::{Item, ItemKind, StorageSummary};
use crate::source::DeviceCapacity;

/// Roll per-item sizes into segment totals. Pure fold over the item set.
///
/// When the platform reports capacity, used/free come from it; otherwise
/// used is the sum of item sizes and free is unknown (0). All totals stay
/// exact integers — percentage rounding happens only at the presentation
/// boundary via [`segment_percent`].
pub fn summarize<'a>(
    items: impl IntoIterator<Item = &'a Item>,
    capacity: Option<DeviceCapacity>,
) -> StorageSummary {
    let mut summary = StorageSummary::default();

    for item in items {
        let slot = match item.kind {
            ItemKind::App => &mut summary.app_bytes,
            ItemKind::Photo => &mut summary.photo_bytes,
            ItemKind::MediaFile => &mut summary.media_bytes,
            ItemKind::Other => &mut summary.other_bytes,
        };
        *slot += item.size_bytes;
    }

    let item_total = summary.app_bytes + summary.photo_bytes + summary.media_bytes + summary.other_bytes;

    match capacity {
        Some(cap) => {
            summary.total_bytes = cap.total_bytes;
            summary.free_bytes = cap.free_bytes;
            summary.used_bytes = cap.total_bytes.saturating_sub(cap.free_bytes);
        }
        None => {
            summary.total_bytes = item_total;
            summary.free_bytes = 0;
            summary.used_bytes = item_total;
        }
    }

    summary
}

/// Segment share of used space, rounded to the nearest whole percent.
/// Capped at 100: a platform can report less used space than the items
/// actually sum to.
pub fn segment_percent(summary: &StorageSummary, kind: ItemKind) -> u8 {
    if summary.used_bytes == 0 {
        return 0;
    }
    let bytes = summary.segment_bytes(kind) as u128;
    let used = summary.used_bytes as u128;
    ((bytes * 100 + used / 2) / used).min(100) as u8
}
