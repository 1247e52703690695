use std::cmp::Ordering;
use std::ops::Range;
use crate::core::types::{Position, Record};
use crate::query::types::{PageSpec, SortDirection, SortKey, SortSpec};
use crate::store::record_store::RecordStore;

/// Key-only comparison in the requested direction.
pub fn compare_records(a: &Record, b: &Record, sort: SortSpec) -> Ordering {
    let ordering = match sort.key {
        SortKey::Date => a.date.cmp(&b.date),
        SortKey::Quantity => a.quantity.cmp(&b.quantity),
        SortKey::CustomerName => a.keys.name.cmp(&b.keys.name),
        SortKey::FinalAmount => a.final_amount.total_cmp(&b.final_amount),
    };

    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Total order over positions: requested key first, collection position to
/// break ties. Any sort using it equals a stable sort by key alone.
pub fn compare_positions(store: &RecordStore, a: Position, b: Position, sort: SortSpec) -> Ordering {
    compare_records(store.at(a), store.at(b), sort).then(a.cmp(&b))
}

/// Stable sort of a record slice by key; ties keep their current order.
pub fn sort_records(records: &mut [Record], sort: SortSpec) {
    records.sort_by(|a, b| compare_records(a, b, sort));
}

/// Full sort of positions that arrive in collection order.
pub fn sort_positions(store: &RecordStore, positions: &mut [Position], sort: SortSpec) {
    if sort.is_natural() {
        // collection order already is date-desc with ties by position
        return;
    }
    positions.sort_unstable_by(|a, b| compare_positions(store, *a, *b, sort));
}

/// Order only what a page ending at `end` needs.
///
/// After the call `positions[..end]` holds exactly what a full sort would put
/// there, in the same order. Nothing beyond `end` is meaningful.
pub fn sort_prefix(store: &RecordStore, positions: &mut [Position], sort: SortSpec, end: usize) {
    if sort.is_natural() || positions.is_empty() {
        return;
    }

    let end = end.min(positions.len());
    if end == 0 {
        return;
    }
    if end < positions.len() {
        positions.select_nth_unstable_by(end - 1, |a, b| compare_positions(store, *a, *b, sort));
    }
    positions[..end].sort_unstable_by(|a, b| compare_positions(store, *a, *b, sort));
}

/// Index range of a page within `total` items; empty past the end.
pub fn page_bounds(total: usize, page: &PageSpec) -> Range<usize> {
    let start = page.offset().min(total);
    let end = page.end().min(total);
    start..end
}

pub fn paginate<'a, T>(items: &'a [T], page: &PageSpec) -> &'a [T] {
    &items[page_bounds(items.len(), page)]
}

pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}
