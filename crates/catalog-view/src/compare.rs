//! Record ordering for the active sort column.

use std::cmp::Ordering;
use std::sync::Arc;

use catalog_model::{Record, SortColumn, SortDirection, SortSpec};

/// Compare two records on the column named by `spec`.
///
/// Total over all records:
/// - prices use `f64::total_cmp`, so NaN sorts after every number
/// - text compares by Unicode scalar value
/// - a missing video count or category sorts before any present value
///
/// Descending reverses the result; equal values stay `Equal` either way.
pub fn compare(a: &Record, b: &Record, spec: SortSpec) -> Ordering {
    let ordering = match spec.column {
        SortColumn::Title => a.title.cmp(&b.title),
        SortColumn::Price => a.price.total_cmp(&b.price),
        SortColumn::Reviews => a.reviews.cmp(&b.reviews),
        SortColumn::VideoCount => a.video_count.cmp(&b.video_count),
        SortColumn::LastUpdated => a.updated_at.cmp(&b.updated_at),
        SortColumn::Category => a.category.cmp(&b.category),
    };

    match spec.direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Stable in-place sort; ties keep their incoming order.
pub fn sort_records(records: &mut [Arc<Record>], spec: SortSpec) {
    records.sort_by(|a, b| compare(a, b, spec));
}
