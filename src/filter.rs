use crate::types::Record;
use std::borrow::Borrow;

/// Case-insensitive substring match against every field's display form.
pub fn matches(record: &Record, needle_lower: &str) -> bool {
    record
        .values()
        .iter()
        .any(|v| v.to_string().to_lowercase().contains(needle_lower))
}

/// Rows where any field contains `query`, ignoring case. An empty query keeps everything.
///
/// Input order is preserved, so the result is always a subsequence of `rows`.
pub fn filter<R>(rows: &[R], query: &str) -> Vec<R>
where
    R: Borrow<Record> + Clone,
{
    if query.is_empty() {
        return rows.to_vec();
    }
    let needle = query.to_lowercase();
    rows.iter()
        .filter(|r| matches(<R as Borrow<Record>>::borrow(r), &needle))
        .cloned()
        .collect()
}
