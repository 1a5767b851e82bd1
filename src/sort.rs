use crate::types::{Record, SortDirection, Value};
use std::borrow::Borrow;
use std::cmp::Ordering;

/// Compare two cells with native ordering.
///
/// Nulls (and absent fields) sort before every value. Mixed kinds in one
/// column (a number against text) order by kind: bool, then number, then text.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    a.cmp_native(b)
}

/// Stable sort of `rows` on one column. `key = None` keeps input order.
///
/// `slice::sort_by` is a stable merge sort, so rows with equal keys keep their
/// relative order in both directions.
pub fn sort<R>(rows: &[R], key: Option<&str>, direction: SortDirection) -> Vec<R>
where
    R: Borrow<Record> + Clone,
{
    let mut out = rows.to_vec();
    let Some(key) = key else {
        return out;
    };
    let column = out
        .first()
        .and_then(|r| <R as Borrow<Record>>::borrow(r).schema().index_of(key));
    let Some(idx) = column else {
        tracing::debug!(column = key, "sort key not in schema; keeping input order");
        return out;
    };
    out.sort_by(|a, b| {
        let va = <R as Borrow<Record>>::borrow(a).values().get(idx);
        let vb = <R as Borrow<Record>>::borrow(b).values().get(idx);
        direction.apply(compare_values(va, vb))
    });
    out
}
