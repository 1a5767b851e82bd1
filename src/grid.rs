use crate::error::ViewError;
use crate::pivot::{key_of, KeyValues};
use crate::types::{Record, Schema};
use std::borrow::Borrow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: String,
    pub count: usize,
    /// Percentage of all grouped rows.
    pub share: f64,
}

/// Rows bucketed by one field, ready for the grid and its chart panel.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedGrid {
    pub field: String,
    pub groups: Vec<Group>,
    pub total: usize,
}

impl GroupedGrid {
    pub fn largest(&self) -> usize {
        self.groups.iter().map(|g| g.count).max().unwrap_or(0)
    }
}

pub fn group_rows<R>(schema: &Schema, rows: &[R], field: &str) -> Result<GroupedGrid, ViewError>
where
    R: Borrow<Record>,
{
    if !schema.contains(field) {
        return Err(ViewError::UnknownColumn(field.to_string()));
    }
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut seen = KeyValues::default();
    for r in rows {
        let record = <R as Borrow<Record>>::borrow(r);
        let key = key_of(record.get(field));
        seen.note(&key, record.get(field));
        *counts.entry(key).or_default() += 1;
    }
    let total = rows.len();
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| seen.compare(&a.0, &b.0));
    let groups = counts
        .into_iter()
        .map(|(key, count)| Group {
            key,
            count,
            share: if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            },
        })
        .collect();
    Ok(GroupedGrid {
        field: field.to_string(),
        groups,
        total,
    })
}

/// Horizontal bar chart, one line per group, bars scaled so the largest fills `width`.
pub fn bar_chart(grid: &GroupedGrid, width: usize) -> Vec<String> {
    let largest = grid.largest();
    let label_width = grid.groups.iter().map(|g| g.key.len()).max().unwrap_or(0);
    grid.groups
        .iter()
        .map(|g| {
            let len = if largest == 0 {
                0
            } else {
                // Round up so every non-empty group shows at least one cell.
                (g.count * width).div_ceil(largest)
            };
            format!(
                "{:<label_width$} | {} {}",
                g.key,
                "#".repeat(len),
                g.count
            )
        })
        .collect()
}
