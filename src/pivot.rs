use crate::error::ViewError;
use crate::types::{Record, Schema, Value};
use crate::util::{average, median};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Label used for empty cells when they become group keys.
pub const NULL_KEY: &str = "null";

/// Summary statistic computed per pivot cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregator {
    Count,
    CountUnique(String),
    Sum(String),
    Average(String),
    Median(String),
    Min(String),
    Max(String),
}

impl Aggregator {
    pub fn field(&self) -> Option<&str> {
        match self {
            Aggregator::Count => None,
            Aggregator::CountUnique(f)
            | Aggregator::Sum(f)
            | Aggregator::Average(f)
            | Aggregator::Median(f)
            | Aggregator::Min(f)
            | Aggregator::Max(f) => Some(f),
        }
    }

    /// Numeric aggregates ignore non-numeric cells and yield `None` when none remain.
    fn apply(&self, rows: &[&Record]) -> Option<f64> {
        let numbers = |field: &str| -> Vec<f64> {
            rows.iter()
                .filter_map(|r| r.get(field).and_then(Value::as_f64))
                .collect()
        };
        match self {
            Aggregator::Count => Some(rows.len() as f64),
            Aggregator::CountUnique(f) => {
                let distinct: BTreeSet<String> = rows.iter().map(|r| key_of(r.get(f))).collect();
                Some(distinct.len() as f64)
            }
            Aggregator::Sum(f) => Some(numbers(f.as_str()).iter().sum()),
            Aggregator::Average(f) => {
                let v = numbers(f.as_str());
                (!v.is_empty()).then(|| average(&v))
            }
            Aggregator::Median(f) => {
                let v = numbers(f.as_str());
                (!v.is_empty()).then(|| median(v))
            }
            Aggregator::Min(f) => numbers(f.as_str()).into_iter().reduce(f64::min),
            Aggregator::Max(f) => numbers(f.as_str()).into_iter().reduce(f64::max),
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregator::Count => f.write_str("count"),
            Aggregator::CountUnique(c) => write!(f, "count_unique:{c}"),
            Aggregator::Sum(c) => write!(f, "sum:{c}"),
            Aggregator::Average(c) => write!(f, "avg:{c}"),
            Aggregator::Median(c) => write!(f, "median:{c}"),
            Aggregator::Min(c) => write!(f, "min:{c}"),
            Aggregator::Max(c) => write!(f, "max:{c}"),
        }
    }
}

impl FromStr for Aggregator {
    type Err = String;

    /// `count`, or `<kind>:<column>` where kind is one of
    /// `count_unique`, `sum`, `avg`, `median`, `min`, `max`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("count") {
            return Ok(Aggregator::Count);
        }
        let (kind, field) = s
            .split_once(':')
            .ok_or_else(|| format!("aggregator `{s}` needs a column, e.g. sum:power_units"))?;
        let field = field.trim().to_string();
        if field.is_empty() {
            return Err(format!("aggregator `{s}` has an empty column"));
        }
        match kind.trim().to_ascii_lowercase().as_str() {
            "count_unique" | "unique" => Ok(Aggregator::CountUnique(field)),
            "sum" => Ok(Aggregator::Sum(field)),
            "avg" | "average" | "mean" => Ok(Aggregator::Average(field)),
            "median" => Ok(Aggregator::Median(field)),
            "min" => Ok(Aggregator::Min(field)),
            "max" => Ok(Aggregator::Max(field)),
            other => Err(format!("unknown aggregator `{other}`")),
        }
    }
}

/// What to group by and how to summarize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotSpec {
    pub rows: Vec<String>,
    pub column: Option<String>,
    pub aggregator: Aggregator,
}

impl Default for PivotSpec {
    fn default() -> Self {
        Self {
            rows: vec!["year".to_string()],
            column: None,
            aggregator: Aggregator::Count,
        }
    }
}

impl PivotSpec {
    pub fn validate(&self, schema: &Schema) -> Result<(), ViewError> {
        let fields = self
            .rows
            .iter()
            .map(String::as_str)
            .chain(self.column.as_deref())
            .chain(self.aggregator.field());
        for field in fields {
            if !schema.contains(field) {
                return Err(ViewError::UnknownColumn(field.to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable {
    pub spec: PivotSpec,
    pub row_keys: Vec<Vec<String>>,
    pub col_keys: Vec<String>,
    /// `cells[row][col]`, aligned with `row_keys` x `col_keys`.
    pub cells: Vec<Vec<Option<f64>>>,
    pub row_totals: Vec<Option<f64>>,
    pub col_totals: Vec<Option<f64>>,
    pub grand_total: Option<f64>,
}

pub(crate) fn key_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NULL_KEY.to_string(),
        Some(v) => v.to_string(),
    }
}

/// The first cell value seen for each key label, so keys sort by value
/// (`2, 4, 10`) rather than by their text (`10, 2, 4`).
#[derive(Debug, Default)]
pub(crate) struct KeyValues(HashMap<String, Value>);

impl KeyValues {
    pub(crate) fn note(&mut self, label: &str, value: Option<&Value>) {
        if !self.0.contains_key(label) {
            self.0
                .insert(label.to_string(), value.cloned().unwrap_or(Value::Null));
        }
    }

    pub(crate) fn compare(&self, a: &str, b: &str) -> Ordering {
        let value = |k: &str| self.0.get(k).unwrap_or(&Value::Null);
        value(a).cmp_native(value(b)).then_with(|| a.cmp(b))
    }
}

/// Group `rows` by the `PivotSpec` row fields (and optional column field) and aggregate each cell.
///
/// Keys are ordered ascending by their cell values, nulls first.
pub fn pivot<R>(schema: &Schema, rows: &[R], spec: &PivotSpec) -> Result<PivotTable, ViewError>
where
    R: Borrow<Record>,
{
    spec.validate(schema)?;

    let mut by_cell: BTreeMap<(Vec<String>, String), Vec<&Record>> = BTreeMap::new();
    let mut by_row: BTreeMap<Vec<String>, Vec<&Record>> = BTreeMap::new();
    let mut by_col: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    let mut row_values: Vec<KeyValues> = spec.rows.iter().map(|_| KeyValues::default()).collect();
    let mut col_values = KeyValues::default();
    let mut all: Vec<&Record> = Vec::with_capacity(rows.len());

    for r in rows {
        let record = <R as Borrow<Record>>::borrow(r);
        let row_key: Vec<String> = spec
            .rows
            .iter()
            .zip(row_values.iter_mut())
            .map(|(f, seen)| {
                let key = key_of(record.get(f));
                seen.note(&key, record.get(f));
                key
            })
            .collect();
        let col_key = match spec.column.as_deref() {
            Some(f) => {
                let key = key_of(record.get(f));
                col_values.note(&key, record.get(f));
                key
            }
            None => String::new(),
        };
        by_cell
            .entry((row_key.clone(), col_key.clone()))
            .or_default()
            .push(record);
        by_row.entry(row_key).or_default().push(record);
        if spec.column.is_some() {
            by_col.entry(col_key).or_default().push(record);
        }
        all.push(record);
    }

    let mut row_keys: Vec<Vec<String>> = by_row.keys().cloned().collect();
    row_keys.sort_by(|a, b| {
        a.iter()
            .zip(b)
            .zip(&row_values)
            .map(|((x, y), seen)| seen.compare(x, y))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    let mut col_keys: Vec<String> = by_col.keys().cloned().collect();
    col_keys.sort_by(|a, b| col_values.compare(a, b));
    let agg = &spec.aggregator;

    let cells = if spec.column.is_some() {
        row_keys
            .iter()
            .map(|rk| {
                col_keys
                    .iter()
                    .map(|ck| {
                        by_cell
                            .get(&(rk.clone(), ck.clone()))
                            .and_then(|members| agg.apply(members))
                    })
                    .collect()
            })
            .collect()
    } else {
        vec![Vec::new(); row_keys.len()]
    };
    let row_totals = row_keys
        .iter()
        .map(|k| by_row.get(k).and_then(|m| agg.apply(m)))
        .collect();
    let col_totals = col_keys
        .iter()
        .map(|k| by_col.get(k).and_then(|m| agg.apply(m)))
        .collect();
    let grand_total = if all.is_empty() { None } else { agg.apply(&all) };

    tracing::debug!(
        rows = row_keys.len(),
        cols = col_keys.len(),
        aggregator = %agg,
        "pivot computed"
    );

    Ok(PivotTable {
        spec: spec.clone(),
        row_keys,
        col_keys,
        cells,
        row_totals,
        col_totals,
        grand_total,
    })
}
