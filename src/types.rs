use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A single scalar cell after type inference.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::Text(_) => 3,
        }
    }

    /// Native ordering: numeric for numbers, lexicographic for text, `false < true`.
    ///
    /// Values of different kinds fall back to ranking by kind
    /// (null < bool < number < text) so the order stays total.
    pub fn cmp_native(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Header metadata for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub label: String,
    pub width: Option<usize>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let label = default_label(&name);
        Self {
            name,
            label,
            width: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_width(mut self, width: Option<usize>) -> Self {
        self.width = width;
        self
    }
}

/// `legal_name` -> `LEGAL NAME`.
pub fn default_label(name: &str) -> String {
    name.replace('_', " ").to_uppercase()
}

/// The ordered column set shared by every record of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// `base`, or `base_derived`, `base_derived_2`, ... when that name is taken.
    pub fn unique_name(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }
        std::iter::once(format!("{base}_derived"))
            .chain((2..).map(|n| format!("{base}_derived_{n}")))
            .find(|name| !self.contains(name))
            .unwrap_or_else(|| base.to_string())
    }

    /// A new schema with every column of `extra` appended after the existing ones.
    /// An extra column whose name is already taken is renamed with [`Schema::unique_name`].
    pub fn extended(&self, extra: &[ColumnDescriptor]) -> Schema {
        let mut schema = self.clone();
        for col in extra {
            let name = schema.unique_name(&col.name);
            let mut col = col.clone();
            if name != col.name {
                col.label = default_label(&name);
                col.name = name;
            }
            schema.columns.push(col);
        }
        schema
    }
}

/// One CSV data row: a name -> value mapping backed by the dataset schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Record {
    /// `values` must be aligned with `schema`; missing trailing cells read as Null.
    pub fn new(schema: Arc<Schema>, mut values: Vec<Value>) -> Self {
        values.resize(schema.len(), Value::Null);
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .zip(self.values.iter())
    }
}

/// Everything produced by a single load: the schema and its records.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub schema: Arc<Schema>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Exactly one active sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub column: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_replaces_underscores_and_uppercases() {
        assert_eq!(default_label("out_of_service_date"), "OUT OF SERVICE DATE");
        assert_eq!(ColumnDescriptor::new("id").label, "ID");
    }

    #[test]
    fn display_drops_integral_fraction() {
        assert_eq!(Value::Number(15.0).to_string(), "15");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn record_lookup_by_name() {
        let schema = Arc::new(Schema::new(vec![
            ColumnDescriptor::new("a"),
            ColumnDescriptor::new("b"),
        ]));
        let rec = Record::new(schema, vec![Value::Number(1.0)]);
        assert_eq!(rec.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(rec.get("b"), Some(&Value::Null));
        assert_eq!(rec.get("c"), None);
    }

    #[test]
    fn extending_renames_taken_names() {
        let schema = Schema::new(vec![
            ColumnDescriptor::new("year"),
            ColumnDescriptor::new("year_derived"),
        ]);
        let out = schema.extended(&[ColumnDescriptor::new("year"), ColumnDescriptor::new("week")]);
        let names: Vec<&str> = out.names().collect();
        assert_eq!(names, ["year", "year_derived", "year_derived_2", "week"]);
        assert_eq!(out.columns()[2].label, "YEAR DERIVED 2");
    }

    #[test]
    fn mixed_kinds_rank_by_kind() {
        let n = Value::Number(100.0);
        let t = Value::Text("1".into());
        assert_eq!(n.cmp_native(&t), Ordering::Less);
        assert_eq!(Value::Null.cmp_native(&Value::Bool(false)), Ordering::Less);
        assert_eq!(Value::Number(9.0).cmp_native(&Value::Number(10.0)), Ordering::Less);
        assert_eq!(Value::Null.cmp_native(&Value::Null), Ordering::Equal);
    }
}
