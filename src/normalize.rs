use crate::config::SourceConfig;
use crate::types::{ColumnDescriptor, Dataset, Record, Schema, Value};
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

pub const YEAR_COLUMN: &str = "year";
pub const MONTH_COLUMN: &str = "month";
pub const WEEK_COLUMN: &str = "week";

/// Calendar buckets derived from one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateBuckets {
    /// `YYYY`
    pub year: String,
    /// `YYYY-MM`
    pub month: String,
    /// `YYYY-WW`, ISO-8601 week-year and week number. Early-January days that
    /// belong to the previous ISO year carry that year, not the calendar year.
    pub week: String,
}

impl DateBuckets {
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: format!("{:04}", date.year()),
            month: format!("{:04}-{:02}", date.year(), date.month()),
            week: format!("{:04}-{:02}", iso.year(), iso.week()),
        }
    }
}

/// Appends `year`, `month` and `week` columns computed from a date column.
///
/// Never fails: a missing or unparseable date yields nulls in all three.
/// Source cells are copied by position and never touched; if the source already
/// has a column named like a derived one, the derived column gets a suffixed name.
#[derive(Debug, Clone)]
pub struct RowNormalizer {
    date_column: String,
    date_format: String,
    source_len: usize,
    schema: Arc<Schema>,
}

impl RowNormalizer {
    pub fn new(
        source: &Schema,
        date_column: impl Into<String>,
        date_format: impl Into<String>,
    ) -> Self {
        let derived = [YEAR_COLUMN, MONTH_COLUMN, WEEK_COLUMN]
            .map(|name| ColumnDescriptor::new(name).with_width(Some(8)));
        Self {
            date_column: date_column.into(),
            date_format: date_format.into(),
            source_len: source.len(),
            schema: Arc::new(source.extended(&derived)),
        }
    }

    pub fn from_config(source: &Schema, config: &SourceConfig) -> Self {
        Self::new(source, &config.date_column, &config.date_format)
    }

    /// Schema of the records this normalizer produces.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The appended year, month and week columns, in that order.
    pub fn derived_columns(&self) -> &[ColumnDescriptor] {
        &self.schema.columns()[self.source_len..]
    }

    pub fn year_column(&self) -> &str {
        &self.derived_columns()[0].name
    }

    pub fn month_column(&self) -> &str {
        &self.derived_columns()[1].name
    }

    pub fn week_column(&self) -> &str {
        &self.derived_columns()[2].name
    }

    pub fn parse_date(&self, value: &Value) -> Option<NaiveDate> {
        let text = match value {
            Value::Null => return None,
            other => other.to_string(),
        };
        NaiveDate::parse_from_str(text.trim(), &self.date_format).ok()
    }

    pub fn normalize(&self, record: &Record) -> Record {
        let buckets = record
            .get(&self.date_column)
            .and_then(|v| self.parse_date(v))
            .map(DateBuckets::from_date);

        let mut values = record.values().to_vec();
        values.resize(self.source_len, Value::Null);
        match buckets {
            Some(b) => values.extend([Value::Text(b.year), Value::Text(b.month), Value::Text(b.week)]),
            None => values.extend([Value::Null, Value::Null, Value::Null]),
        }
        Record::new(Arc::clone(&self.schema), values)
    }

    pub fn normalize_dataset(&self, dataset: &Dataset) -> Dataset {
        let records: Vec<Record> = dataset.records.iter().map(|r| self.normalize(r)).collect();
        let year = self.source_len;
        let parsed = records
            .iter()
            .filter(|r| r.values().get(year).is_some_and(|v| !v.is_null()))
            .count();
        tracing::debug!(
            rows = records.len(),
            dated = parsed,
            column = %self.date_column,
            "normalized dataset"
        );
        Dataset {
            schema: Arc::clone(&self.schema),
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: Value) -> Record {
        let schema = Arc::new(Schema::new(vec![
            ColumnDescriptor::new("legal_name"),
            ColumnDescriptor::new("out_of_service_date"),
        ]));
        Record::new(schema, vec![Value::Text("Acme Co".into()), date])
    }

    fn normalizer(rec: &Record) -> RowNormalizer {
        RowNormalizer::new(rec.schema(), "out_of_service_date", "%m/%d/%Y")
    }

    #[test]
    fn derives_year_month_week() {
        let rec = record(Value::Text("03/15/2023".into()));
        let out = normalizer(&rec).normalize(&rec);
        assert_eq!(out.get("year"), Some(&Value::Text("2023".into())));
        assert_eq!(out.get("month"), Some(&Value::Text("2023-03".into())));
        assert_eq!(out.get("week"), Some(&Value::Text("2023-11".into())));
        assert_eq!(out.get("legal_name"), rec.get("legal_name"));
    }

    // Calendar year paired with the ISO week would give `2023-52` here; the
    // week-year keeps the bucket in the week it actually belongs to.
    #[test]
    fn week_uses_iso_week_year_not_calendar_year() {
        let b = DateBuckets::from_date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(b.year, "2023");
        assert_eq!(b.week, "2022-52");
    }

    #[test]
    fn unparseable_or_missing_dates_leave_nulls() {
        for date in [Value::Null, Value::Text("not a date".into()), Value::Number(5.0)] {
            let rec = record(date);
            let out = normalizer(&rec).normalize(&rec);
            assert_eq!(out.get("year"), Some(&Value::Null));
            assert_eq!(out.get("month"), Some(&Value::Null));
            assert_eq!(out.get("week"), Some(&Value::Null));
        }
    }

    #[test]
    fn source_record_is_untouched() {
        let rec = record(Value::Text("03/15/2023".into()));
        let before = rec.clone();
        let _ = normalizer(&rec).normalize(&rec);
        assert_eq!(rec, before);
        assert_eq!(rec.get("year"), None);
    }

    #[test]
    fn missing_date_column_still_normalizes() {
        let schema = Arc::new(Schema::new(vec![ColumnDescriptor::new("legal_name")]));
        let rec = Record::new(schema, vec![Value::Text("x".into())]);
        let out = normalizer(&rec).normalize(&rec);
        assert_eq!(out.values().len(), 4);
        assert_eq!(out.get("week"), Some(&Value::Null));
    }

    #[test]
    fn existing_derived_names_are_kept_and_suffixed() {
        let schema = Arc::new(Schema::new(vec![
            ColumnDescriptor::new("legal_name"),
            ColumnDescriptor::new("year"),
            ColumnDescriptor::new("out_of_service_date"),
        ]));
        let rec = Record::new(
            schema,
            vec![
                Value::Text("Acme".into()),
                Value::Number(1999.0),
                Value::Text("not-a-date".into()),
            ],
        );
        let n = normalizer(&rec);
        assert_eq!(n.year_column(), "year_derived");
        assert_eq!(n.month_column(), "month");
        let out = n.normalize(&rec);
        assert_eq!(out.get("year"), Some(&Value::Number(1999.0)));
        assert_eq!(out.get("year_derived"), Some(&Value::Null));
    }

    #[test]
    fn duplicate_headers_keep_their_own_cells() {
        let schema = Arc::new(Schema::new(vec![
            ColumnDescriptor::new("phone"),
            ColumnDescriptor::new("phone"),
            ColumnDescriptor::new("out_of_service_date"),
        ]));
        let rec = Record::new(
            schema,
            vec![
                Value::Text("555-0100".into()),
                Value::Text("555-0199".into()),
                Value::Text("03/15/2023".into()),
            ],
        );
        let out = normalizer(&rec).normalize(&rec);
        assert_eq!(&out.values()[..3], rec.values());
        assert_eq!(out.values()[3], Value::Text("2023".into()));
    }
}
