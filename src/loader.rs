use crate::config::{AppConfig, ColumnsConfig};
use crate::error::IngestError;
use crate::types::{ColumnDescriptor, Dataset, Record, Schema, Value};
use crate::util::infer_value;
use csv::ReaderBuilder;
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

/// Where the CSV text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocator {
    Path(PathBuf),
    Url(String),
}

impl ResourceLocator {
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            ResourceLocator::Url(s.to_string())
        } else {
            ResourceLocator::Path(PathBuf::from(s))
        }
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceLocator::Path(p) => write!(f, "{}", p.display()),
            ResourceLocator::Url(u) => f.write_str(u),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub required_columns: Vec<String>,
    pub columns: ColumnsConfig,
}

impl From<&AppConfig> for IngestOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            required_columns: config.source.required_columns.clone(),
            columns: config.columns.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub columns: usize,
    pub null_cells: usize,
}

/// Fetch, parse and type a CSV resource in one go.
pub fn load(
    locator: &ResourceLocator,
    options: &IngestOptions,
) -> Result<(Dataset, LoadReport), IngestError> {
    let text = fetch_text(locator)?;
    let loaded = parse_csv(&text, options)?;
    tracing::info!(
        source = %locator,
        rows = loaded.1.total_rows,
        columns = loaded.1.columns,
        "dataset loaded"
    );
    Ok(loaded)
}

pub fn fetch_text(locator: &ResourceLocator) -> Result<String, IngestError> {
    match locator {
        ResourceLocator::Path(path) => {
            std::fs::read_to_string(path).map_err(|e| IngestError::Fetch {
                location: locator.to_string(),
                reason: e.to_string(),
            })
        }
        ResourceLocator::Url(url) => fetch_http(url),
    }
}

#[cfg(feature = "http")]
fn fetch_http(url: &str) -> Result<String, IngestError> {
    let fetch_err = |reason: String| IngestError::Fetch {
        location: url.to_string(),
        reason,
    };
    let response = match ureq::get(url).timeout(std::time::Duration::from_secs(60)).call() {
        Ok(r) => r,
        Err(ureq::Error::Status(code, r)) => {
            return Err(fetch_err(format!("server returned {} {}", code, r.status_text())))
        }
        Err(e) => return Err(fetch_err(e.to_string())),
    };
    let status = response.status();
    if !(200..300).contains(&status) {
        return Err(fetch_err(format!(
            "server returned {} {}",
            status,
            response.status_text()
        )));
    }
    response.into_string().map_err(|e| fetch_err(e.to_string()))
}

#[cfg(not(feature = "http"))]
fn fetch_http(url: &str) -> Result<String, IngestError> {
    Err(IngestError::Fetch {
        location: url.to_string(),
        reason: "built without the `http` feature".to_string(),
    })
}

/// Parse CSV text with a header row, inferring a primitive type for every cell.
///
/// All-or-nothing: the first malformed row (including one whose field count
/// differs from the header) fails the whole parse.
pub fn parse_csv(text: &str, options: &IngestOptions) -> Result<(Dataset, LoadReport), IngestError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    let schema = Arc::new(build_schema(headers.iter(), &options.columns));

    let missing: Vec<String> = options
        .required_columns
        .iter()
        .filter(|c| !schema.contains(c))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }

    let mut records = Vec::new();
    let mut null_cells = 0usize;
    for result in rdr.records() {
        let row = result?;
        let values: Vec<Value> = row.iter().map(infer_value).collect();
        null_cells += values.iter().filter(|v| v.is_null()).count();
        records.push(Record::new(Arc::clone(&schema), values));
    }

    let report = LoadReport {
        total_rows: records.len(),
        columns: schema.len(),
        null_cells,
    };
    Ok((Dataset { schema, records }, report))
}

fn build_schema<'a>(headers: impl Iterator<Item = &'a str>, columns: &ColumnsConfig) -> Schema {
    Schema::new(
        headers
            .map(|h| {
                let name = h.trim();
                let col = ColumnDescriptor::new(name).with_width(columns.width_for(name));
                match columns.label_for(name) {
                    Some(label) => col.with_label(label),
                    None => col,
                }
            })
            .collect(),
    )
}

type LoadResult = Result<(Dataset, LoadReport), IngestError>;

/// A load running on a worker thread.
///
/// Dropping the handle tears the consumer down; the worker then discards its result.
pub struct LoadHandle {
    location: String,
    rx: Receiver<LoadResult>,
}

impl LoadHandle {
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Non-blocking: `None` while the load is still in flight.
    pub fn try_take(&self) -> Option<LoadResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(IngestError::Fetch {
                location: self.location.clone(),
                reason: "loader exited without a result".to_string(),
            })),
        }
    }

    /// Block until the load finishes.
    pub fn wait(self) -> LoadResult {
        self.rx.recv().unwrap_or_else(|_| {
            Err(IngestError::Fetch {
                location: self.location.clone(),
                reason: "loader exited without a result".to_string(),
            })
        })
    }
}

pub fn spawn_load(locator: ResourceLocator, options: IngestOptions) -> LoadHandle {
    let (tx, rx) = mpsc::channel();
    let location = locator.to_string();
    thread::spawn(move || {
        let result = load(&locator, &options);
        if tx.send(result).is_err() {
            tracing::debug!(source = %locator, "viewer gone before load finished; result dropped");
        }
    });
    LoadHandle { location, rx }
}
