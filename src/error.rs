use thiserror::Error;

/// Failures that can happen while bringing the dataset into memory.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Resource unreachable, or the server answered with a non-2xx status.
    #[error("failed to fetch {location}: {reason}")]
    Fetch { location: String, reason: String },

    /// The CSV parser reported a structural problem. Nothing parsed before it is kept.
    #[error("malformed CSV{}: {reason}", .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Parse { line: Option<u64>, reason: String },

    #[error("dataset is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line());
        IngestError::Parse {
            line,
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("page size {requested} is not one of {allowed:?}")]
    PageSize { requested: usize, allowed: Vec<usize> },

    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    /// Raised when a table is asked to render before any rows exist.
    /// Callers withhold the view instead of showing this to the user.
    #[error("nothing to render: the dataset has no rows")]
    EmptyDataset,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
