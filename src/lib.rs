//! Read-only viewer pipeline for the FMSCA carrier CSV.
//!
//! CSV text is loaded and typed ([`loader`]), each row gets calendar buckets
//! from its date column ([`normalize`]), and [`app::App`] keeps the filtered,
//! sorted and paginated view of it for the table, pivot and grouped-grid renderers.
pub mod app;
pub mod config;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod grid;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod pivot;
pub mod sort;
pub mod types;
pub mod util;
pub mod view;

pub use app::{App, Prepared};
pub use config::AppConfig;
pub use error::{ConfigError, IngestError, ViewError};
pub use loader::{load, spawn_load, IngestOptions, LoadReport, ResourceLocator};
pub use types::{ColumnDescriptor, Dataset, Record, Schema, SortDirection, SortState, Value};
pub use view::{paginate, Pagination, ViewMode};
