//! The top-level viewer state.
//!
//! `App` owns the dataset and every piece of view state. Presentation code only
//! reads from it; every change goes through one of its methods, and time only
//! advances through [`App::tick`].
use crate::config::{AppConfig, SourceConfig, ViewConfig};
use crate::debounce::Debouncer;
use crate::error::{IngestError, ViewError};
use crate::filter::filter;
use crate::grid::{group_rows, GroupedGrid};
use crate::loader::{LoadHandle, LoadReport};
use crate::normalize::{RowNormalizer, MONTH_COLUMN};
use crate::pivot::{pivot, PivotSpec, PivotTable};
use crate::sort::sort;
use crate::types::{Dataset, Record, Schema, SortState};
use crate::view::{Pagination, ViewMode, ViewTransition};
use std::sync::Arc;
use std::time::Instant;

/// Data computed for the settled view.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Table,
    Pivot(PivotTable),
    Grid(GroupedGrid),
    /// The view's settings do not fit the dataset (e.g. an unknown pivot column).
    Unavailable(ViewError),
}

pub struct App {
    view_config: ViewConfig,
    source_config: SourceConfig,
    schema: Arc<Schema>,
    rows: Vec<Arc<Record>>,
    loading: Option<LoadHandle>,
    load_report: Option<LoadReport>,
    raw_query: String,
    applied_query: String,
    filter_timer: Debouncer<String>,
    sort: Option<SortState>,
    visible: Vec<Arc<Record>>,
    pagination: Pagination,
    transition: ViewTransition,
    pivot_spec: PivotSpec,
    group_field: String,
    prepared: Option<Prepared>,
}

impl App {
    pub fn new(config: &AppConfig) -> Result<Self, ViewError> {
        let view = &config.view;
        let pagination = Pagination::new(view.page_sizes.clone(), view.default_page_size)?;
        Ok(Self {
            view_config: view.clone(),
            source_config: config.source.clone(),
            schema: Arc::new(Schema::default()),
            rows: Vec::new(),
            loading: None,
            load_report: None,
            raw_query: String::new(),
            applied_query: String::new(),
            filter_timer: Debouncer::new(view.debounce()),
            sort: default_sort(view),
            visible: Vec::new(),
            pagination,
            transition: ViewTransition::default(),
            pivot_spec: PivotSpec::default(),
            group_field: MONTH_COLUMN.to_string(),
            prepared: Some(Prepared::Table),
        })
    }

    /// Track a background load; the app stays busy until it completes.
    pub fn begin_load(&mut self, handle: LoadHandle) {
        tracing::info!(source = handle.location(), "loading dataset");
        self.loading = Some(handle);
    }

    /// Install the load result if it has arrived. Returns true when it did.
    pub fn poll_load(&mut self) -> bool {
        let Some(result) = self.loading.as_ref().and_then(LoadHandle::try_take) else {
            return false;
        };
        self.loading = None;
        self.finish_load(result);
        true
    }

    /// Apply a finished load. Failures are logged and leave an empty dataset.
    pub fn finish_load(&mut self, result: Result<(Dataset, LoadReport), IngestError>) {
        self.loading = None;
        match result {
            Ok((dataset, report)) => {
                self.load_report = Some(report);
                self.install(dataset);
            }
            Err(err) => {
                tracing::error!(error = %err, "could not load dataset; showing an empty view");
                self.load_report = None;
                self.install(Dataset::empty());
            }
        }
    }

    /// Normalize and take ownership of `dataset`, replacing whatever was loaded.
    pub fn install(&mut self, dataset: Dataset) {
        let normalizer = RowNormalizer::from_config(&dataset.schema, &self.source_config);
        let normalized = normalizer.normalize_dataset(&dataset);
        self.group_field = normalizer.month_column().to_string();
        if self.pivot_spec == PivotSpec::default() {
            self.pivot_spec.rows = vec![normalizer.year_column().to_string()];
        }
        self.schema = Arc::clone(&normalized.schema);
        self.rows = normalized.records.into_iter().map(Arc::new).collect();
        self.pagination.reset();
        self.recompute();
    }

    pub fn load_report(&self) -> Option<&LoadReport> {
        self.load_report.as_ref()
    }

    /// Run whatever is due at `now`: a settled filter query, a pending view switch.
    /// Returns true when the visible state changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = self.poll_load();
        if let Some(query) = self.filter_timer.poll(now) {
            self.apply_query(query);
            changed = true;
        }
        if self.transition.is_switching() {
            self.transition = self.transition.settle();
            self.prepare();
            changed = true;
        }
        changed
    }

    /// Apply any pending filter immediately and finish a pending view switch.
    pub fn settle(&mut self) {
        if let Some(query) = self.filter_timer.flush() {
            self.apply_query(query);
        }
        if self.transition.is_switching() {
            self.transition = self.transition.settle();
            self.prepare();
        }
    }

    /// When the next scheduled work falls due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.filter_timer.deadline()
    }

    /// True while data is loading, a filter is pending, or the view is switching.
    pub fn is_busy(&self) -> bool {
        self.loading.is_some() || self.filter_timer.is_pending() || self.transition.is_switching()
    }

    /// Record a keystroke-level query change. The echo updates at once; the
    /// visible rows follow after the debounce window. Over-long input is refused.
    pub fn set_query(&mut self, query: &str, now: Instant) -> bool {
        if query.chars().count() > self.view_config.max_query_len {
            tracing::warn!(
                len = query.chars().count(),
                max = self.view_config.max_query_len,
                "filter query too long; ignored"
            );
            return false;
        }
        self.raw_query = query.to_string();
        if query.is_empty() {
            self.sort = default_sort(&self.view_config);
            self.pagination.reset();
        }
        self.filter_timer.schedule(query.to_string(), now);
        true
    }

    /// The query as typed.
    pub fn query(&self) -> &str {
        &self.raw_query
    }

    /// The query the visible rows currently reflect.
    pub fn applied_query(&self) -> &str {
        &self.applied_query
    }

    fn apply_query(&mut self, query: String) {
        if query != self.applied_query {
            self.pagination.reset();
        }
        self.applied_query = query;
        self.recompute();
    }

    /// `None` restores the default sort and returns to the first page.
    pub fn set_sort(&mut self, sort: Option<SortState>) -> Result<(), ViewError> {
        match sort {
            Some(s) => {
                if !self.schema.contains(&s.column) {
                    return Err(ViewError::UnknownColumn(s.column));
                }
                self.sort = Some(s);
            }
            None => {
                self.sort = default_sort(&self.view_config);
                self.pagination.reset();
            }
        }
        self.recompute();
        Ok(())
    }

    pub fn sort_state(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn set_page(&mut self, page: usize) {
        self.pagination.set_page(page);
        self.pagination.clamp(self.visible.len());
    }

    pub fn next_page(&mut self) {
        self.pagination.next_page(self.visible.len());
    }

    pub fn prev_page(&mut self) {
        self.pagination.prev_page(self.visible.len());
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<(), ViewError> {
        self.pagination.set_page_size(size)
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Start switching to `mode`. The switch completes on the next `tick`/`settle`;
    /// until then nothing is rendered.
    pub fn request_view(&mut self, mode: ViewMode) {
        tracing::debug!(from = ?self.transition.target(), to = %mode, "view switch requested");
        self.transition = self.transition.begin(mode);
        self.prepared = None;
    }

    pub fn toggle_view(&mut self) {
        self.request_view(self.transition.target().next());
    }

    pub fn transition(&self) -> ViewTransition {
        self.transition
    }

    pub fn set_pivot_spec(&mut self, spec: PivotSpec) -> Result<(), ViewError> {
        spec.validate(&self.schema)?;
        self.pivot_spec = spec;
        self.prepare();
        Ok(())
    }

    pub fn pivot_spec(&self) -> &PivotSpec {
        &self.pivot_spec
    }

    pub fn set_group_field(&mut self, field: &str) -> Result<(), ViewError> {
        if !self.schema.contains(field) {
            return Err(ViewError::UnknownColumn(field.to_string()));
        }
        self.group_field = field.to_string();
        self.prepare();
        Ok(())
    }

    pub fn group_field(&self) -> &str {
        &self.group_field
    }

    /// What the settled view should draw; `None` while busy so stale data never shows.
    pub fn prepared(&self) -> Option<&Prepared> {
        if self.is_busy() {
            return None;
        }
        self.prepared.as_ref()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    /// Filtered and sorted rows.
    pub fn visible_rows(&self) -> &[Arc<Record>] {
        &self.visible
    }

    /// The current page of the visible rows, clamped to the last page.
    pub fn current_page(&self) -> &[Arc<Record>] {
        self.pagination.slice(&self.visible)
    }

    fn recompute(&mut self) {
        let filtered = filter(&self.rows, &self.applied_query);
        let key = self.sort.as_ref().map(|s| s.column.as_str());
        let direction = self.sort.as_ref().map(|s| s.direction).unwrap_or_default();
        self.visible = sort(&filtered, key, direction);
        self.pagination.clamp(self.visible.len());
        tracing::debug!(
            query = %self.applied_query,
            sort = ?self.sort,
            visible = self.visible.len(),
            total = self.rows.len(),
            "recomputed visible rows"
        );
        self.prepare();
    }

    fn prepare(&mut self) {
        let Some(mode) = self.transition.rendered() else {
            self.prepared = None;
            return;
        };
        let prepared = match mode {
            ViewMode::FlatTable => Ok(Prepared::Table),
            ViewMode::PivotTable => {
                pivot(&self.schema, &self.visible, &self.pivot_spec).map(Prepared::Pivot)
            }
            ViewMode::GroupedGrid => {
                group_rows(&self.schema, &self.visible, &self.group_field).map(Prepared::Grid)
            }
        };
        self.prepared = Some(prepared.unwrap_or_else(|e| {
            tracing::warn!(view = %mode, error = %e, "view unavailable for this dataset");
            Prepared::Unavailable(e)
        }));
    }
}

fn default_sort(view: &ViewConfig) -> Option<SortState> {
    view.default_sort_column
        .as_ref()
        .map(|c| SortState::new(c.clone(), view.default_sort_direction))
}
