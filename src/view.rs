use crate::error::ViewError;
use std::fmt;
use std::str::FromStr;

/// The presentation currently on screen. Only one is rendered at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewMode {
    #[default]
    FlatTable,
    PivotTable,
    GroupedGrid,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [
        ViewMode::FlatTable,
        ViewMode::PivotTable,
        ViewMode::GroupedGrid,
    ];

    /// Cycle table -> pivot -> grid -> table.
    pub fn next(self) -> ViewMode {
        match self {
            ViewMode::FlatTable => ViewMode::PivotTable,
            ViewMode::PivotTable => ViewMode::GroupedGrid,
            ViewMode::GroupedGrid => ViewMode::FlatTable,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::FlatTable => "table",
            ViewMode::PivotTable => "pivot",
            ViewMode::GroupedGrid => "grid",
        })
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" | "flat" => Ok(ViewMode::FlatTable),
            "pivot" => Ok(ViewMode::PivotTable),
            "grid" | "grouped" => Ok(ViewMode::GroupedGrid),
            other => Err(format!("unknown view `{other}` (table, pivot, grid)")),
        }
    }
}

/// Settled in one mode, or mid-switch towards another.
///
/// While `Switching`, nothing from `from` may be drawn under the target's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTransition {
    Settled(ViewMode),
    Switching { from: ViewMode, to: ViewMode },
}

impl Default for ViewTransition {
    fn default() -> Self {
        ViewTransition::Settled(ViewMode::default())
    }
}

impl ViewTransition {
    /// Every transition is legal, including re-selecting the current view.
    pub fn begin(self, to: ViewMode) -> ViewTransition {
        let from = self.current();
        ViewTransition::Switching { from, to }
    }

    pub fn settle(self) -> ViewTransition {
        match self {
            ViewTransition::Switching { to, .. } => ViewTransition::Settled(to),
            settled => settled,
        }
    }

    pub fn is_switching(&self) -> bool {
        matches!(self, ViewTransition::Switching { .. })
    }

    /// The view that will be (or is) on screen once settled.
    pub fn target(&self) -> ViewMode {
        match *self {
            ViewTransition::Settled(m) => m,
            ViewTransition::Switching { to, .. } => to,
        }
    }

    /// The view that is actually rendered; `None` while switching.
    pub fn rendered(&self) -> Option<ViewMode> {
        match *self {
            ViewTransition::Settled(m) => Some(m),
            ViewTransition::Switching { .. } => None,
        }
    }

    fn current(&self) -> ViewMode {
        match *self {
            ViewTransition::Settled(m) => m,
            ViewTransition::Switching { from, .. } => from,
        }
    }
}

/// `[page*size, page*size + size)` clamped to the bounds of `rows`.
///
/// Pages past the end yield an empty slice; use [`Pagination::slice`] for clamping
/// to the last page.
pub fn paginate<T>(rows: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_mul(page_size).min(rows.len());
    let end = start.saturating_add(page_size).min(rows.len());
    &rows[start..end]
}

/// Number of pages needed for `len` rows; an empty set still has one (empty) page.
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    len.div_ceil(page_size).max(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    page_size: usize,
    allowed: Vec<usize>,
}

impl Pagination {
    pub fn new(allowed: Vec<usize>, page_size: usize) -> Result<Self, ViewError> {
        let mut p = Self {
            page: 0,
            page_size: allowed.first().copied().unwrap_or(page_size),
            allowed,
        };
        p.set_page_size(page_size)?;
        Ok(p)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn allowed_sizes(&self) -> &[usize] {
        &self.allowed
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Only sizes from the allowed set are accepted. Any change returns to page 0.
    pub fn set_page_size(&mut self, size: usize) -> Result<(), ViewError> {
        if !self.allowed.contains(&size) {
            return Err(ViewError::PageSize {
                requested: size,
                allowed: self.allowed.clone(),
            });
        }
        self.page_size = size;
        self.page = 0;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.page = 0;
    }

    /// The page actually shown for `len` rows: the requested one, or the last page.
    pub fn effective_page(&self, len: usize) -> usize {
        self.page.min(page_count(len, self.page_size) - 1)
    }

    /// Pull the stored page back into range, e.g. after the row set shrank.
    pub fn clamp(&mut self, len: usize) {
        self.page = self.effective_page(len);
    }

    pub fn next_page(&mut self, len: usize) {
        self.page = (self.effective_page(len) + 1).min(page_count(len, self.page_size) - 1);
    }

    pub fn prev_page(&mut self, len: usize) {
        self.page = self.effective_page(len).saturating_sub(1);
    }

    pub fn slice<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        paginate(rows, self.effective_page(rows.len()), self.page_size)
    }
}
