use crate::app::{App, Prepared};
use crate::error::ViewError;
use crate::grid::{bar_chart, GroupedGrid};
use crate::pivot::PivotTable;
use crate::types::{Record, Schema};
use crate::util::{format_int, format_number};
use crate::view::page_count;
use serde::Serialize;
use std::borrow::Borrow;
use std::error::Error;
use tabled::builder::Builder;
use tabled::settings::object::Columns;
use tabled::settings::{Modify, Style, Width};

const CHART_WIDTH: usize = 40;

/// Render whatever the settled view shows.
///
/// `Ok(None)` while the app is busy. `Err(EmptyDataset)` when there is nothing
/// to draw yet; callers withhold the view in that case.
pub fn render(app: &App) -> Result<Option<String>, ViewError> {
    if app.total_rows() == 0 {
        return Err(ViewError::EmptyDataset);
    }
    let Some(prepared) = app.prepared() else {
        return Ok(None);
    };
    let body = match prepared {
        Prepared::Table => render_table(app.schema(), app.current_page()),
        Prepared::Pivot(t) => render_pivot(app.schema(), t),
        Prepared::Grid(g) => render_grid(g, CHART_WIDTH),
        Prepared::Unavailable(e) => format!("(view unavailable: {e})"),
    };
    Ok(Some(body))
}

pub fn render_table<R: Borrow<Record>>(schema: &Schema, rows: &[R]) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(schema.columns().iter().map(|c| c.label.clone()));
    for r in rows {
        let record = <R as Borrow<Record>>::borrow(r);
        builder.push_record(record.values().iter().map(|v| v.to_string()));
    }
    let mut table = builder.build();
    table.with(Style::markdown());
    for (i, col) in schema.columns().iter().enumerate() {
        if let Some(w) = col.width {
            table.with(Modify::new(Columns::single(i)).with(Width::truncate(w).suffix("~")));
        }
    }
    table.to_string()
}

fn cell(v: Option<f64>) -> String {
    match v {
        None => String::new(),
        Some(n) if n.fract() == 0.0 && n.abs() < 1e15 => format_int(n as i64),
        Some(n) => format_number(n, 2),
    }
}

pub fn render_pivot(schema: &Schema, table: &PivotTable) -> String {
    let label = |name: &str| {
        schema
            .index_of(name)
            .map(|i| schema.columns()[i].label.clone())
            .unwrap_or_else(|| name.to_string())
    };
    let spec = &table.spec;
    let mut builder = Builder::default();

    let mut header: Vec<String> = spec.rows.iter().map(|r| label(r.as_str())).collect();
    header.extend(table.col_keys.iter().cloned());
    header.push(format!("Totals ({})", spec.aggregator));
    builder.push_record(header);

    for (i, key) in table.row_keys.iter().enumerate() {
        let mut line = key.clone();
        line.extend(table.cells[i].iter().map(|c| cell(*c)));
        line.push(cell(table.row_totals[i]));
        builder.push_record(line);
    }

    let mut totals = vec!["Totals".to_string()];
    totals.extend(std::iter::repeat(String::new()).take(spec.rows.len().saturating_sub(1)));
    totals.extend(table.col_totals.iter().map(|c| cell(*c)));
    totals.push(cell(table.grand_total));
    builder.push_record(totals);

    builder.build().with(Style::markdown()).to_string()
}

pub fn render_grid(grid: &GroupedGrid, chart_width: usize) -> String {
    let mut builder = Builder::default();
    builder.push_record([grid.field.to_uppercase(), "ROWS".to_string(), "SHARE %".to_string()]);
    for g in &grid.groups {
        builder.push_record([g.key.clone(), format_int(g.count), format_number(g.share, 2)]);
    }
    let table = builder.build().with(Style::markdown()).to_string();
    let chart = bar_chart(grid, chart_width).join("\n");
    format!("{table}\n\nRows per {}:\n{chart}", grid.field)
}

/// One-line summary of the view state shown above every render.
pub fn status_line(app: &App) -> String {
    let pagination = app.pagination();
    let visible = app.visible_rows().len();
    let sort = app
        .sort_state()
        .map(|s| format!("{} {:?}", s.column, s.direction).to_lowercase())
        .unwrap_or_else(|| "none".to_string());
    let busy = if app.is_busy() { " | busy" } else { "" };
    format!(
        "view: {} | rows {}/{} | page {}/{} (size {}) | filter: '{}' | sort: {}{}",
        app.transition().target(),
        format_int(visible),
        format_int(app.total_rows()),
        pagination.effective_page(visible) + 1,
        page_count(visible, pagination.page_size()),
        pagination.page_size(),
        app.query(),
        sort,
        busy
    )
}

#[derive(Debug, Serialize)]
pub struct ViewSummary {
    pub total_rows: usize,
    pub visible_rows: usize,
    pub columns: Vec<String>,
    pub query: String,
    pub sort: Option<String>,
    pub view: String,
}

impl ViewSummary {
    pub fn from_app(app: &App) -> Self {
        Self {
            total_rows: app.total_rows(),
            visible_rows: app.visible_rows().len(),
            columns: app.schema().names().map(str::to_string).collect(),
            query: app.applied_query().to_string(),
            sort: app
                .sort_state()
                .map(|s| format!("{} {:?}", s.column, s.direction).to_lowercase()),
            view: app.transition().target().to_string(),
        }
    }
}

/// Write `rows` as CSV with the schema's column names as header.
pub fn write_csv<R: Borrow<Record>>(
    path: &str,
    schema: &Schema,
    rows: &[R],
) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(schema.names())?;
    for r in rows {
        wtr.serialize(<R as Borrow<Record>>::borrow(r).values())?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::loader::{parse_csv, IngestOptions};
    use crate::pivot::{pivot, PivotSpec};
    use crate::view::ViewMode;

    const CSV: &str = "legal_name,p_state,power_units\n\
                       Acme Co,NV,3\n\
                       Beta LLC,CA,12\n";

    fn loaded() -> App {
        let mut app = App::new(&AppConfig::default()).unwrap();
        app.finish_load(parse_csv(CSV, &IngestOptions::default()));
        app
    }

    #[test]
    fn table_uses_labels() {
        let app = loaded();
        let out = render(&app).unwrap().unwrap();
        assert!(out.contains("LEGAL NAME"));
        assert!(out.contains("Beta LLC"));
        assert!(out.contains("POWER UNITS"));
    }

    #[test]
    fn empty_dataset_withholds_render() {
        let app = App::new(&AppConfig::default()).unwrap();
        assert_eq!(render(&app), Err(ViewError::EmptyDataset));
    }

    #[test]
    fn busy_app_renders_nothing() {
        let mut app = loaded();
        app.request_view(ViewMode::GroupedGrid);
        assert_eq!(render(&app), Ok(None));
    }

    #[test]
    fn pivot_has_totals_row() {
        let app = loaded();
        let spec = PivotSpec {
            rows: vec!["p_state".into()],
            column: None,
            aggregator: "sum:power_units".parse().unwrap(),
        };
        let t = pivot(app.schema(), app.visible_rows(), &spec).unwrap();
        let out = render_pivot(app.schema(), &t);
        assert!(out.contains("P STATE"));
        assert!(out.contains("Totals (sum:power_units)"));
        assert!(out.contains("15"));
    }

    #[test]
    fn status_line_reports_state() {
        let app = loaded();
        let line = status_line(&app);
        assert!(line.starts_with("view: table | rows 2/2 | page 1/1 (size 100)"));
        assert!(line.contains("sort: created_dt asc"));
    }

    #[test]
    fn csv_export_writes_header_and_rows() {
        let app = loaded();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let path = path.to_str().unwrap();
        write_csv(path, app.schema(), app.visible_rows()).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("legal_name,p_state,power_units,year,month,week"));
        assert_eq!(lines.next(), Some("Acme Co,NV,3,,,"));
    }
}
