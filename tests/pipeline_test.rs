mod common;

use common::{write_csv, CARRIERS_CSV};
use fmsca_viewer::output::render;
use fmsca_viewer::pivot::{Aggregator, PivotSpec};
use fmsca_viewer::{
    load, spawn_load, App, AppConfig, IngestError, IngestOptions, Prepared, ResourceLocator,
    SortDirection, SortState, Value, ViewMode,
};
use std::time::{Duration, Instant};

fn names(app: &App) -> Vec<String> {
    app.visible_rows()
        .iter()
        .map(|r| r.get("legal_name").map(Value::to_string).unwrap_or_default())
        .collect()
}

fn loaded_app() -> App {
    let (_dir, path) = write_csv("carriers.csv", CARRIERS_CSV);
    let mut app = App::new(&AppConfig::default()).unwrap();
    let result = load(
        &ResourceLocator::Path(path),
        &IngestOptions::from(&AppConfig::default()),
    );
    app.finish_load(result);
    app
}

#[test]
fn test_load_from_file_normalizes_and_sorts_by_default() {
    let app = loaded_app();
    assert_eq!(app.total_rows(), 4);
    assert_eq!(
        names(&app),
        ["Gamma Freight", "Beta LLC", "Acme Trucking", "Acme Co"]
    );
    let acme = app
        .visible_rows()
        .iter()
        .find(|r| r.get("legal_name") == Some(&Value::Text("Acme Co".into())))
        .unwrap();
    assert_eq!(acme.get("year"), Some(&Value::Text("2023".into())));
    assert_eq!(acme.get("month"), Some(&Value::Text("2023-03".into())));
    assert_eq!(acme.get("week"), Some(&Value::Text("2023-11".into())));
    assert_eq!(acme.get("p_zip_code"), Some(&Value::Text("01234".into())));

    let beta = &app.visible_rows()[1];
    assert_eq!(beta.get("year"), Some(&Value::Null));
    assert_eq!(beta.get("power_units"), Some(&Value::Null));
}

#[test]
fn test_spawned_load_completes_through_tick() {
    let (_dir, path) = write_csv("carriers.csv", CARRIERS_CSV);
    let mut app = App::new(&AppConfig::default()).unwrap();
    app.begin_load(spawn_load(
        ResourceLocator::Path(path),
        IngestOptions::default(),
    ));
    assert!(app.is_busy());

    let give_up = Instant::now() + Duration::from_secs(10);
    while app.is_busy() && Instant::now() < give_up {
        app.tick(Instant::now());
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!app.is_busy());
    assert_eq!(app.total_rows(), 4);
    assert_eq!(app.load_report().map(|r| r.total_rows), Some(4));
}

#[test]
fn test_missing_file_is_a_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let locator = ResourceLocator::Path(dir.path().join("nope.csv"));
    let err = load(&locator, &IngestOptions::default()).unwrap_err();
    assert!(matches!(err, IngestError::Fetch { .. }));
}

#[test]
fn test_failed_load_leaves_empty_view() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = App::new(&AppConfig::default()).unwrap();
    app.begin_load(spawn_load(
        ResourceLocator::Path(dir.path().join("nope.csv")),
        IngestOptions::default(),
    ));
    let give_up = Instant::now() + Duration::from_secs(10);
    while app.is_busy() && Instant::now() < give_up {
        app.tick(Instant::now());
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(app.total_rows(), 0);
    assert!(app.load_report().is_none());
    assert!(render(&app).is_err());
}

#[test]
fn test_ragged_file_is_rejected_whole() {
    let (_dir, path) = write_csv("bad.csv", "a,b\n1,2\n3\n4,5\n");
    let err = load(&ResourceLocator::Path(path), &IngestOptions::default()).unwrap_err();
    assert!(matches!(err, IngestError::Parse { .. }));
}

#[test]
fn test_required_columns_are_checked() {
    let (_dir, path) = write_csv("carriers.csv", CARRIERS_CSV);
    let options = IngestOptions {
        required_columns: vec!["legal_name".into(), "usdot_number".into()],
        ..IngestOptions::default()
    };
    let err = load(&ResourceLocator::Path(path), &options).unwrap_err();
    match err {
        IngestError::MissingColumns(cols) => assert_eq!(cols, ["usdot_number"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_dropping_the_handle_is_harmless() {
    let (_dir, path) = write_csv("carriers.csv", CARRIERS_CSV);
    let handle = spawn_load(ResourceLocator::Path(path.clone()), IngestOptions::default());
    drop(handle);
    // The worker must not bring anything down; a fresh load still works.
    let (dataset, _) = load(&ResourceLocator::Path(path), &IngestOptions::default()).unwrap();
    assert_eq!(dataset.len(), 4);
}

#[test]
fn test_typing_a_filter_settles_once() {
    let mut app = loaded_app();
    let start = Instant::now();
    for (i, prefix) in ["a", "ac", "acm", "acme"].into_iter().enumerate() {
        app.set_query(prefix, start + Duration::from_millis(50 * i as u64));
    }
    assert_eq!(app.query(), "acme");
    assert_eq!(app.visible_rows().len(), 4);
    assert!(app.is_busy());

    // Not yet: the window restarts on every keystroke.
    app.tick(start + Duration::from_millis(400));
    assert_eq!(app.visible_rows().len(), 4);

    app.tick(start + Duration::from_millis(451));
    assert!(!app.is_busy());
    assert_eq!(names(&app), ["Acme Trucking", "Acme Co"]);
}

#[test]
fn test_filter_sort_and_paginate() {
    let mut app = loaded_app();
    app.set_query("nv", Instant::now());
    app.settle();
    app.set_sort(Some(SortState::new("power_units", SortDirection::Desc)))
        .unwrap();
    assert_eq!(names(&app), ["Acme Co", "Acme Trucking"]);

    app.set_page_size(10).unwrap();
    app.set_page(3);
    assert_eq!(app.pagination().effective_page(app.visible_rows().len()), 0);
    assert_eq!(app.current_page().len(), 2);
    assert!(app.set_page_size(7).is_err());
}

#[test]
fn test_pivot_and_grid_views() {
    let mut app = loaded_app();
    app.set_pivot_spec(PivotSpec {
        rows: vec!["p_state".into()],
        column: None,
        aggregator: Aggregator::Sum("power_units".into()),
    })
    .unwrap();
    app.request_view(ViewMode::PivotTable);
    assert!(render(&app).unwrap().is_none());
    app.settle();
    match app.prepared() {
        Some(Prepared::Pivot(t)) => {
            assert_eq!(t.row_keys.len(), 3);
            assert_eq!(t.grand_total, Some(55.0));
        }
        other => panic!("expected a pivot, got {other:?}"),
    }

    app.request_view(ViewMode::GroupedGrid);
    app.settle();
    match app.prepared() {
        Some(Prepared::Grid(g)) => {
            assert_eq!(g.field, "month");
            assert_eq!(g.total, 4);
        }
        other => panic!("expected a grid, got {other:?}"),
    }
    let out = render(&app).unwrap().unwrap();
    assert!(out.contains("Rows per month:"));
}
