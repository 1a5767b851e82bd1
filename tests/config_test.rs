use fmsca_viewer::{App, AppConfig, ConfigError, SortDirection};

#[test]
fn test_missing_config_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_default_config_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    AppConfig::write_default(&path, false).unwrap();
    let loaded = AppConfig::load(&path).unwrap();
    assert_eq!(loaded, AppConfig::default());
}

#[test]
fn test_write_default_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "# mine\n").unwrap();
    assert!(matches!(
        AppConfig::write_default(&path, false),
        Err(ConfigError::Invalid(_))
    ));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");
    AppConfig::write_default(&path, true).unwrap();
    assert!(std::fs::read_to_string(&path).unwrap().contains("[view]"));
}

#[test]
fn test_partial_config_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[view]
debounce_ms = 150
default_page_size = 25
default_sort_direction = "desc"

[columns.labels]
legal_name = "Carrier"
"#,
    )
    .unwrap();
    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.view.debounce_ms, 150);
    assert_eq!(config.view.default_page_size, 25);
    assert_eq!(config.view.default_sort_direction, SortDirection::Desc);
    assert_eq!(config.view.page_sizes, vec![10, 25, 50, 100]);
    assert_eq!(config.source.date_column, "out_of_service_date");
    assert_eq!(config.columns.label_for("legal_name"), Some("Carrier"));

    let app = App::new(&config).unwrap();
    assert_eq!(app.pagination().page_size(), 25);
}

#[test]
fn test_invalid_default_page_size_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[view]\ndefault_page_size = 30\n").unwrap();
    assert!(matches!(
        AppConfig::load(&path),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_malformed_toml_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[view\n").unwrap();
    assert!(matches!(AppConfig::load(&path), Err(ConfigError::Toml(_))));
}
