use rboost::core::config::{Config, Theme};
use tempfile::TempDir;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.theme, Theme::Dark);
    assert!(config.auto_reboot_prompt);
    assert!(!config.silent_cleanup_enabled);
    assert_eq!(config.silent_cleanup_interval_secs, 43_200);
}

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("settings.json");

    let mut config = Config::default();
    config.theme = Theme::Light;
    config.monitor.interval_ms = 250;
    config.clean.custom_paths = vec!["/var/cache/app".to_string()];
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path);
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_gives_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let loaded = Config::load_from(&temp_dir.path().join("absent.json"));
    assert_eq!(loaded, Config::default());
}

#[test]
fn test_corrupted_file_gives_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert_eq!(Config::load_from(&path), Config::default());
}

#[test]
fn test_loaded_values_are_validated() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, r#"{"monitor":{"interval_ms":1,"history_capacity":0}}"#).unwrap();

    let loaded = Config::load_from(&path);
    assert!(loaded.monitor.interval_ms >= 100);
    assert_eq!(loaded.monitor.history_capacity, 1);
}

#[test]
fn test_import_export() {
    let temp_dir = TempDir::new().unwrap();
    let exported = temp_dir.path().join("export.json");

    let mut source = Config::default();
    source.auto_reboot_prompt = false;
    source.background_processes = vec!["game.exe".to_string()];
    source.export(&exported).unwrap();

    let mut target = Config::default();
    target.import(&exported).unwrap();
    assert_eq!(target, source);

    target.reset();
    assert_eq!(target, Config::default());
}

#[test]
fn test_import_rejects_invalid_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let mut config = Config::default();
    config.theme = Theme::System;
    assert!(config.import(&path).is_err());
    assert_eq!(config.theme, Theme::System, "Failed import must not change settings");
}

#[test]
fn test_partial_import_keeps_other_settings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("partial.json");
    std::fs::write(&path, r#"{"theme":"light","monitor":{"interval_ms":500}}"#).unwrap();

    let mut config = Config::default();
    config.auto_reboot_prompt = false;
    config.monitor.history_capacity = 30;
    config.import(&path).unwrap();

    assert_eq!(config.theme, Theme::Light);
    assert_eq!(config.monitor.interval_ms, 500);
    assert_eq!(config.monitor.history_capacity, 30);
    assert!(!config.auto_reboot_prompt);
}
