use super::*;
use tempfile::tempdir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.executable, "ast-grep");
    assert!(settings.log_filter.is_none());
    assert_eq!(settings.display.elide_after, 30);
    assert_eq!(settings.display.context_before, 25);
    assert_eq!(settings.display.context_after, 50);
}

#[test]
fn test_write_default_then_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(".zsg").join("setting.json");

    write_default_if_missing(&path).unwrap();
    assert!(path.exists());
    assert_eq!(load_settings_from(&path).unwrap(), Settings::default());
}

#[test]
fn test_existing_file_not_overwritten() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("setting.json");
    std::fs::write(&path, r#"{"executable":"sg"}"#).unwrap();

    write_default_if_missing(&path).unwrap();
    assert_eq!(load_settings_from(&path).unwrap().executable, "sg");
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("setting.json");
    std::fs::write(
        &path,
        r#"{"log_filter":"zsg=debug","display":{"elide_after":10}}"#,
    )
    .unwrap();

    let settings = load_settings_from(&path).unwrap();
    assert_eq!(settings.executable, "ast-grep");
    assert_eq!(settings.log_filter.as_deref(), Some("zsg=debug"));
    assert_eq!(settings.display.elide_after, 10);
    assert_eq!(settings.display.context_after, 50);
}

#[test]
fn test_invalid_json_is_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("setting.json");
    std::fs::write(&path, "{not json").unwrap();

    assert!(matches!(
        load_settings_from(&path),
        Err(SettingsError::Parse(_))
    ));
    assert!(matches!(
        load_settings_from(&dir.path().join("missing.json")),
        Err(SettingsError::Io(_))
    ));
}
