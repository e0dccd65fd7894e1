use super::{default_settings, load_settings, validate_settings, write_settings};

#[test]
fn defaults_are_valid() {
    let settings = default_settings();
    validate_settings(&settings).expect("default settings validate");
    assert_eq!(
        settings.job_parent(),
        "projects/openfoam-cloud/locations/europe-west6"
    );
}

#[test]
fn missing_file_loads_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let settings = load_settings(&dir.path().join("absent.json")).expect("load settings");
    assert_eq!(settings, default_settings());
}

#[test]
fn written_settings_load_back() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("nested").join("config.json");
    let mut settings = default_settings();
    settings.bucket_root = dir.path().join("bucket");
    settings.region = "us-central1".to_string();

    write_settings(&path, &settings).expect("write settings");
    let loaded = load_settings(&path).expect("load settings");

    assert_eq!(loaded, settings);
}

#[test]
fn rejects_unusable_settings() {
    let mut settings = default_settings();
    settings.schema_version = 9;
    assert!(validate_settings(&settings).is_err());

    let mut settings = default_settings();
    settings.mountpoint = "mnt/share".to_string();
    assert!(validate_settings(&settings).is_err());

    let mut settings = default_settings();
    settings.cpu_milli = 0;
    assert!(validate_settings(&settings).is_err());

    let mut settings = default_settings();
    settings.bucket = "  ".to_string();
    let err = validate_settings(&settings).expect_err("blank bucket");
    assert!(err.to_string().contains("bucket"));
}

#[test]
fn invalid_settings_file_fails_to_load() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, b"{\"schema_version\": 1}").expect("write settings");
    assert!(load_settings(&path).is_err());
}
