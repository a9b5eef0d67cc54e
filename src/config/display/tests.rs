use super::*;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn key_status_without_variable() {
    assert_eq!(key_status(None), "none");
}

#[test]
#[serial]
fn key_status_reports_presence() {
    let name = "STUDY_RAG_DISPLAY_TEST_KEY";

    // SAFETY: serialized with every other test that touches the environment
    unsafe { std::env::remove_var(name) };
    assert_eq!(key_status(Some(name)), format!("{} (not set)", name));

    // SAFETY: as above
    unsafe { std::env::set_var(name, "secret-value") };
    let status = key_status(Some(name));
    assert_eq!(status, format!("{} (set)", name));
    assert!(!status.contains("secret-value"));

    // SAFETY: as above
    unsafe { std::env::remove_var(name) };
}

#[test]
fn show_config_prints_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = Config::load(temp_dir.path()).expect("should load defaults");
    assert!(show_config(&config).is_ok());
}
