//! `.env.example` file generation tests.

use lumibridge_core::{render_env_example, write_env_example, ConfigError};

#[test]
fn test_write_env_example_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".env.example");

    write_env_example(&path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, render_env_example());
}

#[test]
fn test_write_env_example_missing_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join(".env.example");

    let err = write_env_example(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("missing"));
}
