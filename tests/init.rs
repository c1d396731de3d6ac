use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_churnmap"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "churnmap init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".churnmap.toml");
    assert!(config_path.exists(), ".churnmap.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[scoring]"));
    assert!(content.contains("[bus_factor]"));

    // Everything is commented out, so it parses to the defaults.
    let config: churnmap_core::ChurnmapConfig = toml::from_str(&content).unwrap();
    assert_eq!(config, churnmap_core::ChurnmapConfig::default());
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".churnmap.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_churnmap"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".churnmap.toml")).unwrap();
    assert_eq!(content, "# existing");
}
