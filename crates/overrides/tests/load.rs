use std::fs;

use overrides::{BindingSpec, Error, load_from_path};

#[test]
fn loads_ron_and_json_by_extension() {
    let dir = tempfile::tempdir().expect("tempdir");

    let ron_path = dir.path().join("overrides.ron");
    fs::write(&ron_path, r#"{"toggle_x": [], "say_all": [("KP_Add", 269, 0, 1)]}"#).expect("write");
    let loaded = load_from_path(&ron_path).expect("load ron");
    assert_eq!(loaded.map.len(), 2);

    let json_path = dir.path().join("overrides.json");
    fs::write(&json_path, r#"{"say_all": [["KP_Add", 269, 0, 1]]}"#).expect("write");
    let loaded = load_from_path(&json_path).expect("load json");
    assert_eq!(
        loaded.map.get("say_all"),
        Some(&[BindingSpec::new("KP_Add", 269, 0, 1)][..])
    );
}

#[test]
fn parse_errors_carry_the_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    fs::write(&path, "{\"x\": [").expect("write");
    let err = load_from_path(&path).expect_err("should fail");
    assert!(matches!(err, Error::Parse { .. }));
    assert_eq!(err.path(), Some(path.as_path()));
    assert!(err.pretty().contains("broken.json"));
}

#[test]
fn unsupported_extension_and_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("overrides.toml");
    fs::write(&path, "").expect("write");
    assert!(matches!(load_from_path(&path), Err(Error::Read { .. })));

    let missing = dir.path().join("nope.ron");
    assert!(matches!(load_from_path(&missing), Err(Error::Read { .. })));
}
