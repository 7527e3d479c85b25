use std::fs;

use assert_matches::assert_matches;

use metagrate::config::{ConfigLoader, ConfigOverrides, DEFAULT_OUTPUT};
use metagrate::error::MetagrateError;

#[test]
fn load_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("metagrate.json");
    fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "rename_sites": false,
            "output": "merged.csv",
            "tag_categories": ["Other"],
            "allow_unmatched_template": true
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert!(!resolved.rename_sites);
    assert!(resolved.allow_unmatched_template);
    assert_eq!(resolved.tag_categories, vec!["Other".to_string()]);
    assert_eq!(resolved.output_path_or_default(), "merged.csv");
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, MetagrateError::ConfigRead(_));
}

#[test]
fn malformed_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("metagrate.json");
    fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, MetagrateError::ConfigParse(_));
}

#[test]
fn tag_category_override_replaces_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("metagrate.json");
    fs::write(&path, "{}").unwrap();

    let resolved = ConfigLoader::resolve(path.to_str())
        .unwrap()
        .apply(ConfigOverrides {
            tag_categories: vec!["Series".to_string()],
            ..ConfigOverrides::default()
        });
    assert!(resolved.rename_sites);
    assert_eq!(resolved.tag_categories, vec!["Series".to_string()]);
    assert_eq!(resolved.output_path_or_default(), DEFAULT_OUTPUT);
}

#[test]
fn unknown_schema_version_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("metagrate.json");
    fs::write(&path, r#"{ "schema_version": 7 }"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, MetagrateError::UnsupportedSchemaVersion { found: 7, .. });
}
