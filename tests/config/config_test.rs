//! Coverage for config parsing, validation, and path resolution.

use std::io::Write;

use experiments::config::{config_dir, load_config, Config, ConfigError, RegistryConfig};
use experiments::registry::{Registry, TokenPolicy, CORE_MODULES};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn default_registry_config_is_core_and_owner() {
    let registry = RegistryConfig::default();
    assert_eq!(registry.allow_list, CORE_MODULES);
    assert_eq!(registry.token_policy, TokenPolicy::Owner);
}

#[test]
fn config_dir_resolves() {
    let dir = config_dir();
    assert!(dir.is_ok());
    let path = match dir {
        Ok(path) => path,
        Err(err) => panic!("config dir should resolve: {err}"),
    };
    assert!(path.ends_with(".experiments"));
}

#[test]
fn load_minimal_config() {
    let file = write_config(
        r#"
[registry]
allow_list = ["core-a", "core-b"]
"#,
    );
    let config = match load_config(file.path()) {
        Ok(config) => config,
        Err(err) => panic!("minimal config should load: {err}"),
    };
    assert_eq!(config.registry.allow_list, vec!["core-a", "core-b"]);
    assert_eq!(config.registry.token_policy, TokenPolicy::Owner);
    assert_eq!(config.logging.level, "info");

    let registry = Registry::from_config(&config.registry);
    assert!(registry.mint("core-a").is_ok());
    assert!(registry.mint("@wordpress/data").is_err());
}

#[test]
fn load_rejects_invalid_allow_list() {
    let file = write_config(
        r#"
[registry]
allow_list = ["core-a", "core-a"]
"#,
    );
    let err = load_config(file.path()).expect_err("duplicate should fail");
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn load_rejects_unknown_policy() {
    let file = write_config(
        r#"
[registry]
token_policy = "everyone"
"#,
    );
    let err = load_config(file.path()).expect_err("unknown policy should fail");
    assert!(err.to_string().contains("failed to parse config"));
}

#[test]
fn load_missing_file_reports_path() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("absent.toml");
    let err = load_config(&path).expect_err("missing file");
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn validate_reports_blank_entry_index() {
    let mut config = Config::default();
    config.registry.allow_list = vec!["core-a".to_owned(), String::new()];
    assert_eq!(config.validate(), Err(ConfigError::BlankModule { index: 1 }));
}
