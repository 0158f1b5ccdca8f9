// tests/config_env.rs
//
// Config resolution: file selection and env overrides. These mutate process
// env, so they run serially.

use std::env;
use std::fs;

use livability_scores::config::{
    AppConfig, ConfigError, LogFormat, StoreKind, ENV_CONFIG_PATH, ENV_LOG_FORMAT, ENV_METRICS,
    ENV_PORT, ENV_STORE_KIND, ENV_STORE_PATH,
};

fn clear_env() {
    for k in [
        ENV_CONFIG_PATH,
        ENV_PORT,
        ENV_STORE_PATH,
        ENV_STORE_KIND,
        ENV_LOG_FORMAT,
        ENV_METRICS,
    ] {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn env_path_wins_and_overrides_apply() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("svc.toml");
    fs::write(&path, "[server]\nport = 7000\n[store]\npath = \"a.csv\"\n").unwrap();

    env::set_var(ENV_CONFIG_PATH, path.display().to_string());
    let cfg = AppConfig::load().unwrap();
    assert_eq!(cfg.server.port, 7000);
    assert_eq!(cfg.store.path.to_str(), Some("a.csv"));

    env::set_var(ENV_PORT, "9090");
    env::set_var(ENV_STORE_KIND, "json");
    env::set_var(ENV_STORE_PATH, "b.json");
    env::set_var(ENV_LOG_FORMAT, "json");
    env::set_var(ENV_METRICS, "0");
    let cfg = AppConfig::load().unwrap();
    assert_eq!(cfg.server.port, 9090);
    assert_eq!(cfg.store.kind, StoreKind::Json);
    assert_eq!(cfg.store.path.to_str(), Some("b.json"));
    assert_eq!(cfg.logging.format, LogFormat::Json);
    assert!(!cfg.metrics.enabled);

    clear_env();
}

#[serial_test::serial]
#[test]
fn bad_env_values_are_reported() {
    clear_env();
    env::set_var(ENV_PORT, "not-a-port");
    assert!(matches!(
        AppConfig::load(),
        Err(ConfigError::Env { name: "PORT", .. })
    ));
    clear_env();

    env::set_var(ENV_CONFIG_PATH, "/definitely/missing.toml");
    assert!(matches!(AppConfig::load(), Err(ConfigError::MissingFile(_))));
    clear_env();
}

#[serial_test::serial]
#[test]
fn bundled_config_file_parses() {
    clear_env();
    let cfg = AppConfig::from_path(std::path::Path::new("config/livability.toml")).unwrap();
    assert_eq!(cfg.server.port, 5000);
    assert_eq!(cfg.tiers.high, 0.64);
    assert_eq!(cfg.tiers.medium, 0.31);
}
