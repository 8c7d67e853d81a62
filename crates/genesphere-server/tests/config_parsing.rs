use std::{env, fs};

use genesphere_server::AppConfig;
use genesphere_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    // Create a temporary TOML configuration file
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("genesphere.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081

[logging]
level = "debug"

[redis]
enabled = true
url = "redis://cache.internal:6379"
pool_size = 4

[cache]
ttl_secs = 3600
lock_wait_ms = 1000

[storage]
seed_path = "data/genes.json"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses; omitted keys keep their defaults
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.logging.level, "debug");
    assert!(cfg.redis.enabled);
    assert_eq!(cfg.redis.pool_size, 4);
    assert_eq!(cfg.redis.timeout_ms, 5000);
    assert_eq!(cfg.cache.ttl_secs, 3600);
    assert_eq!(cfg.cache.lock_wait_ms, 1000);
    assert_eq!(cfg.cache.lock_lease_ms, 10_000);
    assert_eq!(cfg.cache.delete_batch_size, 1000);
    assert_eq!(cfg.storage.seed_path.as_deref(), Some("data/genes.json"));

    // 2) Env override should win over file
    unsafe {
        env::set_var("GENESPHERE__CACHE__TTL_SECS", "60");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.cache.ttl_secs, 60);
    // cleanup env var
    unsafe {
        env::remove_var("GENESPHERE__CACHE__TTL_SECS");
    }

    // 3) A lock lease no longer than the lock wait is rejected
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[cache]
lock_wait_ms = 5000
lock_lease_ms = 3000
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("lock_lease_ms must be greater"));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");

    let cfg = load_config(path.to_str()).expect("defaults are valid");

    assert!(!cfg.redis.enabled);
    assert_eq!(cfg.cache.max_scan_keys, 50_000);
    assert!(cfg.storage.seed_path.is_none());
}

#[test]
fn written_config_loads_back() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("roundtrip.toml");

    let mut cfg = AppConfig::default();
    cfg.server.port = 9090;
    cfg.cache.contention_retry_ms = 250;
    fs::write(&path, toml::to_string(&cfg).expect("serialize")).expect("write toml");

    let loaded = load_config(path.to_str()).expect("should parse written config");
    assert_eq!(loaded.server.port, 9090);
    assert_eq!(loaded.cache.contention_retry_ms, 250);
}

#[test]
fn invalid_log_level_is_rejected() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("bad-level.toml");
    fs::write(&path, "[logging]\nlevel = \"loud\"\n").expect("write toml");

    let err = load_config(path.to_str()).expect_err("expected validation error");
    assert!(err.contains("logging.level"));
}
