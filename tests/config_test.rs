use container_warden::{OrphanPolicy, Parser};
use std::time::Duration;

#[test]
fn test_parse_sample_config() {
    let parser = Parser::new();
    let config = parser
        .load_config("demos/warden.yaml")
        .expect("Failed to load sample config");

    config.validate_for_serve().expect("Config validation failed");

    assert_eq!(config.image_name, "ubuntu-tmate-sshx:latest");
    assert_eq!(config.cpu_limit, 2.0);
    assert_eq!(config.memory_limit, "4g");
    assert!(config.admin_ids.contains("123456789012345678"));
    assert_eq!(config.guild_id.as_deref(), Some("987654321098765432"));
    assert_eq!(config.endpoint_wait, Duration::from_secs(6));
    assert_eq!(config.create_cooldown, Duration::from_secs(10));
    assert_eq!(config.orphan_policy, OrphanPolicy::Report);
}

#[test]
fn test_missing_config_file_reports_path() {
    let err = Parser::new()
        .load_config("demos/does-not-exist.yaml")
        .expect_err("missing file must fail");

    assert!(err.to_string().contains("does-not-exist.yaml"));
    assert!(err.suggestion().is_some());
}

#[test]
fn test_malformed_memory_limit_is_rejected() {
    let config = Parser::new()
        .parse_config("image_name: img\nmemory_limit: lots\n")
        .unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("memory_limit"));
}
