//! Integration tests for configuration loading

use device_poc::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[platform]
org = "test-org"
id = "test-device"
auth_token = "test-token"
type = "test-type"

[mqtt]
host = "test-broker"
port = 1884
qos = 1

[publish]
interval_ms = 500

[http]
base_port = 9000
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.org(), "test-org");
    assert_eq!(config.device_id(), "test-device");
    assert_eq!(config.auth_token(), "test-token");
    assert_eq!(config.device_type(), "test-type");
    assert_eq!(config.broker_host(), "test-broker");
    assert_eq!(config.broker_port(), 1884);
    assert_eq!(config.qos(), 1);
    assert_eq!(config.publish_interval_ms(), 500);
    assert_eq!(config.http_base_port(), 9000);
    assert_eq!(config.keepalive_port(), 9002);
    assert_eq!(config.client_id(), "d:test-org:test-type:test-device");
}

#[test]
fn test_partial_file_uses_section_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[platform]
org = "partial-org"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.org(), "partial-org");
    assert_eq!(config.device_id(), "");
    assert_eq!(config.broker_port(), 1883);
    assert_eq!(config.qos(), 0);
    assert_eq!(config.publish_interval_ms(), 3000);
    assert_eq!(config.http_base_port(), 8080);
    assert_eq!(config.broker_host(), "partial-org.messaging.internetofthings.ibmcloud.com");
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.broker_port(), 1883);
    assert_eq!(config.qos(), 0);
    assert_eq!(config.publish_interval_ms(), 3000);
}

#[test]
fn test_env_overrides_file_identity() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[platform]
org = "file-org"
id = "file-device"
auth_token = "file-token"
type = "file-type"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let mut config = Config::from_file(temp_file.path()).unwrap();
    config.overlay_env(|name| match name {
        "IOTF_ORG" => Some("env-org".to_string()),
        "IOTF_AUTHTOKEN" => Some("env-token".to_string()),
        _ => None,
    });

    assert_eq!(config.org(), "env-org");
    assert_eq!(config.auth_token(), "env-token");
    // values without an env override keep the file values
    assert_eq!(config.device_id(), "file-device");
    assert_eq!(config.device_type(), "file-type");
}
