//! Configuration loading from TOML files and the process environment
//!
//! Config file is selected via the --config command line argument
//! (default: config/dev.toml). A missing or broken file falls back to
//! defaults. The platform identity values can always be supplied via
//! environment variables, which take precedence over the file:
//! IOTF_ORG, IOTF_ID, IOTF_AUTHTOKEN, IOTF_TYPE, plus PORT for the
//! keepalive HTTP listener base port.

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Offset added to the base port for the keepalive HTTP listener
const KEEPALIVE_PORT_OFFSET: u16 = 2;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlatformConfig {
    /// Platform organization id
    #[serde(default)]
    pub org: Option<String>,
    /// Device id the device was registered with
    #[serde(default)]
    pub id: Option<String>,
    /// Device auth token
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Device type the device was registered with
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// Broker host override; when unset the host is derived from the org
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    /// QoS level for publishes and the command subscription (0, 1 or 2)
    #[serde(default)]
    pub qos: u8,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self { host: None, port: default_broker_port(), qos: 0 }
    }
}

fn default_broker_port() -> u16 {
    1883
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    /// Interval between status publishes (milliseconds)
    #[serde(default = "default_publish_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { interval_ms: default_publish_interval_ms() }
    }
}

fn default_publish_interval_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Base port assigned by the platform; the keepalive listener binds
    /// base + 2
    #[serde(default = "default_http_base_port")]
    pub base_port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { base_port: default_http_base_port() }
    }
}

fn default_http_base_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    org: String,
    device_id: String,
    auth_token: String,
    device_type: String,
    broker_host: Option<String>,
    broker_port: u16,
    qos: u8,
    publish_interval_ms: u64,
    http_base_port: u16,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            org: String::new(),
            device_id: String::new(),
            auth_token: String::new(),
            device_type: String::new(),
            broker_host: None,
            broker_port: default_broker_port(),
            qos: 0,
            publish_interval_ms: default_publish_interval_ms(),
            http_base_port: default_http_base_port(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            org: toml_config.platform.org.unwrap_or_default(),
            device_id: toml_config.platform.id.unwrap_or_default(),
            auth_token: toml_config.platform.auth_token.unwrap_or_default(),
            device_type: toml_config.platform.device_type.unwrap_or_default(),
            broker_host: toml_config.mqtt.host,
            broker_port: toml_config.mqtt.port,
            qos: toml_config.mqtt.qos,
            publish_interval_ms: toml_config.publish.interval_ms,
            http_base_port: toml_config.http.base_port,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to
    /// defaults, then applies environment variable overrides
    pub fn load_from_path(path: &str) -> Self {
        let mut config = match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        };
        config.overlay_env(|name| env::var(name).ok());
        config
    }

    /// Apply environment overrides from a lookup function
    ///
    /// Identity values are never validated here; bad credentials are
    /// rejected by the broker at connect time.
    pub fn overlay_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(org) = lookup("IOTF_ORG") {
            self.org = org;
        }
        if let Some(id) = lookup("IOTF_ID") {
            self.device_id = id;
        }
        if let Some(token) = lookup("IOTF_AUTHTOKEN") {
            self.auth_token = token;
        }
        if let Some(device_type) = lookup("IOTF_TYPE") {
            self.device_type = device_type;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.http_base_port = port;
        }
    }

    /// Broker host: explicit override, or derived from the org id
    pub fn broker_host(&self) -> String {
        self.broker_host
            .clone()
            .unwrap_or_else(|| format!("{}.messaging.internetofthings.ibmcloud.com", self.org))
    }

    /// MQTT client id per the platform device convention
    pub fn client_id(&self) -> String {
        format!("d:{}:{}:{}", self.org, self.device_type, self.device_id)
    }

    /// Port for the keepalive HTTP listener
    pub fn keepalive_port(&self) -> u16 {
        self.http_base_port.saturating_add(KEEPALIVE_PORT_OFFSET)
    }

    // Getters for all config fields
    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn broker_port(&self) -> u16 {
        self.broker_port
    }

    /// QoS level; out-of-range values fall back to 0
    pub fn qos(&self) -> u8 {
        if self.qos <= 2 {
            self.qos
        } else {
            0
        }
    }

    pub fn publish_interval_ms(&self) -> u64 {
        self.publish_interval_ms
    }

    pub fn http_base_port(&self) -> u16 {
        self.http_base_port
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the platform identity
    #[cfg(test)]
    pub fn with_identity(mut self, org: &str, id: &str, token: &str, device_type: &str) -> Self {
        self.org = org.to_string();
        self.device_id = id.to_string();
        self.auth_token = token.to_string();
        self.device_type = device_type.to_string();
        self
    }
}
