use std::collections::HashSet;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_MQTTS_PORT: u16 = 8883;
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 30;
/// Longest accepted status poll interval in minutes (one year).
pub const MAX_UPDATE_REQUEST: u64 = 365 * 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error parsing configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No mqtt server configured")]
    MissingBroker,
    #[error("Unsupported broker url scheme [{0}]")]
    UnsupportedScheme(String),
    #[error("Invalid broker url [{0}]")]
    InvalidBrokerUrl(String),
    #[error("Invalid broker port [{0}]")]
    InvalidPort(String),
    #[error("Accessory #{index} has no name")]
    MissingName { index: usize },
    #[error("Accessory name [{0}] is used more than once")]
    DuplicateName(String),
    #[error("Accessory [{accessory}] has an empty {field}")]
    EmptyTopic {
        accessory: String,
        field: &'static str,
    },
    #[error("Accessory [{accessory}] uses a wildcard status topic [{topic}]")]
    WildcardStatusTopic { accessory: String, topic: String },
    #[error("Accessory [{accessory}] has an update request interval of {minutes} minutes, at most {max} are supported", max = MAX_UPDATE_REQUEST)]
    InvalidUpdateRequest { accessory: String, minutes: u64 },
}

/// Platform section of the host configuration.
///
/// ```json
/// {
///     "platform": "GaradgetMQTT",
///     "mqtt_server": "mqtt://192.168.1.10",
///     "mqtt_user": "user",
///     "mqtt_pass": "secret",
///     "accessories": [
///         {
///             "name": "Garage",
///             "statusTopic": "garadget/garage/status",
///             "commandTopic": "garadget/garage/command",
///             "lightSensor": true,
///             "updateRequest": 5
///         }
///     ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlatformConfig {
    /// Broker url, e.g. `mqtt://host:1883` or `mqtts://host`
    pub mqtt_server: String,
    #[serde(default)]
    pub mqtt_user: Option<String>,
    #[serde(default)]
    pub mqtt_pass: Option<String>,
    #[serde(default)]
    pub mqtt_client_id: Option<String>,
    /// Seconds to wait for the broker to accept the connection, 0 waits forever
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default)]
    pub accessories: Vec<AccessoryConfig>,
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryConfig {
    pub name: String,
    pub status_topic: String,
    pub command_topic: String,
    #[serde(default)]
    pub light_sensor: bool,
    /// Minutes between status requests, 0 or absent disables polling
    #[serde(default)]
    pub update_request: Option<u64>,
}

impl AccessoryConfig {
    pub fn new(
        name: impl Into<String>,
        status_topic: impl Into<String>,
        command_topic: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status_topic: status_topic.into(),
            command_topic: command_topic.into(),
            light_sensor: false,
            update_request: None,
        }
    }

    pub fn light_sensor(mut self, light_sensor: bool) -> Self {
        self.light_sensor = light_sensor;
        self
    }

    pub fn update_request(mut self, minutes: u64) -> Self {
        self.update_request = Some(minutes);
        self
    }

    /// Poll period, `None` when polling is disabled or the interval is out of
    /// range.
    pub fn poll_interval(&self) -> Option<Duration> {
        match self.update_request {
            Some(minutes) if minutes > 0 && minutes <= MAX_UPDATE_REQUEST => {
                minutes.checked_mul(60).map(Duration::from_secs)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl BrokerAddress {
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingBroker);
        }

        let (tls, rest) = match url.split_once("://") {
            Some((scheme, rest)) => match scheme.to_ascii_lowercase().as_str() {
                "mqtt" | "tcp" => (false, rest),
                "mqtts" | "ssl" | "tls" => (true, rest),
                _ => return Err(ConfigError::UnsupportedScheme(scheme.to_string())),
            },
            None => (false, url),
        };

        // drop any path component
        let authority = rest.split('/').next().unwrap_or_default();

        let (userinfo, hostport) = match authority.rsplit_once('@') {
            Some((userinfo, hostport)) => (Some(userinfo), hostport),
            None => (None, authority),
        };
        let (username, password) = match userinfo {
            Some(userinfo) => match userinfo.split_once(':') {
                Some((user, pass)) => (Some(user.to_string()), Some(pass.to_string())),
                None => (Some(userinfo.to_string()), None),
            },
            None => (None, None),
        };

        let default_port = if tls {
            DEFAULT_MQTTS_PORT
        } else {
            DEFAULT_MQTT_PORT
        };

        let (host, port) = if let Some(bracketed) = hostport.strip_prefix('[') {
            // [ipv6]:port
            let (host, tail) = bracketed
                .split_once(']')
                .ok_or_else(|| ConfigError::InvalidBrokerUrl(url.to_string()))?;
            match tail.strip_prefix(':') {
                Some(port) => (host, parse_port(port)?),
                None if tail.is_empty() => (host, default_port),
                None => return Err(ConfigError::InvalidBrokerUrl(url.to_string())),
            }
        } else {
            match hostport.split_once(':') {
                Some((host, port)) => (host, parse_port(port)?),
                None => (hostport, default_port),
            }
        };

        if host.is_empty() {
            return Err(ConfigError::InvalidBrokerUrl(url.to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            tls,
            username,
            password,
        })
    }
}

fn parse_port(port: &str) -> Result<u16, ConfigError> {
    match port.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort(port.to_string())),
    }
}

impl PlatformConfig {
    pub fn new(mqtt_server: impl Into<String>) -> Self {
        Self {
            mqtt_server: mqtt_server.into(),
            mqtt_user: None,
            mqtt_pass: None,
            mqtt_client_id: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            accessories: Vec::new(),
        }
    }

    pub fn credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.mqtt_user = Some(user.into());
        self.mqtt_pass = Some(pass.into());
        self
    }

    pub fn connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout = seconds;
        self
    }

    pub fn accessory(mut self, accessory: AccessoryConfig) -> Self {
        self.accessories.push(accessory);
        self
    }

    /// Parses and validates the platform section of the host configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker()?;

        let mut names = HashSet::new();
        for (index, accessory) in self.accessories.iter().enumerate() {
            if accessory.name.trim().is_empty() {
                return Err(ConfigError::MissingName { index });
            }
            if !names.insert(accessory.name.as_str()) {
                return Err(ConfigError::DuplicateName(accessory.name.clone()));
            }
            if accessory.status_topic.is_empty() {
                return Err(ConfigError::EmptyTopic {
                    accessory: accessory.name.clone(),
                    field: "statusTopic",
                });
            }
            if accessory.command_topic.is_empty() {
                return Err(ConfigError::EmptyTopic {
                    accessory: accessory.name.clone(),
                    field: "commandTopic",
                });
            }
            if accessory.status_topic.contains(['+', '#']) {
                return Err(ConfigError::WildcardStatusTopic {
                    accessory: accessory.name.clone(),
                    topic: accessory.status_topic.clone(),
                });
            }
            if let Some(minutes) = accessory.update_request {
                if minutes > MAX_UPDATE_REQUEST {
                    return Err(ConfigError::InvalidUpdateRequest {
                        accessory: accessory.name.clone(),
                        minutes,
                    });
                }
            }
        }
        Ok(())
    }

    /// Broker address with the configured credentials applied. Explicit
    /// `mqtt_user`/`mqtt_pass` take precedence over credentials in the url.
    pub fn broker(&self) -> Result<BrokerAddress, ConfigError> {
        let mut broker = BrokerAddress::parse(&self.mqtt_server)?;
        if let Some(user) = &self.mqtt_user {
            broker.username = Some(user.clone());
            broker.password = self.mqtt_pass.clone();
        }
        Ok(broker)
    }

    pub fn connect_timeout_duration(&self) -> Option<Duration> {
        match self.connect_timeout {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }

    /// JSON schema of the platform configuration, for hosts that render a
    /// settings form from it.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(PlatformConfig)
    }
}
