use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use crate::bridge::DEFAULT_PREFIX;
use crate::error::{ExporterError, Result};

/// Host property holding the metric name prefix.
pub const PREFIX_PROPERTY: &str = "external.kafka.prometheus.prefix";
/// Host property holding the listen port.
pub const PORT_PROPERTY: &str = "external.kafka.prometheus.port";
/// Host property holding the listen address.
pub const HOST_PROPERTY: &str = "external.kafka.prometheus.host";
/// Host property holding the request head read timeout, in milliseconds.
pub const READ_TIMEOUT_PROPERTY: &str = "external.kafka.prometheus.read.timeout.ms";

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "./config.yaml";
/// Prefix of environment variables overriding the configuration.
pub const ENV_PREFIX: &str = "EXPORTER_";

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5000;

/// Settings read once at startup.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ExporterConfig {
    /// Prepended to every exported metric name.
    pub prefix: String,
    pub port: u16,
    pub bind_host: String,
    /// Time a connection gets to send a complete request head. 0 disables it.
    pub read_timeout_ms: u64,
    pub logging: LoggingConfig,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            prefix: DEFAULT_PREFIX.to_string(),
            port: DEFAULT_PORT,
            bind_host: "0.0.0.0".to_string(),
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            logging: LoggingConfig::default(),
        }
    }
}

impl ExporterConfig {
    /// Layered sources: defaults, then the YAML file, then `EXPORTER_*` variables.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(ExporterConfig::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::figment(path)
            .extract()
            .map_err(|e| ExporterError::Config(e.to_string()))
    }

    /// Builds the configuration from the host's flat property map.
    ///
    /// Keys that are absent keep their defaults.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let mut config = ExporterConfig::default();

        if let Some(prefix) = props.get(PREFIX_PROPERTY) {
            config.prefix = prefix.trim().to_string();
        }
        if let Some(port) = props.get(PORT_PROPERTY) {
            config.port = port.trim().parse().map_err(|_| {
                ExporterError::Config(format!("{} must be a port number, got '{}'", PORT_PROPERTY, port))
            })?;
        }
        if let Some(host) = props.get(HOST_PROPERTY) {
            config.bind_host = host.trim().to_string();
        }
        if let Some(timeout) = props.get(READ_TIMEOUT_PROPERTY) {
            config.read_timeout_ms = timeout.trim().parse().map_err(|_| {
                ExporterError::Config(format!(
                    "{} must be a number of milliseconds, got '{}'",
                    READ_TIMEOUT_PROPERTY, timeout
                ))
            })?;
        }

        Ok(config)
    }

    /// Socket address the server listens on.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind_host.parse().map_err(|_| {
            ExporterError::Config(format!("bind_host '{}' is not an IP address", self.bind_host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        match self.read_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(ExporterConfig);
    match serde_json::to_string_pretty(&schema) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Could not render configuration schema: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_the_broker_conventions() {
        let config = ExporterConfig::default();
        assert_eq!(config.prefix, "kafka_broker");
        assert_eq!(config.port, 8000);
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.bind_address().unwrap(), "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn properties_override_defaults() {
        let props = HashMap::from([
            (PREFIX_PROPERTY.to_string(), "edge_broker".to_string()),
            (PORT_PROPERTY.to_string(), " 9404 ".to_string()),
        ]);
        let config = ExporterConfig::from_properties(&props).unwrap();
        assert_eq!(config.prefix, "edge_broker");
        assert_eq!(config.port, 9404);
        assert_eq!(config.bind_host, "0.0.0.0");
    }

    #[test]
    fn read_timeout_property_is_parsed() {
        let props = HashMap::from([(READ_TIMEOUT_PROPERTY.to_string(), "250".to_string())]);
        let config = ExporterConfig::from_properties(&props).unwrap();
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(250)));

        let props = HashMap::from([(READ_TIMEOUT_PROPERTY.to_string(), "0".to_string())]);
        assert_eq!(ExporterConfig::from_properties(&props).unwrap().read_timeout(), None);

        let props = HashMap::from([(READ_TIMEOUT_PROPERTY.to_string(), "soon".to_string())]);
        assert!(matches!(
            ExporterConfig::from_properties(&props),
            Err(ExporterError::Config(msg)) if msg.contains(READ_TIMEOUT_PROPERTY)
        ));
    }

    #[test]
    fn empty_properties_give_defaults() {
        let config = ExporterConfig::from_properties(&HashMap::new()).unwrap();
        assert_eq!(config, ExporterConfig::default());
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let props = HashMap::from([(PORT_PROPERTY.to_string(), "eighty".to_string())]);
        let err = ExporterConfig::from_properties(&props).unwrap_err();
        assert!(matches!(err, ExporterError::Config(msg) if msg.contains(PORT_PROPERTY)));
    }

    #[test]
    fn invalid_bind_host_is_rejected() {
        let config = ExporterConfig {
            bind_host: "not-an-ip".to_string(),
            ..ExporterConfig::default()
        };
        assert!(matches!(config.bind_address(), Err(ExporterError::Config(_))));
    }

    #[test]
    fn file_and_environment_are_layered() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
prefix: "yaml_broker"
port: 9000
logging:
  level: "debug"
"#,
            )?;
            jail.set_env("EXPORTER_PORT", "9100");
            jail.set_env("EXPORTER_LOGGING__FORMAT", "json");

            let config = ExporterConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.prefix, "yaml_broker");
            assert_eq!(config.port, 9100);
            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.logging.format, "json");
            assert_eq!(config.bind_host, "0.0.0.0");
            Ok(())
        });
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let config = ExporterConfig::load(Some(Path::new("absent.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(config, ExporterConfig::default());
            Ok(())
        });
    }

    #[test]
    fn malformed_port_in_file_is_a_config_error() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "port: \"high\"\n")?;
            assert!(matches!(ExporterConfig::load(None), Err(ExporterError::Config(_))));
            Ok(())
        });
    }
}
