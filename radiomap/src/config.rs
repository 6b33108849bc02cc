use serde::Deserialize;
use std::fs::File;

#[derive(Deserialize)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Deserialize)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub gateway: gateway::config::Config,
    pub aggregator: aggregator::config::Config,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.gateway.validate()?;
        config.aggregator.validate()?;

        Ok(config)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid gateway config: {0}")]
    InvalidGateway(#[from] gateway::config::ValidationError),
    #[error("invalid aggregator config: {0}")]
    InvalidAggregator(#[from] aggregator::config::ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::config::RelayPolicy;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            logging:
                sentry_dsn: https://key@sentry.example.net/1
            gateway:
                listener:
                    host: 0.0.0.0
                    port: 8080
                relay:
                    url: https://relay.example.net/v2/geosubmit
                    policy: local_first
            aggregator:
                database:
                    path: ./hexes.sqlite
                cell_resolution: 11
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.common.metrics.unwrap().statsd_port, 8125);
        assert_eq!(config.gateway.relay.policy, RelayPolicy::LocalFirst);
        assert_eq!(config.aggregator.cell_resolution, 11);
    }

    #[test]
    fn test_minimal_config() {
        let yaml = r#"
            gateway:
                listener:
                    host: 127.0.0.1
                    port: 8080
                relay:
                    url: https://relay.example.net/v2/geosubmit
            aggregator:
                database:
                    path: ./hexes.sqlite
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert!(config.common.metrics.is_none());
        assert!(config.common.logging.is_none());
        assert_eq!(config.aggregator.cell_resolution, 10);
    }

    #[test]
    fn test_invalid_section_fails_load() {
        let yaml = r#"
            gateway:
                listener:
                    host: 127.0.0.1
                    port: 0
                relay:
                    url: https://relay.example.net/v2/geosubmit
            aggregator:
                database:
                    path: ./hexes.sqlite
            "#;
        let tmp = write_tmp_file(yaml);
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::InvalidGateway(_))
        ));
    }
}
