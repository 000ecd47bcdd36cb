use affiliate_proxy::config::{Config as ProxyConfig, ValidationError};
use serde::Deserialize;
use std::fs::File;

#[derive(Debug, Deserialize)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

fn default_metrics_prefix() -> String {
    "affiliate_gateway".into()
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    pub sentry_dsn: Option<String>,
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Default, Deserialize)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub proxy: ProxyConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data: Self = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Loads the file, applies credential overrides from the environment and
    /// validates the result.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.proxy.credentials.overlay_env();
        config.proxy.validate()?;

        Ok(config)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    ValidationError(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use affiliate_proxy::config::UpstreamMethod;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn gateway_config() {
        let yaml = r#"
            logging:
                sentry_dsn: https://public@sentry.example.com/1
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            proxy:
                listener:
                    host: 0.0.0.0
                    port: 10000
                upstream:
                    url: https://api-sg.aliexpress.com/sync
                    method: GET
                credentials:
                    tracking_id: gateway
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        let logging = config.common.logging.expect("logging config");
        assert_eq!(
            logging.sentry_dsn.as_deref(),
            Some("https://public@sentry.example.com/1")
        );
        assert_eq!(logging.level, "info");

        let metrics = config.common.metrics.expect("metrics config");
        assert_eq!(metrics.statsd_port, 8125);
        assert_eq!(metrics.prefix, "affiliate_gateway");

        assert_eq!(config.proxy.listener.port, 10000);
        assert_eq!(config.proxy.upstream.method, UpstreamMethod::Get);
        assert_eq!(
            config.proxy.credentials.tracking_id.as_deref(),
            Some("gateway")
        );
        assert!(config.proxy.validate().is_ok());
    }

    #[test]
    fn minimal_config() {
        let tmp = write_tmp_file("proxy: {}\n");
        let config = Config::from_file(tmp.path()).expect("load config");
        assert!(config.common.metrics.is_none());
        assert!(config.common.logging.is_none());
        assert_eq!(config.proxy.default_query, "wireless earbuds");
    }

    #[test]
    fn invalid_config() {
        let tmp = write_tmp_file("proxy:\n  listener: {host: 0.0.0.0, port: 0}\n");
        assert!(matches!(
            Config::load(tmp.path()),
            Err(ConfigError::ValidationError(ValidationError::InvalidPort))
        ));

        let tmp = write_tmp_file("metrics: {statsd_host: localhost}\nproxy: {}\n");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));

        assert!(matches!(
            Config::from_file(std::path::Path::new("/nonexistent/gateway.yaml")),
            Err(ConfigError::LoadError(_))
        ));
    }
}
