use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::exporter::query::Statistic;

use super::cli::CliConfig;
use super::constants::{
    CLOUDWATCH_MAX_QUERIES_PER_REQUEST, CONFIG_FILE_NAME, DEFAULT_COLLECTOR_BATCH_SIZE,
    DEFAULT_COLLECTOR_CONCURRENCY, DEFAULT_HOST, DEFAULT_METRICS_PATH, DEFAULT_PORT,
    DEFAULT_QUERY_DELAY_SECS, DEFAULT_QUERY_PERIOD_SECS, DEFAULT_QUERY_RANGE_SECS,
    DEFAULT_QUERY_STAT, DEFAULT_TELEMETRY_PATH, DEFAULT_TELEMETRY_PORT,
};

// =============================================================================
// Scrape Error Mode
// =============================================================================

/// What a scrape answers when errors were signalled during collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Render whatever was collected, plus the error count gauge
    #[default]
    Continue,
    /// Answer 500 with the error messages
    Fail,
}

impl fmt::Display for OnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnError::Continue => write!(f, "continue"),
            OnError::Fail => write!(f, "fail"),
        }
    }
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub metrics_path: Option<String>,
}

/// Telemetry listener section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TelemetryFileConfig {
    pub enabled: Option<bool>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
}

/// AWS section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AwsFileConfig {
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

/// Collector section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CollectorFileConfig {
    pub concurrency: Option<usize>,
    pub batch_size: Option<usize>,
}

/// Query defaults section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueryFileConfig {
    pub delay_secs: Option<u32>,
    pub range_secs: Option<u32>,
    pub period_secs: Option<i32>,
    pub stat: Option<String>,
}

/// Scrape section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ScrapeFileConfig {
    pub on_error: Option<OnError>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub telemetry: Option<TelemetryFileConfig>,
    pub aws: Option<AwsFileConfig>,
    pub collector: Option<CollectorFileConfig>,
    pub query: Option<QueryFileConfig>,
    pub scrape: Option<ScrapeFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                current.host = server.host;
            }
            if server.port.is_some() {
                current.port = server.port;
            }
            if server.metrics_path.is_some() {
                current.metrics_path = server.metrics_path;
            }
        }

        if let Some(telemetry) = other.telemetry {
            let current = self
                .telemetry
                .get_or_insert_with(TelemetryFileConfig::default);
            if telemetry.enabled.is_some() {
                current.enabled = telemetry.enabled;
            }
            if telemetry.host.is_some() {
                current.host = telemetry.host;
            }
            if telemetry.port.is_some() {
                current.port = telemetry.port;
            }
            if telemetry.path.is_some() {
                current.path = telemetry.path;
            }
        }

        if let Some(aws) = other.aws {
            let current = self.aws.get_or_insert_with(AwsFileConfig::default);
            if aws.region.is_some() {
                current.region = aws.region;
            }
            if aws.endpoint.is_some() {
                current.endpoint = aws.endpoint;
            }
        }

        if let Some(collector) = other.collector {
            let current = self
                .collector
                .get_or_insert_with(CollectorFileConfig::default);
            if collector.concurrency.is_some() {
                current.concurrency = collector.concurrency;
            }
            if collector.batch_size.is_some() {
                current.batch_size = collector.batch_size;
            }
        }

        if let Some(query) = other.query {
            let current = self.query.get_or_insert_with(QueryFileConfig::default);
            if query.delay_secs.is_some() {
                current.delay_secs = query.delay_secs;
            }
            if query.range_secs.is_some() {
                current.range_secs = query.range_secs;
            }
            if query.period_secs.is_some() {
                current.period_secs = query.period_secs;
            }
            if query.stat.is_some() {
                current.stat = query.stat;
            }
        }

        if let Some(scrape) = other.scrape {
            let current = self.scrape.get_or_insert_with(ScrapeFileConfig::default);
            if scrape.on_error.is_some() {
                current.on_error = scrape.on_error;
            }
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Scrape listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix of scrape paths, starts and ends with `/`
    pub metrics_path: String,
}

/// Telemetry listener configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// CloudWatch client configuration
#[derive(Debug, Clone, Default)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

/// Batch fan-out configuration
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub concurrency: usize,
    pub batch_size: usize,
}

/// Defaults for scrape query parameters
#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub delay_secs: u32,
    pub range_secs: u32,
    pub period_secs: i32,
    pub stat: Statistic,
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub on_error: OnError,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub aws: AwsConfig,
    pub collector: CollectorConfig,
    pub query: QueryConfig,
    pub scrape: ScrapeConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Local directory config OR CLI-specified config path
    /// 3. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();

        let config_path = if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = config_path {
            let overlay = FileConfig::load_from_file(&path)?;
            overlay.warn_unknown_fields();
            file_config.merge(overlay);
            tracing::debug!(path = %path.display(), "Config file loaded");
        }

        Self::from_layers(cli, file_config)
    }

    /// Layer defaults -> file config -> CLI/env overrides, then validate
    fn from_layers(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_telemetry = file_config.telemetry.unwrap_or_default();
        let file_aws = file_config.aws.unwrap_or_default();
        let file_collector = file_config.collector.unwrap_or_default();
        let file_query = file_config.query.unwrap_or_default();
        let file_scrape = file_config.scrape.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let server = ServerConfig {
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
            metrics_path: cli
                .metrics_path
                .clone()
                .or(file_server.metrics_path)
                .unwrap_or_else(|| DEFAULT_METRICS_PATH.to_string()),
            host: host.clone(),
        };

        // Telemetry listens on the scrape host unless told otherwise
        let telemetry = TelemetryConfig {
            enabled: cli.telemetry.or(file_telemetry.enabled).unwrap_or(true),
            host: cli
                .telemetry_host
                .clone()
                .or(file_telemetry.host)
                .unwrap_or(host),
            port: cli
                .telemetry_port
                .or(file_telemetry.port)
                .unwrap_or(DEFAULT_TELEMETRY_PORT),
            path: cli
                .telemetry_path
                .clone()
                .or(file_telemetry.path)
                .unwrap_or_else(|| DEFAULT_TELEMETRY_PATH.to_string()),
        };

        let aws = AwsConfig {
            region: cli.aws_region.clone().or(file_aws.region),
            endpoint: cli.aws_endpoint.clone().or(file_aws.endpoint),
        };

        let collector = CollectorConfig {
            concurrency: cli
                .concurrency
                .or(file_collector.concurrency)
                .unwrap_or(DEFAULT_COLLECTOR_CONCURRENCY),
            batch_size: cli
                .batch_size
                .or(file_collector.batch_size)
                .unwrap_or(DEFAULT_COLLECTOR_BATCH_SIZE),
        };

        let stat_str = cli
            .stat
            .clone()
            .or(file_query.stat)
            .unwrap_or_else(|| DEFAULT_QUERY_STAT.to_string());
        let stat = match stat_str.parse::<Statistic>() {
            Ok(stat) => stat,
            Err(_) => anyhow::bail!(
                "Configuration error: query.stat '{}' is not a valid statistic",
                stat_str
            ),
        };

        let query = QueryConfig {
            delay_secs: cli
                .delay
                .or(file_query.delay_secs)
                .unwrap_or(DEFAULT_QUERY_DELAY_SECS),
            range_secs: cli
                .range
                .or(file_query.range_secs)
                .unwrap_or(DEFAULT_QUERY_RANGE_SECS),
            period_secs: cli
                .period
                .or(file_query.period_secs)
                .unwrap_or(DEFAULT_QUERY_PERIOD_SECS),
            stat,
        };

        let scrape = ScrapeConfig {
            on_error: cli.on_error.or(file_scrape.on_error).unwrap_or_default(),
        };

        let config = AppConfig {
            server,
            telemetry,
            aws,
            collector,
            query,
            scrape,
        };

        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            metrics_path = %config.server.metrics_path,
            telemetry = config.telemetry.enabled,
            concurrency = config.collector.concurrency,
            batch_size = config.collector.batch_size,
            on_error = %config.scrape.on_error,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        let path = &self.server.metrics_path;
        if path.len() < 2 || !path.starts_with('/') || !path.ends_with('/') {
            anyhow::bail!(
                "Configuration error: server.metrics_path ({}) must start and end with '/' and not be '/'",
                path
            );
        }

        if self.telemetry.enabled {
            if self.telemetry.host.is_empty() {
                anyhow::bail!("Configuration error: telemetry.host must not be empty");
            }
            if self.telemetry.port == 0 {
                anyhow::bail!("Configuration error: telemetry.port must be greater than 0");
            }
            if !self.telemetry.path.starts_with('/') {
                anyhow::bail!(
                    "Configuration error: telemetry.path ({}) must start with '/'",
                    self.telemetry.path
                );
            }

            let shared_host = self.server.host == self.telemetry.host
                || is_all_interfaces(&self.server.host)
                || is_all_interfaces(&self.telemetry.host);
            if shared_host && self.server.port == self.telemetry.port {
                anyhow::bail!(
                    "Configuration error: server.port ({}) and telemetry.port ({}) cannot be the same",
                    self.server.port,
                    self.telemetry.port
                );
            }
        }

        if self.collector.concurrency == 0 {
            anyhow::bail!("Configuration error: collector.concurrency must be greater than 0");
        }
        if self.collector.batch_size == 0
            || self.collector.batch_size > CLOUDWATCH_MAX_QUERIES_PER_REQUEST
        {
            anyhow::bail!(
                "Configuration error: collector.batch_size must be between 1 and {}",
                CLOUDWATCH_MAX_QUERIES_PER_REQUEST
            );
        }

        if self.query.delay_secs == 0 {
            anyhow::bail!("Configuration error: query.delay_secs must be greater than 0");
        }
        if self.query.range_secs == 0 {
            anyhow::bail!("Configuration error: query.range_secs must be greater than 0");
        }
        if self.query.period_secs <= 0 {
            anyhow::bail!("Configuration error: query.period_secs must be greater than 0");
        }

        if self.collector.concurrency > 50 {
            tracing::warn!(
                concurrency = self.collector.concurrency,
                "collector.concurrency is high, CloudWatch may throttle GetMetricData calls"
            );
        }

        Ok(())
    }
}

/// Check if host binds to all network interfaces
fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}
