use clap::Parser;

use std::path::PathBuf;

use super::config::OnError;
use super::constants::{
    ENV_AWS_ENDPOINT, ENV_AWS_REGION, ENV_COLLECTOR_BATCH_SIZE, ENV_COLLECTOR_CONCURRENCY,
    ENV_CONFIG, ENV_HOST, ENV_METRICS_PATH, ENV_PORT, ENV_QUERY_DELAY_SECS, ENV_QUERY_PERIOD_SECS,
    ENV_QUERY_RANGE_SECS, ENV_QUERY_STAT, ENV_SCRAPE_ON_ERROR, ENV_TELEMETRY_ENABLED,
    ENV_TELEMETRY_HOST, ENV_TELEMETRY_PATH, ENV_TELEMETRY_PORT,
};

#[derive(Parser)]
#[command(name = "cloudwatch-exporter")]
#[command(version, about = "Prometheus exporter for AWS CloudWatch metrics", long_about = None)]
pub struct Cli {
    /// Server host address
    #[arg(long, short = 'H', env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path prefix under which CloudWatch metrics are exposed
    #[arg(long, env = ENV_METRICS_PATH)]
    pub metrics_path: Option<String>,

    /// Path to config file
    #[arg(long, short = 'c', env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Enable the exporter telemetry listener
    #[arg(long, env = ENV_TELEMETRY_ENABLED)]
    pub telemetry: Option<bool>,

    /// Telemetry listener host address
    #[arg(long, env = ENV_TELEMETRY_HOST)]
    pub telemetry_host: Option<String>,

    /// Telemetry listener port
    #[arg(long, env = ENV_TELEMETRY_PORT)]
    pub telemetry_port: Option<u16>,

    /// Telemetry metrics path
    #[arg(long, env = ENV_TELEMETRY_PATH)]
    pub telemetry_path: Option<String>,

    /// AWS region for CloudWatch (defaults to the AWS provider chain)
    #[arg(long, env = ENV_AWS_REGION)]
    pub aws_region: Option<String>,

    /// Custom CloudWatch endpoint URL
    #[arg(long, env = ENV_AWS_ENDPOINT)]
    pub aws_endpoint: Option<String>,

    /// Maximum value batches fetched at the same time per scrape
    #[arg(long, env = ENV_COLLECTOR_CONCURRENCY)]
    pub concurrency: Option<usize>,

    /// Identities per value batch (at most 500)
    #[arg(long, env = ENV_COLLECTOR_BATCH_SIZE)]
    pub batch_size: Option<usize>,

    /// Default query delay in seconds
    #[arg(long, env = ENV_QUERY_DELAY_SECS)]
    pub delay: Option<u32>,

    /// Default query range in seconds
    #[arg(long, env = ENV_QUERY_RANGE_SECS)]
    pub range: Option<u32>,

    /// Default aggregation period in seconds
    #[arg(long, env = ENV_QUERY_PERIOD_SECS)]
    pub period: Option<i32>,

    /// Default statistic (SampleCount, Average, Sum, Minimum, Maximum, pNN)
    #[arg(long, env = ENV_QUERY_STAT)]
    pub stat: Option<String>,

    /// Scrape behaviour when errors are signalled (continue or fail)
    #[arg(long, env = ENV_SCRAPE_ON_ERROR, value_parser = parse_on_error)]
    pub on_error: Option<OnError>,
}

/// Parse error mode from CLI/env string
fn parse_on_error(s: &str) -> Result<OnError, String> {
    match s.to_lowercase().as_str() {
        "continue" => Ok(OnError::Continue),
        "fail" => Ok(OnError::Fail),
        _ => Err(format!(
            "Invalid error mode '{}'. Valid options: continue, fail",
            s
        )),
    }
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub metrics_path: Option<String>,
    pub config: Option<PathBuf>,
    pub telemetry: Option<bool>,
    pub telemetry_host: Option<String>,
    pub telemetry_port: Option<u16>,
    pub telemetry_path: Option<String>,
    pub aws_region: Option<String>,
    pub aws_endpoint: Option<String>,
    pub concurrency: Option<usize>,
    pub batch_size: Option<usize>,
    pub delay: Option<u32>,
    pub range: Option<u32>,
    pub period: Option<i32>,
    pub stat: Option<String>,
    pub on_error: Option<OnError>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            metrics_path: cli.metrics_path,
            config: cli.config,
            telemetry: cli.telemetry,
            telemetry_host: cli.telemetry_host,
            telemetry_port: cli.telemetry_port,
            telemetry_path: cli.telemetry_path,
            aws_region: cli.aws_region,
            aws_endpoint: cli.aws_endpoint,
            concurrency: cli.concurrency,
            batch_size: cli.batch_size,
            delay: cli.delay,
            range: cli.range,
            period: cli.period,
            stat: cli.stat,
            on_error: cli.on_error,
        }
    }
}

/// Parse CLI arguments
pub fn parse() -> CliConfig {
    Cli::parse().into()
}
