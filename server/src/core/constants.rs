// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "CloudWatch Exporter";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "cloudwatch-exporter";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name (looked up in the working directory)
pub const CONFIG_FILE_NAME: &str = "cloudwatch-exporter.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "CLOUDWATCH_EXPORTER_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "CLOUDWATCH_EXPORTER_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "CLOUDWATCH_EXPORTER_PORT";

/// Environment variable for the scrape path prefix
pub const ENV_METRICS_PATH: &str = "CLOUDWATCH_EXPORTER_METRICS_PATH";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "CLOUDWATCH_EXPORTER_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_PORT: u16 = 9106;

/// Default scrape path prefix
pub const DEFAULT_METRICS_PATH: &str = "/metrics/";

/// Content type of scrape and telemetry responses
pub const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

// =============================================================================
// Telemetry Listener
// =============================================================================

pub const ENV_TELEMETRY_ENABLED: &str = "CLOUDWATCH_EXPORTER_TELEMETRY_ENABLED";
pub const ENV_TELEMETRY_HOST: &str = "CLOUDWATCH_EXPORTER_TELEMETRY_HOST";
pub const ENV_TELEMETRY_PORT: &str = "CLOUDWATCH_EXPORTER_TELEMETRY_PORT";
pub const ENV_TELEMETRY_PATH: &str = "CLOUDWATCH_EXPORTER_TELEMETRY_PATH";

/// Default telemetry port
pub const DEFAULT_TELEMETRY_PORT: u16 = 8080;

/// Default telemetry path
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";

// =============================================================================
// AWS
// =============================================================================

/// Environment variable for the CloudWatch region (overrides the AWS provider chain)
pub const ENV_AWS_REGION: &str = "CLOUDWATCH_EXPORTER_AWS_REGION";

/// Environment variable for a custom CloudWatch endpoint (LocalStack etc.)
pub const ENV_AWS_ENDPOINT: &str = "CLOUDWATCH_EXPORTER_AWS_ENDPOINT";

/// Maximum number of metric data queries in one GetMetricData request
pub const CLOUDWATCH_MAX_QUERIES_PER_REQUEST: usize = 500;

// =============================================================================
// Collector
// =============================================================================

pub const ENV_COLLECTOR_CONCURRENCY: &str = "CLOUDWATCH_EXPORTER_CONCURRENCY";
pub const ENV_COLLECTOR_BATCH_SIZE: &str = "CLOUDWATCH_EXPORTER_BATCH_SIZE";

/// Default number of value batches fetched at the same time per scrape
pub const DEFAULT_COLLECTOR_CONCURRENCY: usize = 10;

/// Default number of identities per value batch
pub const DEFAULT_COLLECTOR_BATCH_SIZE: usize = CLOUDWATCH_MAX_QUERIES_PER_REQUEST;

// =============================================================================
// Query Defaults
// =============================================================================

pub const ENV_QUERY_DELAY_SECS: &str = "CLOUDWATCH_EXPORTER_QUERY_DELAY";
pub const ENV_QUERY_RANGE_SECS: &str = "CLOUDWATCH_EXPORTER_QUERY_RANGE";
pub const ENV_QUERY_PERIOD_SECS: &str = "CLOUDWATCH_EXPORTER_QUERY_PERIOD";
pub const ENV_QUERY_STAT: &str = "CLOUDWATCH_EXPORTER_QUERY_STAT";

/// Default distance between now and the end of the query window (10 minutes)
pub const DEFAULT_QUERY_DELAY_SECS: u32 = 600;

/// Default length of the query window (10 minutes)
pub const DEFAULT_QUERY_RANGE_SECS: u32 = 600;

/// Default aggregation period
pub const DEFAULT_QUERY_PERIOD_SECS: i32 = 60;

/// Default statistic
pub const DEFAULT_QUERY_STAT: &str = "Maximum";

// =============================================================================
// Scrape
// =============================================================================

pub const ENV_SCRAPE_ON_ERROR: &str = "CLOUDWATCH_EXPORTER_SCRAPE_ON_ERROR";

// =============================================================================
// Shutdown
// =============================================================================

/// Graceful shutdown timeout in seconds
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
