//! Core application

use std::sync::Arc;

use anyhow::Result;

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::{AwsCloudWatch, CloudWatchApi};
use crate::domain::{Exporter, Telemetry};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub telemetry: Arc<Telemetry>,
    pub exporter: Arc<Exporter>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let cli_config = cli::parse();
        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let api: Arc<dyn CloudWatchApi> = Arc::new(AwsCloudWatch::new(&config.aws).await);
        let telemetry = Arc::new(Telemetry::new());
        let exporter = Arc::new(Exporter::new(
            api,
            Arc::clone(&telemetry),
            &config.collector,
        ));

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            telemetry,
            exporter,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER.replace('-', "_"));

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            host = %app.config.server.host,
            port = app.config.server.port,
            metrics_path = %app.config.server.metrics_path,
            "{} starting",
            APP_NAME
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }
}
