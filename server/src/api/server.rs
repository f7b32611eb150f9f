//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;

use tower_http::compression::CompressionLayer;

use super::middleware;
use super::routes::scrape::ScrapeState;
use super::routes::{health, index, scrape, telemetry};
use crate::core::CoreApp;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown is triggered; returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        // Clone shutdown before moving app
        let shutdown = app.shutdown.clone();

        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let addr = SocketAddr::new(
            host.parse()
                .with_context(|| format!("Invalid server host: {}", host))?,
            port,
        );

        if app.config.telemetry.enabled {
            let telemetry_host = app.config.telemetry.host.clone();
            let telemetry_addr = SocketAddr::new(
                telemetry_host
                    .parse()
                    .with_context(|| format!("Invalid telemetry host: {}", telemetry_host))?,
                app.config.telemetry.port,
            );
            let router = telemetry::routes(&app.config.telemetry.path, Arc::clone(&app.telemetry))
                .fallback(middleware::handle_404);

            let listener = TcpListener::bind(telemetry_addr)
                .await
                .with_context(|| format!("Failed to bind telemetry listener on {}", telemetry_addr))?;
            tracing::info!(
                addr = %telemetry_addr,
                path = %app.config.telemetry.path,
                "Telemetry listener started"
            );

            let wait = shutdown.wait();
            let handle = tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, router)
                    .with_graceful_shutdown(wait)
                    .await
                {
                    tracing::error!(error = %e, "Telemetry listener error");
                }
            });
            app.shutdown.register(handle).await;
        } else {
            tracing::debug!("Telemetry listener disabled by config");
        }

        let metrics_path = app.config.server.metrics_path.clone();
        let scrape_routes = scrape::routes(
            &metrics_path,
            ScrapeState {
                exporter: Arc::clone(&app.exporter),
                defaults: app.config.query.clone(),
                on_error: app.config.scrape.on_error,
            },
        );

        let router = Router::new()
            .route("/health", get(health::health))
            .merge(index::routes(&metrics_path))
            .merge(scrape_routes)
            .fallback(middleware::handle_404)
            .layer(axum::middleware::from_fn(middleware::log_requests))
            .layer(CompressionLayer::new());

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind scrape listener on {}", addr))?;
        tracing::info!(addr = %addr, metrics_path = %metrics_path, "Scrape listener started");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}
