//! HTTP surface: scrape listener and telemetry listener

pub mod middleware;
pub mod routes;
mod server;
pub mod types;

pub use server::ApiServer;
