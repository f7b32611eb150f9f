//! API route handlers

pub mod health;
pub mod index;
pub mod scrape;
pub mod telemetry;
