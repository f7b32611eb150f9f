//! Domain logic for the CloudWatch exporter
//!
//! - `exporter` - catalog discovery, batched value retrieval and exposition
//! - `telemetry` - process-wide metrics about the exporter itself

pub mod exporter;
pub mod telemetry;

pub use exporter::{Exporter, ScrapeQuery, ScrapeResult};
pub use telemetry::Telemetry;
