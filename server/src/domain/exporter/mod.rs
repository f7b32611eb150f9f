//! CloudWatch to OpenMetrics exporter core
//!
//! A scrape flows through these stages:
//! - `query` - validate the request into a [`ScrapeQuery`]
//! - `catalog` - list matching identities
//! - `values` - fetch values for bounded batches, reconciled by query id
//! - `collector` - batch fan-out under a concurrency limit, sample stream
//! - `descriptors` - lazily created series schemas, shared across scrapes
//! - `exposition` - OpenMetrics rendering of the collected samples
//! - `sanitize` - exposition-safe names

pub mod catalog;
pub mod collector;
pub mod descriptors;
pub mod error;
pub mod exposition;
pub mod query;
pub mod sanitize;
pub mod values;

pub use collector::{Exporter, Sample, ScrapeResult, ValueSample};
pub use error::CollectError;
pub use query::{QueryError, ScrapeQuery, Statistic};
