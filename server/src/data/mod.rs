//! Data access layer
//!
//! - `cloudwatch` - CloudWatch metric catalog and value queries

pub mod cloudwatch;

pub use cloudwatch::{AwsCloudWatch, CloudWatchApi, CloudWatchError};
