//! Scrape query parsing and validation
//!
//! A scrape is addressed as `<namespace...>/<metric name>` below the metrics
//! path, with optional `delay`, `range`, `period` and `stat` query parameters.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use thiserror::Error;

use crate::core::config::QueryConfig;

/// Matches everything in the catalog for that field
pub const WILDCARD: &str = "*";

static RE_PERCENTILE: OnceLock<Regex> = OnceLock::new();

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Namespace required")]
    MissingNamespace,

    #[error("Metric name required")]
    MissingMetricName,

    #[error("Invalid query: {param} is not a valid integer: {value}")]
    InvalidNumber { param: &'static str, value: String },

    #[error("Invalid query: {param} must be positive")]
    NonPositive { param: &'static str },

    #[error("Invalid query: unknown statistic {0}")]
    UnknownStatistic(String),
}

/// Upstream aggregation statistic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statistic {
    SampleCount,
    Average,
    Sum,
    Minimum,
    Maximum,
    /// `pNN` or `pNN.NN`, kept as written
    Percentile(String),
}

impl FromStr for Statistic {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SampleCount" => Ok(Self::SampleCount),
            "Average" => Ok(Self::Average),
            "Sum" => Ok(Self::Sum),
            "Minimum" => Ok(Self::Minimum),
            "Maximum" => Ok(Self::Maximum),
            _ => {
                let re = RE_PERCENTILE
                    .get_or_init(|| Regex::new(r"^p(\d{1,3}(?:\.\d{1,2})?)$").expect("Invalid regex"));
                let pct = re
                    .captures(s)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<f64>().ok());
                match pct {
                    Some(p) if p > 0.0 && p <= 100.0 => Ok(Self::Percentile(s.to_string())),
                    _ => Err(QueryError::UnknownStatistic(s.to_string())),
                }
            }
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SampleCount => write!(f, "SampleCount"),
            Self::Average => write!(f, "Average"),
            Self::Sum => write!(f, "Sum"),
            Self::Minimum => write!(f, "Minimum"),
            Self::Maximum => write!(f, "Maximum"),
            Self::Percentile(p) => write!(f, "{}", p),
        }
    }
}

/// Aggregation applied to every query of a scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatOptions {
    /// Seconds, always positive
    pub period: i32,
    pub stat: Statistic,
}

/// Time range `[now - delay - range, now - delay]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    pub fn ending_at(now: DateTime<Utc>, delay_secs: u32, range_secs: u32) -> Self {
        let end = now - TimeDelta::seconds(i64::from(delay_secs));
        Self {
            start: end - TimeDelta::seconds(i64::from(range_secs)),
            end,
        }
    }
}

/// One validated scrape request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeQuery {
    /// Namespace filter, `*` for all
    pub namespace: String,
    /// Metric name filter, `*` for all
    pub name: String,
    pub delay_secs: u32,
    pub range_secs: u32,
    pub stat: StatOptions,
}

impl ScrapeQuery {
    /// Build a query with the configured defaults
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, defaults: &QueryConfig) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            delay_secs: defaults.delay_secs,
            range_secs: defaults.range_secs,
            stat: StatOptions {
                period: defaults.period_secs,
                stat: defaults.stat.clone(),
            },
        }
    }

    /// Parse the path below the metrics prefix plus query parameters
    ///
    /// The last path segment is the metric name; everything before it, joined
    /// with `/`, is the namespace. Unknown parameters are ignored.
    pub fn parse(
        path: &str,
        params: &HashMap<String, String>,
        defaults: &QueryConfig,
    ) -> Result<Self, QueryError> {
        let (namespace, name) = match path.rsplit_once('/') {
            Some((namespace, name)) => (namespace, name),
            None => ("", path),
        };
        if namespace.is_empty() {
            return Err(QueryError::MissingNamespace);
        }
        if name.is_empty() {
            return Err(QueryError::MissingMetricName);
        }

        let mut query = Self::new(namespace, name, defaults);
        if let Some(value) = params.get("delay") {
            query.delay_secs = parse_positive("delay", value)?;
        }
        if let Some(value) = params.get("range") {
            query.range_secs = parse_positive("range", value)?;
        }
        if let Some(value) = params.get("period") {
            let period = parse_positive("period", value)?;
            query.stat.period = i32::try_from(period).map_err(|_| QueryError::InvalidNumber {
                param: "period",
                value: value.clone(),
            })?;
        }
        if let Some(value) = params.get("stat") {
            query.stat.stat = value.parse()?;
        }
        Ok(query)
    }

    pub fn window(&self, now: DateTime<Utc>) -> QueryWindow {
        QueryWindow::ending_at(now, self.delay_secs, self.range_secs)
    }

    /// Catalog filter for the namespace (None means all)
    pub fn namespace_filter(&self) -> Option<String> {
        filter(&self.namespace)
    }

    /// Catalog filter for the metric name (None means all)
    pub fn name_filter(&self) -> Option<String> {
        filter(&self.name)
    }
}

fn filter(value: &str) -> Option<String> {
    (value != WILDCARD).then(|| value.to_string())
}

fn parse_positive(param: &'static str, value: &str) -> Result<u32, QueryError> {
    let n: i64 = value.trim().parse().map_err(|_| QueryError::InvalidNumber {
        param,
        value: value.to_string(),
    })?;
    if n <= 0 {
        return Err(QueryError::NonPositive { param });
    }
    u32::try_from(n).map_err(|_| QueryError::InvalidNumber {
        param,
        value: value.to_string(),
    })
}
