//! Series descriptors and their cache
//!
//! The label schema of a CloudWatch metric is only known once the catalog has
//! been listed. Descriptors are created lazily the first time a schema is seen
//! and shared by every later sample with the same schema.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::data::cloudwatch::MetricIdentity;

use super::sanitize::sanitize;

/// Label name used when a dimension name sanitizes to nothing usable
const FALLBACK_LABEL: &str = "dimension";

/// Exposed series definition
#[derive(Debug, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}

/// Cache key: exposed series name plus ordered sanitized label names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub name: String,
    pub label_names: Vec<String>,
}

/// Schema of one identity, with label values aligned to the key's label names
#[derive(Debug, Clone)]
pub struct LabeledIdentity {
    pub key: SchemaKey,
    pub help: String,
    pub label_values: Vec<String>,
}

impl LabeledIdentity {
    /// Sanitize names and sort dimensions by sanitized name
    ///
    /// Catalog dimension order varies between series of the same metric, so
    /// the order is canonicalized before it becomes part of a schema. Names
    /// that collide after sanitizing get a numeric suffix (`_2`, `_3`, ...)
    /// in order of the raw dimension name.
    pub fn from_identity(identity: &MetricIdentity) -> Self {
        let mut labels: Vec<(String, &str, &str)> = identity
            .dimensions
            .iter()
            .map(|d| (label_name(&d.name), d.name.as_str(), d.value.as_str()))
            .collect();
        labels.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)).then_with(|| a.2.cmp(b.2)));

        let mut seen = HashSet::with_capacity(labels.len());
        let mut label_names = Vec::with_capacity(labels.len());
        let mut label_values = Vec::with_capacity(labels.len());
        for (name, raw, value) in labels {
            let mut candidate = name.clone();
            let mut n = 1;
            while seen.contains(&candidate) {
                n += 1;
                candidate = format!("{}_{}", name, n);
            }
            if candidate != name {
                tracing::debug!(dimension = raw, label = %candidate, "Renamed colliding dimension");
            }
            seen.insert(candidate.clone());
            label_names.push(candidate);
            label_values.push(value.to_string());
        }

        Self {
            key: SchemaKey {
                name: format!("{}_{}", sanitize(&identity.namespace), sanitize(&identity.name)),
                label_names,
            },
            help: format!("Cloudwatch Metric {}/{}", identity.namespace, identity.name),
            label_values,
        }
    }
}

/// Exposition-safe label name for a dimension name
///
/// Label names cannot contain `:`, be empty or start with a digit.
fn label_name(raw: &str) -> String {
    let name = sanitize(raw).replace(':', "_");
    if name.is_empty() {
        FALLBACK_LABEL.to_string()
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{}_{}", FALLBACK_LABEL, name)
    } else {
        name
    }
}

/// Process-wide descriptor cache
///
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<SchemaKey, Arc<Descriptor>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored descriptor for `key`, creating it on first use
    pub fn get_or_create(&self, key: &SchemaKey, help: &str) -> Arc<Descriptor> {
        if let Some(descriptor) = self.entries.read().get(key) {
            return Arc::clone(descriptor);
        }

        // Another worker may have inserted between the two locks
        let mut entries = self.entries.write();
        let descriptor = entries.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(name = %key.name, labels = ?key.label_names, "New descriptor");
            Arc::new(Descriptor {
                name: key.name.clone(),
                help: help.to_string(),
                label_names: key.label_names.clone(),
            })
        });
        Arc::clone(descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
