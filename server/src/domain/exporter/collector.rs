//! Per-scrape collection orchestration
//!
//! One scrape lists the catalog, splits it into batches, fetches each batch
//! on its own task under a shared concurrency limit and streams back one
//! sample per value found. Failures never end the stream early except for a
//! failed catalog listing, which leaves nothing to fetch.

use std::sync::Arc;

use async_stream::stream;
use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;

use crate::core::config::CollectorConfig;
use crate::data::cloudwatch::{CloudWatchApi, MetricIdentity};
use crate::domain::telemetry::Telemetry;

use super::catalog;
use super::descriptors::{Descriptor, DescriptorCache, LabeledIdentity};
use super::error::CollectError;
use super::query::{QueryWindow, ScrapeQuery};
use super::values;

/// One exposed value
#[derive(Debug, Clone)]
pub struct ValueSample {
    pub descriptor: Arc<Descriptor>,
    /// Aligned with `descriptor.label_names`
    pub label_values: Vec<String>,
    pub value: f64,
}

/// Item of a scrape stream
#[derive(Debug, Clone)]
pub enum Sample {
    Value(ValueSample),
    /// Something went wrong; the scrape carries on where it can
    Invalid(CollectError),
    /// Number of values emitted by this scrape; always the last item
    Sent(u64),
}

/// A fully drained scrape
#[derive(Debug, Default)]
pub struct ScrapeResult {
    pub values: Vec<ValueSample>,
    pub errors: Vec<CollectError>,
    pub sent: u64,
}

/// Shared state handed to every batch task
#[derive(Clone)]
struct BatchContext {
    api: Arc<dyn CloudWatchApi>,
    telemetry: Arc<Telemetry>,
    descriptors: Arc<DescriptorCache>,
    query: Arc<ScrapeQuery>,
    window: QueryWindow,
}

pub struct Exporter {
    api: Arc<dyn CloudWatchApi>,
    telemetry: Arc<Telemetry>,
    descriptors: Arc<DescriptorCache>,
    concurrency: usize,
    batch_size: usize,
}

impl Exporter {
    pub fn new(
        api: Arc<dyn CloudWatchApi>,
        telemetry: Arc<Telemetry>,
        config: &CollectorConfig,
    ) -> Self {
        tracing::debug!(
            backend = api.name(),
            concurrency = config.concurrency,
            batch_size = config.batch_size,
            "Exporter created"
        );
        Self {
            api,
            telemetry,
            descriptors: Arc::new(DescriptorCache::new()),
            concurrency: config.concurrency.max(1),
            batch_size: config.batch_size.max(1),
        }
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    pub fn descriptors(&self) -> &DescriptorCache {
        &self.descriptors
    }

    /// Run one scrape
    ///
    /// Nothing happens until the stream is polled. The stream never fails;
    /// errors arrive as [`Sample::Invalid`] items and are counted in telemetry.
    pub fn collect(&self, query: ScrapeQuery) -> impl Stream<Item = Sample> + Send + 'static {
        let api = Arc::clone(&self.api);
        let telemetry = Arc::clone(&self.telemetry);
        let descriptors = Arc::clone(&self.descriptors);
        let concurrency = self.concurrency;
        let batch_size = self.batch_size;

        stream! {
            let identities = match catalog::list_metrics(api.as_ref(), &telemetry, &query).await {
                Ok(identities) => identities,
                Err(e) => {
                    tracing::error!(
                        namespace = %query.namespace,
                        name = %query.name,
                        error = %e,
                        "Failed to list metrics"
                    );
                    telemetry.record_error();
                    yield Sample::Invalid(e);
                    return;
                }
            };

            let batches = partition(identities, batch_size);
            tracing::debug!(
                namespace = %query.namespace,
                name = %query.name,
                batches = batches.len(),
                "Dispatching batches"
            );

            let ctx = BatchContext {
                api,
                telemetry: Arc::clone(&telemetry),
                descriptors,
                window: query.window(Utc::now()),
                query: Arc::new(query),
            };
            let semaphore = Arc::new(Semaphore::new(concurrency));
            let (tx, mut rx) = mpsc::unbounded_channel();

            let handles: Vec<(usize, JoinHandle<()>)> = batches
                .into_iter()
                .enumerate()
                .map(|(batch_index, batch)| {
                    let handle = tokio::spawn(run_batch(
                        ctx.clone(),
                        Arc::clone(&semaphore),
                        tx.clone(),
                        batch_index,
                        batch,
                    ));
                    (batch_index, handle)
                })
                .collect();
            // The channel closes once every task has dropped its sender
            drop(tx);

            let mut sent = 0u64;
            while let Some(sample) = rx.recv().await {
                if matches!(sample, Sample::Value(_)) {
                    sent += 1;
                }
                yield sample;
            }

            for (batch_index, handle) in handles {
                if let Err(e) = handle.await {
                    tracing::error!(batch = batch_index, error = %e, "Batch task failed");
                    telemetry.record_error();
                    yield Sample::Invalid(CollectError::TaskFailed {
                        batch: batch_index,
                        message: e.to_string(),
                    });
                }
            }

            tracing::debug!(
                namespace = %ctx.query.namespace,
                name = %ctx.query.name,
                sent,
                descriptors = ctx.descriptors.len(),
                "Scrape finished"
            );
            yield Sample::Sent(sent);
        }
    }

    /// Run one scrape and drain it
    pub async fn collect_all(&self, query: ScrapeQuery) -> ScrapeResult {
        let mut result = ScrapeResult::default();
        let stream = self.collect(query);
        futures::pin_mut!(stream);

        while let Some(sample) = stream.next().await {
            match sample {
                Sample::Value(v) => result.values.push(v),
                Sample::Invalid(e) => result.errors.push(e),
                Sample::Sent(n) => result.sent = n,
            }
        }
        result
    }
}

/// Split identities into consecutive batches of at most `size`
fn partition(identities: Vec<MetricIdentity>, size: usize) -> Vec<Vec<MetricIdentity>> {
    let mut batches = Vec::with_capacity(identities.len().div_ceil(size));
    let mut iter = identities.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(size).collect());
    }
    batches
}

async fn run_batch(
    ctx: BatchContext,
    semaphore: Arc<Semaphore>,
    tx: mpsc::UnboundedSender<Sample>,
    batch_index: usize,
    batch: Vec<MetricIdentity>,
) {
    // The semaphore is never closed
    let Ok(_permit) = semaphore.acquire_owned().await else {
        return;
    };

    let result = values::get_values(
        ctx.api.as_ref(),
        &ctx.telemetry,
        &ctx.query,
        ctx.window,
        batch_index,
        &batch,
    )
    .await;

    let values = match result {
        Ok(values) => values,
        Err(e) => {
            if e.is_contract_violation() {
                tracing::error!(batch = batch_index, size = batch.len(), error = %e, "Upstream result contract violated");
            } else {
                tracing::error!(batch = batch_index, size = batch.len(), error = %e, "Failed to get metric values");
            }
            ctx.telemetry.record_error();
            let _ = tx.send(Sample::Invalid(e));
            return;
        }
    };

    let mut sent = 0u64;
    for (index, series) in values {
        let Some(&value) = series.first() else {
            tracing::trace!(batch = batch_index, metric = %batch[index], "No values");
            continue;
        };

        let labeled = LabeledIdentity::from_identity(&batch[index]);
        let descriptor = ctx.descriptors.get_or_create(&labeled.key, &labeled.help);
        let sample = Sample::Value(ValueSample {
            descriptor,
            label_values: labeled.label_values,
            value,
        });
        if tx.send(sample).is_ok() {
            sent += 1;
        }
    }

    ctx.telemetry.record_sent(sent);
    tracing::debug!(batch = batch_index, size = batch.len(), sent, "Batch collected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::core::config::QueryConfig;
    use crate::data::cloudwatch::Dimension;
    use crate::data::cloudwatch::memory::MemoryCloudWatch;
    use crate::domain::exporter::query::Statistic;

    const EC2_NAMES: [&str; 4] = ["NetworkIn", "NetworkOut", "CPUUtilization", "DiskReadBytes"];

    fn query(namespace: &str, name: &str) -> ScrapeQuery {
        ScrapeQuery::new(
            namespace,
            name,
            &QueryConfig {
                delay_secs: 600,
                range_secs: 600,
                period_secs: 60,
                stat: Statistic::Maximum,
            },
        )
    }

    fn exporter(cw: Arc<MemoryCloudWatch>) -> Exporter {
        Exporter::new(
            cw,
            Arc::new(Telemetry::new()),
            &CollectorConfig {
                concurrency: 10,
                batch_size: 500,
            },
        )
    }

    fn populated() -> Arc<MemoryCloudWatch> {
        let cw = Arc::new(MemoryCloudWatch::new());
        for name in EC2_NAMES {
            cw.insert_random("AWS/EC2", name, 567);
        }
        cw.insert_random("AWS/EBS", "VolumeWriteBytes", 567);
        cw
    }

    #[test]
    fn test_partition() {
        let identities: Vec<MetricIdentity> = (0..1234)
            .map(|i| MetricIdentity::new("ns", "name", vec![Dimension::new("id", i.to_string())]))
            .collect();

        let batches = partition(identities.clone(), 500);
        assert_eq!(
            batches.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![500, 500, 234]
        );
        assert_eq!(batches.concat(), identities);

        assert!(partition(Vec::new(), 500).is_empty());
    }

    #[tokio::test]
    async fn test_single_metric_two_batches() {
        let cw = populated();
        let exporter = exporter(Arc::clone(&cw));

        let result = exporter.collect_all(query("AWS/EC2", "NetworkIn")).await;

        assert!(result.errors.is_empty());
        assert_eq!(result.values.len(), 567);
        assert_eq!(result.sent, 567);
        assert_eq!(cw.max_queries_per_call(), 500);
        assert_eq!(exporter.telemetry().metrics_sent(), 567);
        assert_eq!(exporter.telemetry().errors(), 0);

        let first = &result.values[0];
        assert_eq!(first.descriptor.name, "aws_ec2_network_in");
        assert_eq!(first.descriptor.label_names, vec!["instance_id"]);
        assert_eq!(first.value, 23.42);
    }

    #[tokio::test]
    async fn test_wildcard_name() {
        let cw = populated();
        let exporter = exporter(cw);

        let result = exporter.collect_all(query("AWS/EC2", "*")).await;

        assert!(result.errors.is_empty());
        assert_eq!(result.values.len(), 4 * 567);
        assert_eq!(result.sent, 2268);
        // One descriptor per metric name
        assert_eq!(exporter.descriptors().len(), 4);
    }

    #[tokio::test]
    async fn test_wildcard_everything() {
        let cw = populated();
        let exporter = exporter(cw);

        let result = exporter.collect_all(query("*", "*")).await;

        assert!(result.errors.is_empty());
        assert_eq!(result.sent, 5 * 567);
        assert!(
            result
                .values
                .iter()
                .any(|v| v.descriptor.name == "aws_ebs_volume_write_bytes")
        );
    }

    #[tokio::test]
    async fn test_every_value_emitted_once() {
        let cw = populated();
        let exporter = exporter(cw);

        let result = exporter.collect_all(query("AWS/EC2", "NetworkOut")).await;

        let mut ids: Vec<&str> = result
            .values
            .iter()
            .map(|v| v.label_values[0].as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 567);
    }

    #[tokio::test]
    async fn test_failing_batch_does_not_cancel_sibling() {
        let cw = populated();
        // i-00000 only lives in the first batch of every metric
        cw.fail_values_for("i-00000");
        let exporter = exporter(cw);

        let result = exporter.collect_all(query("AWS/EC2", "NetworkIn")).await;

        assert_eq!(result.errors.len(), 1);
        assert!(matches!(result.errors[0], CollectError::Batch { batch: 0, .. }));
        assert_eq!(result.values.len(), 67);
        assert_eq!(result.sent, 67);
        assert_eq!(exporter.telemetry().errors(), 1);
    }

    #[tokio::test]
    async fn test_catalog_failure() {
        let cw = populated();
        cw.fail_list();
        let exporter = exporter(Arc::clone(&cw));

        let samples: Vec<Sample> = exporter
            .collect(query("AWS/EC2", "NetworkIn"))
            .collect()
            .await;

        assert_eq!(samples.len(), 1);
        assert!(matches!(samples[0], Sample::Invalid(CollectError::Catalog { .. })));
        assert_eq!(cw.data_calls(), 0);
        assert_eq!(exporter.telemetry().errors(), 1);
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let cw = Arc::new(MemoryCloudWatch::new());
        let exporter = exporter(Arc::clone(&cw));

        let samples: Vec<Sample> = exporter
            .collect(query("AWS/EC2", "NetworkIn"))
            .collect()
            .await;

        assert_eq!(samples.len(), 1);
        assert!(matches!(samples[0], Sample::Sent(0)));
        assert_eq!(cw.data_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_value_series_skipped() {
        let cw = Arc::new(MemoryCloudWatch::new());
        for i in 0..10 {
            let identity = MetricIdentity::new(
                "AWS/EC2",
                "NetworkIn",
                vec![Dimension::new("InstanceId", format!("i-{}", i))],
            );
            let values = if i % 2 == 0 { vec![] } else { vec![f64::from(i)] };
            cw.insert(identity, values);
        }
        let exporter = exporter(cw);

        let result = exporter.collect_all(query("AWS/EC2", "NetworkIn")).await;

        assert!(result.errors.is_empty());
        assert_eq!(result.sent, 5);
        assert!(result.values.iter().all(|v| v.value as i32 % 2 == 1));
    }

    #[tokio::test]
    async fn test_sent_is_last_sample() {
        let cw = populated();
        let exporter = exporter(cw);

        let samples: Vec<Sample> = exporter.collect(query("AWS/EBS", "*")).collect().await;

        assert!(matches!(samples.last(), Some(Sample::Sent(567))));
        assert_eq!(samples.len(), 568);
    }

    #[tokio::test]
    async fn test_sent_is_per_scrape() {
        let cw = populated();
        let exporter = exporter(cw);

        let first = exporter.collect_all(query("AWS/EBS", "*")).await;
        let second = exporter.collect_all(query("AWS/EBS", "*")).await;

        assert_eq!(first.sent, 567);
        assert_eq!(second.sent, 567);
        assert_eq!(exporter.telemetry().metrics_sent(), 2 * 567);
        // Descriptors survive between scrapes
        assert_eq!(exporter.descriptors().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let cw = Arc::new(MemoryCloudWatch::with_latency(Duration::from_millis(20)));
        cw.insert_random("AWS/EC2", "NetworkIn", 500 * 8);
        let exporter = Exporter::new(
            Arc::clone(&cw) as Arc<dyn CloudWatchApi>,
            Arc::new(Telemetry::new()),
            &CollectorConfig {
                concurrency: 3,
                batch_size: 500,
            },
        );

        let result = exporter.collect_all(query("AWS/EC2", "NetworkIn")).await;

        assert_eq!(result.sent, 4000);
        // 8 delayed batches keep the limit saturated
        assert_eq!(cw.max_in_flight(), 3);
    }

    #[tokio::test]
    async fn test_contract_violation_reported() {
        let cw = populated();
        cw.drop_result();
        let exporter = exporter(cw);

        let result = exporter.collect_all(query("AWS/EBS", "VolumeWriteBytes")).await;

        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().all(CollectError::is_contract_violation));
        assert!(result.values.is_empty());
        assert_eq!(result.sent, 0);
    }

    #[tokio::test]
    async fn test_mixed_dimension_order_shares_descriptor() {
        let cw = Arc::new(MemoryCloudWatch::new());
        cw.insert(
            MetricIdentity::new(
                "AWS/EC2",
                "NetworkIn",
                vec![Dimension::new("InstanceId", "i-1"), Dimension::new("ImageId", "ami-1")],
            ),
            vec![1.0],
        );
        cw.insert(
            MetricIdentity::new(
                "AWS/EC2",
                "NetworkIn",
                vec![Dimension::new("ImageId", "ami-2"), Dimension::new("InstanceId", "i-2")],
            ),
            vec![2.0],
        );
        let exporter = exporter(cw);

        let result = exporter.collect_all(query("AWS/EC2", "NetworkIn")).await;

        assert_eq!(result.sent, 2);
        assert!(Arc::ptr_eq(&result.values[0].descriptor, &result.values[1].descriptor));
        for v in &result.values {
            let image = &v.label_values[0];
            let instance = &v.label_values[1];
            assert_eq!(image.trim_start_matches("ami-"), instance.trim_start_matches("i-"));
        }
    }
}
