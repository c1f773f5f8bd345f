use std::time::{Duration, Instant};

use aws_sdk_kinesis::primitives::Blob;
use aws_sdk_kinesis::types::PutRecordsRequestEntry;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::aws;

/// Micro-benchmarks timing individual SDK calls against live endpoints.
#[derive(Args)]
pub struct BenchCommand {
    #[clap(global = true, long)]
    region: Option<String>,
    #[clap(global = true, long)]
    endpoint_url: Option<String>,
    #[clap(global = true, long, default_value_t = 100)]
    iterations: usize,
    /// Print the report as JSON instead of plain text.
    #[clap(global = true, long)]
    json: bool,
    #[clap(subcommand)]
    scenario: BenchScenarios,
}

#[derive(Subcommand)]
pub enum BenchScenarios {
    /// Time `PutRecords` calls carrying synthetic payloads.
    PutRecords {
        #[clap(long)]
        stream_name: String,
        #[clap(long, default_value_t = 1024)]
        record_size: usize,
        #[clap(long, default_value_t = 100)]
        batch_size: usize,
    },
    /// Time single `ListShards` pages.
    ListShards {
        #[clap(long)]
        stream_name: String,
    },
    /// Time single S3 Tables `ListTables` pages.
    ListTables {
        #[clap(long)]
        bucket_arn: String,
        #[clap(long)]
        namespace: Option<String>,
    },
}

#[derive(Serialize)]
struct BenchReport {
    scenario: &'static str,
    iterations: usize,
    total_secs: f64,
    min_ms: f64,
    mean_ms: f64,
    max_ms: f64,
    p50_ms: f64,
    p90_ms: f64,
    p99_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    mib_per_sec: Option<f64>,
}

impl BenchReport {
    fn from_samples(
        scenario: &'static str,
        samples: &[Duration],
        bytes_per_iteration: Option<usize>,
    ) -> Self {
        let mut latencies_ms: Vec<f64> = samples
            .iter()
            .map(|duration| duration.as_secs_f64() * 1_000.0)
            .collect();
        latencies_ms.sort_by(|left, right| left.total_cmp(right));

        let total_secs: f64 = samples.iter().map(Duration::as_secs_f64).sum();
        let mib_per_sec = bytes_per_iteration.map(|bytes| {
            (bytes * samples.len()) as f64 / (1024.0 * 1024.0) / total_secs
        });
        Self {
            scenario,
            iterations: samples.len(),
            total_secs,
            min_ms: latencies_ms.first().copied().unwrap_or_default(),
            mean_ms: mean(&latencies_ms),
            max_ms: latencies_ms.last().copied().unwrap_or_default(),
            p50_ms: percentile(&latencies_ms, 50.0),
            p90_ms: percentile(&latencies_ms, 90.0),
            p99_ms: percentile(&latencies_ms, 99.0),
            mib_per_sec,
        }
    }

    fn print(&self, json: bool) -> anyhow::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }
        println!(
            "{}: {} iteration(s) in {:.2}s",
            self.scenario, self.iterations, self.total_secs
        );
        println!(
            "latency ms: min {:.2} / mean {:.2} / max {:.2}",
            self.min_ms, self.mean_ms, self.max_ms
        );
        println!(
            "percentiles ms: p50 {:.2} / p90 {:.2} / p99 {:.2}",
            self.p50_ms, self.p90_ms, self.p99_ms
        );
        if let Some(mib_per_sec) = self.mib_per_sec {
            println!("throughput: {:.2} MiB/s", mib_per_sec);
        }
        Ok(())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Nearest-rank percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (pct / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn synthetic_batch(
    iteration: usize,
    record_size: usize,
    batch_size: usize,
) -> anyhow::Result<Vec<PutRecordsRequestEntry>> {
    let mut records = Vec::with_capacity(batch_size);
    for sequence in 0..batch_size {
        let mut data = format!("bench-{}-{} ", iteration, sequence).into_bytes();
        data.resize(record_size, b'x');
        let record = PutRecordsRequestEntry::builder()
            .partition_key(format!("{:x}", seahash::hash(&data)))
            .data(Blob::new(data))
            .build()?;
        records.push(record);
    }
    Ok(records)
}

async fn bench_put_records(
    client: &aws_sdk_kinesis::Client,
    stream_name: &str,
    iterations: usize,
    record_size: usize,
    batch_size: usize,
) -> anyhow::Result<BenchReport> {
    let mut samples = Vec::with_capacity(iterations);
    for iteration in 0..iterations {
        let records = synthetic_batch(iteration, record_size, batch_size)?;
        let start = Instant::now();
        client
            .put_records()
            .set_records(Some(records))
            .stream_name(stream_name)
            .send()
            .await?;
        samples.push(start.elapsed());
    }
    Ok(BenchReport::from_samples(
        "put-records",
        &samples,
        Some(record_size * batch_size),
    ))
}

async fn bench_list_shards(
    client: &aws_sdk_kinesis::Client,
    stream_name: &str,
    iterations: usize,
) -> anyhow::Result<BenchReport> {
    let mut samples = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let start = Instant::now();
        client
            .list_shards()
            .stream_name(stream_name)
            .send()
            .await?;
        samples.push(start.elapsed());
    }
    Ok(BenchReport::from_samples("list-shards", &samples, None))
}

async fn bench_list_tables(
    client: &aws_sdk_s3tables::Client,
    bucket_arn: &str,
    namespace: Option<&str>,
    iterations: usize,
) -> anyhow::Result<BenchReport> {
    let mut samples = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let mut request = client.list_tables().table_bucket_arn(bucket_arn);
        if let Some(namespace) = namespace {
            request = request.namespace(namespace);
        }
        let start = Instant::now();
        request.send().await?;
        samples.push(start.elapsed());
    }
    Ok(BenchReport::from_samples("list-tables", &samples, None))
}

impl BenchCommand {
    pub async fn exec(self) -> anyhow::Result<()> {
        let config = aws::sdk_config(self.region, self.endpoint_url).await;

        let report = match self.scenario {
            BenchScenarios::PutRecords {
                stream_name,
                record_size,
                batch_size,
            } => {
                let client = aws_sdk_kinesis::Client::new(&config);
                bench_put_records(
                    &client,
                    &stream_name,
                    self.iterations,
                    record_size,
                    batch_size,
                )
                .await?
            }
            BenchScenarios::ListShards { stream_name } => {
                let client = aws_sdk_kinesis::Client::new(&config);
                bench_list_shards(&client, &stream_name, self.iterations).await?
            }
            BenchScenarios::ListTables {
                bucket_arn,
                namespace,
            } => {
                let client = aws_sdk_s3tables::Client::new(&config);
                bench_list_tables(&client, &bucket_arn, namespace.as_deref(), self.iterations)
                    .await?
            }
        };
        report.print(self.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0]), 2.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let sorted: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile(&sorted, 50.0), 50.0);
        assert_eq!(percentile(&sorted, 90.0), 90.0);
        assert_eq!(percentile(&sorted, 99.0), 99.0);
        assert_eq!(percentile(&sorted, 100.0), 100.0);
    }

    #[test]
    fn test_percentile_small_sample() {
        assert_eq!(percentile(&[], 99.0), 0.0);
        assert_eq!(percentile(&[5.0], 50.0), 5.0);
        assert_eq!(percentile(&[1.0, 10.0], 99.0), 10.0);
    }

    #[test]
    fn test_report_from_samples() {
        let samples = vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(30),
        ];
        let report = BenchReport::from_samples("put-records", &samples, Some(1024 * 1024));
        assert_eq!(report.iterations, 3);
        assert!((report.mean_ms - 20.0).abs() < 1e-6);
        assert!((report.min_ms - 10.0).abs() < 1e-6);
        assert!((report.max_ms - 30.0).abs() < 1e-6);
        // 3 MiB over 60ms of cumulative latency.
        assert!((report.mib_per_sec.unwrap() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_synthetic_batch_shape() {
        let records = synthetic_batch(0, 256, 10).unwrap();
        assert_eq!(records.len(), 10);
        for record in &records {
            assert_eq!(record.data().as_ref().len(), 256);
        }
        assert_ne!(records[0].partition_key(), records[1].partition_key());
    }
}
