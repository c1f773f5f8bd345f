use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use aws_sdk_kinesis::error::DisplayErrorContext;
use aws_sdk_kinesis::primitives::Blob;
use aws_sdk_kinesis::types::{
    PutRecordsRequestEntry, ScalingType, ShardIteratorType, StreamMode, StreamModeDetails,
};
use aws_sdk_kinesis::Client;
use clap::{Args, Subcommand};
use tokio::io::AsyncBufReadExt;

use crate::aws;
use crate::paging::PageBudget;
use crate::term::confirm;

const ONE_MIB: usize = 1024 * 1024;

const MAX_BATCH_RECORDS: usize = 500;
const MAX_BATCH_BYTES: usize = 5 * ONE_MIB;

#[derive(Args)]
pub struct KinesisCommand {
    #[clap(global = true, long)]
    region: Option<String>,
    #[clap(global = true, long)]
    endpoint_url: Option<String>,
    #[clap(subcommand)]
    subcommand: KinesisSubcommands,
}

#[derive(Subcommand)]
pub enum KinesisSubcommands {
    #[clap(alias = "mk")]
    Create {
        #[clap(long)]
        stream_name: String,
        #[clap(long, default_value_t = 1, conflicts_with = "on-demand")]
        num_shards: usize,
        /// Create the stream in on-demand capacity mode.
        #[clap(long)]
        on_demand: bool,
    },
    #[clap(alias = "rm")]
    Delete {
        #[clap(long)]
        stream_name: String,
        #[clap(long)]
        enforce_consumer_deletion: bool,
        #[clap(long)]
        yes: bool,
    },
    Describe {
        #[clap(long)]
        stream_name: String,
    },
    #[clap(alias = "ls")]
    List {
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long)]
        page_size: Option<i32>,
    },
    #[clap(alias = "lss")]
    ListShards {
        #[clap(long)]
        stream_name: String,
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long)]
        page_size: Option<i32>,
    },
    ListConsumers {
        #[clap(long)]
        stream_arn: String,
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long)]
        page_size: Option<i32>,
    },
    RegisterConsumer {
        #[clap(long)]
        stream_arn: String,
        #[clap(long)]
        consumer_name: String,
    },
    DeregisterConsumer {
        #[clap(long)]
        stream_arn: String,
        #[clap(long)]
        consumer_name: String,
    },
    Push {
        #[clap(long)]
        stream_name: String,
    },
    Tail {
        #[clap(long)]
        stream_name: String,
        #[clap(long)]
        shard_id: usize,
        /// Start from the oldest record instead of the tip of the shard.
        #[clap(long)]
        trim_horizon: bool,
    },
    ScaleUp {
        #[clap(long)]
        stream_name: String,
    },
    ScaleDown {
        #[clap(long)]
        stream_name: String,
    },
    SplitShard {
        #[clap(long)]
        stream_name: String,
        #[clap(long)]
        shard_id: usize,
        #[clap(long)]
        new_starting_hash_key: String,
    },
    MergeShards {
        #[clap(long)]
        stream_name: String,
        #[clap(long)]
        shard_id: usize,
        #[clap(long)]
        adjacent_shard_id: usize,
    },
    SetRetention {
        #[clap(long)]
        stream_name: String,
        #[clap(long)]
        hours: i32,
    },
    Tag {
        #[clap(long)]
        stream_name: String,
        /// Tags as `key=value` pairs.
        #[clap(required = true)]
        tags: Vec<String>,
    },
    Untag {
        #[clap(long)]
        stream_name: String,
        #[clap(required = true)]
        tag_keys: Vec<String>,
    },
    ListTags {
        #[clap(long)]
        stream_name: String,
    },
}

async fn create_stream(
    client: &Client,
    stream_name: &str,
    num_shards: usize,
    on_demand: bool,
) -> anyhow::Result<()> {
    if on_demand {
        let stream_mode_details = StreamModeDetails::builder()
            .stream_mode(StreamMode::OnDemand)
            .build()?;
        client
            .create_stream()
            .stream_name(stream_name)
            .stream_mode_details(stream_mode_details)
            .send()
            .await?;
        println!("Created on-demand stream `{}`.", stream_name);
    } else {
        client
            .create_stream()
            .stream_name(stream_name)
            .shard_count(num_shards as i32)
            .send()
            .await?;
        println!(
            "Created stream `{}` with {} shard(s).",
            stream_name, num_shards
        );
    }
    Ok(())
}

async fn delete_stream(
    client: &Client,
    stream_name: &str,
    enforce_consumer_deletion: bool,
    yes: bool,
) -> anyhow::Result<()> {
    if !confirm(&format!("Delete stream `{}`?", stream_name), yes)? {
        println!("Aborted.");
        return Ok(());
    }
    client
        .delete_stream()
        .stream_name(stream_name)
        .enforce_consumer_deletion(enforce_consumer_deletion)
        .send()
        .await?;
    println!("Deleted stream `{}` successfully.", stream_name);
    Ok(())
}

async fn describe_stream(client: &Client, stream_name: &str) -> anyhow::Result<()> {
    let output = client
        .describe_stream_summary()
        .stream_name(stream_name)
        .send()
        .await?;
    let summary = output
        .stream_description_summary()
        .context("missing stream description")?;

    println!("name:            {}", summary.stream_name());
    println!("arn:             {}", summary.stream_arn());
    println!("status:          {}", summary.stream_status().as_str());
    if let Some(stream_mode_details) = summary.stream_mode_details() {
        println!(
            "mode:            {}",
            stream_mode_details.stream_mode().as_str()
        );
    }
    println!("open shards:     {}", summary.open_shard_count());
    println!("retention hours: {}", summary.retention_period_hours());
    if let Some(consumer_count) = summary.consumer_count() {
        println!("consumers:       {}", consumer_count);
    }
    println!("created:         {:?}", summary.stream_creation_timestamp());
    Ok(())
}

async fn list_streams(
    client: &Client,
    limit: Option<usize>,
    page_size: Option<i32>,
) -> anyhow::Result<()> {
    let mut budget = PageBudget::new(limit, page_size);
    let mut next_token: Option<String> = None;
    let mut first_page = true;

    loop {
        let mut request = client.list_streams();
        if let Some(page_size) = budget.request_size() {
            request = request.limit(page_size);
        }
        if let Some(token) = next_token.take() {
            request = request.next_token(token);
        }
        let output = match request.send().await {
            Ok(output) => output,
            Err(err) if first_page => return Err(err.into()),
            Err(err) => {
                tracing::warn!(error = %DisplayErrorContext(&err), "stopped listing streams");
                break;
            }
        };
        first_page = false;

        let stream_names = budget.clamp(output.stream_names().to_vec());
        let num_emitted = stream_names.len();
        for stream_name in stream_names {
            println!("{}", stream_name);
        }
        next_token = output.next_token().map(String::from);
        if next_token.is_none() || !budget.consume(num_emitted) {
            break;
        }
    }
    Ok(())
}

async fn list_shards(
    client: &Client,
    stream_name: &str,
    limit: Option<usize>,
    page_size: Option<i32>,
) -> anyhow::Result<()> {
    let mut budget = PageBudget::new(limit, page_size);
    let mut next_token: Option<String> = None;
    let mut first_page = true;

    loop {
        let mut request = client.list_shards();
        if let Some(page_size) = budget.request_size() {
            request = request.max_results(page_size);
        }
        // The API rejects requests carrying both `StreamName` and `NextToken`.
        match next_token.take() {
            Some(token) => request = request.next_token(token),
            None => request = request.stream_name(stream_name),
        }
        let output = match request.send().await {
            Ok(output) => output,
            Err(err) if first_page => return Err(err.into()),
            Err(err) => {
                tracing::warn!(error = %DisplayErrorContext(&err), "stopped listing shards");
                break;
            }
        };
        first_page = false;

        let shards = budget.clamp(output.shards().to_vec());
        let num_emitted = shards.len();
        for shard in shards {
            println!("{}", shard.shard_id());
        }
        next_token = output.next_token().map(String::from);
        if next_token.is_none() || !budget.consume(num_emitted) {
            break;
        }
    }
    Ok(())
}

async fn list_consumers(
    client: &Client,
    stream_arn: &str,
    limit: Option<usize>,
    page_size: Option<i32>,
) -> anyhow::Result<()> {
    let mut budget = PageBudget::new(limit, page_size);
    let mut next_token: Option<String> = None;
    let mut first_page = true;

    loop {
        let mut request = client.list_stream_consumers().stream_arn(stream_arn);
        if let Some(page_size) = budget.request_size() {
            request = request.max_results(page_size);
        }
        if let Some(token) = next_token.take() {
            request = request.next_token(token);
        }
        let output = match request.send().await {
            Ok(output) => output,
            Err(err) if first_page => return Err(err.into()),
            Err(err) => {
                tracing::warn!(error = %DisplayErrorContext(&err), "stopped listing consumers");
                break;
            }
        };
        first_page = false;

        let consumers = budget.clamp(output.consumers().to_vec());
        let num_emitted = consumers.len();
        for consumer in consumers {
            println!(
                "{}\t{}\t{}",
                consumer.consumer_name(),
                consumer.consumer_status().as_str(),
                consumer.consumer_arn()
            );
        }
        next_token = output.next_token().map(String::from);
        if next_token.is_none() || !budget.consume(num_emitted) {
            break;
        }
    }
    Ok(())
}

async fn register_consumer(
    client: &Client,
    stream_arn: &str,
    consumer_name: &str,
) -> anyhow::Result<()> {
    let output = client
        .register_stream_consumer()
        .stream_arn(stream_arn)
        .consumer_name(consumer_name)
        .send()
        .await?;
    let consumer = output.consumer().context("missing consumer")?;
    println!(
        "Registered consumer `{}` ({}).",
        consumer.consumer_name(),
        consumer.consumer_arn()
    );
    Ok(())
}

async fn deregister_consumer(
    client: &Client,
    stream_arn: &str,
    consumer_name: &str,
) -> anyhow::Result<()> {
    client
        .deregister_stream_consumer()
        .stream_arn(stream_arn)
        .consumer_name(consumer_name)
        .send()
        .await?;
    println!("Deregistered consumer `{}`.", consumer_name);
    Ok(())
}

async fn tail(
    client: &Client,
    stream_name: &str,
    shard_id: usize,
    trim_horizon: bool,
) -> anyhow::Result<()> {
    let shard_iterator_type = if trim_horizon {
        ShardIteratorType::TrimHorizon
    } else {
        ShardIteratorType::Latest
    };
    let mut shard_iterator_opt = client
        .get_shard_iterator()
        .stream_name(stream_name)
        .shard_id(make_shard_id(shard_id))
        .shard_iterator_type(shard_iterator_type)
        .send()
        .await?
        .shard_iterator;

    let mut interval = tokio::time::interval(Duration::from_millis(205));

    while let Some(shard_iterator) = shard_iterator_opt {
        interval.tick().await;

        let output = client
            .get_records()
            .shard_iterator(shard_iterator)
            .send()
            .await?;

        for record in output.records() {
            let line = std::str::from_utf8(record.data().as_ref())?;
            println!("{}", line);
        }
        shard_iterator_opt = output.next_shard_iterator;
    }
    Ok(())
}

async fn put_records(
    client: &Client,
    stream_name: &str,
    records: Vec<PutRecordsRequestEntry>,
) -> anyhow::Result<()> {
    let output = client
        .put_records()
        .set_records(Some(records))
        .stream_name(stream_name)
        .send()
        .await?;
    if let Some(failed) = output.failed_record_count() {
        if failed > 0 {
            tracing::warn!(failed, "some records were not ingested");
        }
    }
    Ok(())
}

/// Groups stdin lines into `PutRecords` batches: at most 500 records and
/// 5 MiB per call, records larger than 1 MiB rejected.
struct RecordBatcher {
    records: Vec<PutRecordsRequestEntry>,
    num_bytes: usize,
}

impl RecordBatcher {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            num_bytes: 0,
        }
    }

    /// Buffers one record, handing back a full batch when a limit is hit.
    /// Returns an error for records over the 1 MiB per-record cap.
    fn push(&mut self, line: String) -> anyhow::Result<Option<Vec<PutRecordsRequestEntry>>> {
        if line.len() > ONE_MIB {
            bail!("record is larger than 1 MiB");
        }
        let mut ready = None;
        if self.num_bytes + line.len() > MAX_BATCH_BYTES {
            ready = Some(self.take());
        }
        self.num_bytes += line.len();
        let record = PutRecordsRequestEntry::builder()
            .partition_key(format!("{:x}", seahash::hash(line.as_bytes())))
            .data(Blob::new(line))
            .build()?;
        self.records.push(record);

        if self.records.len() == MAX_BATCH_RECORDS && ready.is_none() {
            ready = Some(self.take());
        }
        Ok(ready)
    }

    fn take(&mut self) -> Vec<PutRecordsRequestEntry> {
        self.num_bytes = 0;
        std::mem::take(&mut self.records)
    }

    fn finish(mut self) -> Vec<PutRecordsRequestEntry> {
        self.take()
    }
}

#[derive(Default)]
struct PushSummary {
    num_lines: usize,
    num_records: usize,
    num_bytes: usize,
}

async fn push_lines<R>(
    client: &Client,
    stream_name: &str,
    mut lines: tokio::io::Lines<tokio::io::BufReader<R>>,
    batcher: &mut RecordBatcher,
) -> anyhow::Result<PushSummary>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut summary = PushSummary::default();

    while let Some(line) = lines.next_line().await? {
        summary.num_lines += 1;
        let record_len = line.len();

        match batcher.push(line) {
            Ok(Some(batch)) => put_records(client, stream_name, batch).await?,
            Ok(None) => {}
            Err(_) => {
                println!(
                    "Record #{} is larger than 1 MiB, skipping.",
                    summary.num_lines
                );
                continue;
            }
        }
        summary.num_records += 1;
        summary.num_bytes += record_len;
    }
    Ok(summary)
}

async fn push(client: &Client, stream_name: &str) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let reader = tokio::io::BufReader::new(stdin);
    let lines = reader.lines();

    let mut batcher = RecordBatcher::new();
    let start = Instant::now();

    let summary = push_lines(client, stream_name, lines, &mut batcher).await?;
    let batch = batcher.finish();
    if !batch.is_empty() {
        put_records(client, stream_name, batch).await?;
    }
    let elapsed_secs = start.elapsed().as_secs_f64();
    println!(
        "Pushed {} records to stream `{}` in {:.1}s ({:.2} MiB/s).",
        summary.num_records,
        stream_name,
        elapsed_secs,
        summary.num_bytes as f64 / ONE_MIB as f64 / elapsed_secs
    );
    Ok(())
}

async fn open_shard_count(client: &Client, stream_name: &str) -> anyhow::Result<i32> {
    let output = client
        .describe_stream_summary()
        .stream_name(stream_name)
        .send()
        .await?;
    let summary = output
        .stream_description_summary()
        .context("missing stream description")?;
    Ok(summary.open_shard_count())
}

async fn update_shard_count(
    client: &Client,
    stream_name: &str,
    target_shard_count: i32,
) -> anyhow::Result<()> {
    let output = client
        .update_shard_count()
        .stream_name(stream_name)
        .target_shard_count(target_shard_count)
        .scaling_type(ScalingType::UniformScaling)
        .send()
        .await?;
    println!(
        "Scaling stream `{}` from {} to {} shard(s).",
        stream_name,
        output.current_shard_count().unwrap_or_default(),
        target_shard_count
    );
    Ok(())
}

async fn scale_up(client: &Client, stream_name: &str) -> anyhow::Result<()> {
    let current = open_shard_count(client, stream_name).await?;
    update_shard_count(client, stream_name, current * 2).await
}

async fn scale_down(client: &Client, stream_name: &str) -> anyhow::Result<()> {
    let current = open_shard_count(client, stream_name).await?;
    if current == 1 {
        println!("Stream `{}` already has a single shard.", stream_name);
        return Ok(());
    }
    update_shard_count(client, stream_name, current / 2).await
}

async fn split_shard(
    client: &Client,
    stream_name: &str,
    shard_id: usize,
    new_starting_hash_key: &str,
) -> anyhow::Result<()> {
    client
        .split_shard()
        .stream_name(stream_name)
        .shard_to_split(make_shard_id(shard_id))
        .new_starting_hash_key(new_starting_hash_key)
        .send()
        .await?;
    println!("Splitting shard {} of stream `{}`.", shard_id, stream_name);
    Ok(())
}

async fn merge_shards(
    client: &Client,
    stream_name: &str,
    shard_id: usize,
    adjacent_shard_id: usize,
) -> anyhow::Result<()> {
    client
        .merge_shards()
        .stream_name(stream_name)
        .shard_to_merge(make_shard_id(shard_id))
        .adjacent_shard_to_merge(make_shard_id(adjacent_shard_id))
        .send()
        .await?;
    println!(
        "Merging shards {} and {} of stream `{}`.",
        shard_id, adjacent_shard_id, stream_name
    );
    Ok(())
}

async fn set_retention(client: &Client, stream_name: &str, hours: i32) -> anyhow::Result<()> {
    let output = client
        .describe_stream_summary()
        .stream_name(stream_name)
        .send()
        .await?;
    let current = output
        .stream_description_summary()
        .context("missing stream description")?
        .retention_period_hours();

    if hours > current {
        client
            .increase_stream_retention_period()
            .stream_name(stream_name)
            .retention_period_hours(hours)
            .send()
            .await?;
    } else if hours < current {
        client
            .decrease_stream_retention_period()
            .stream_name(stream_name)
            .retention_period_hours(hours)
            .send()
            .await?;
    } else {
        println!(
            "Retention of stream `{}` is already {}h.",
            stream_name, hours
        );
        return Ok(());
    }
    println!(
        "Changed retention of stream `{}` from {}h to {}h.",
        stream_name, current, hours
    );
    Ok(())
}

async fn tag_stream(client: &Client, stream_name: &str, tags: &[String]) -> anyhow::Result<()> {
    let mut request = client.add_tags_to_stream().stream_name(stream_name);
    for tag in tags {
        let (key, value) = parse_tag(tag)?;
        request = request.tags(key, value);
    }
    request.send().await?;
    println!("Added {} tag(s) to stream `{}`.", tags.len(), stream_name);
    Ok(())
}

async fn untag_stream(
    client: &Client,
    stream_name: &str,
    tag_keys: Vec<String>,
) -> anyhow::Result<()> {
    let num_tags = tag_keys.len();
    client
        .remove_tags_from_stream()
        .stream_name(stream_name)
        .set_tag_keys(Some(tag_keys))
        .send()
        .await?;
    println!("Removed {} tag(s) from stream `{}`.", num_tags, stream_name);
    Ok(())
}

async fn list_tags(client: &Client, stream_name: &str) -> anyhow::Result<()> {
    let output = client
        .list_tags_for_stream()
        .stream_name(stream_name)
        .send()
        .await?;
    for tag in output.tags() {
        println!("{}={}", tag.key(), tag.value().unwrap_or_default());
    }
    Ok(())
}

fn parse_tag(tag: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = tag
        .split_once('=')
        .with_context(|| format!("expected `key=value`, got `{}`", tag))?;
    if key.is_empty() {
        bail!("expected `key=value`, got `{}`", tag);
    }
    Ok((key.to_string(), value.to_string()))
}

fn make_shard_id(id: usize) -> String {
    format!("shardId-{:0>12}", id)
}

impl KinesisCommand {
    pub async fn exec(self) -> anyhow::Result<()> {
        let config = aws::sdk_config(self.region, self.endpoint_url).await;
        let client = Client::new(&config);

        match self.subcommand {
            KinesisSubcommands::Create {
                stream_name,
                num_shards,
                on_demand,
            } => create_stream(&client, &stream_name, num_shards, on_demand).await?,
            KinesisSubcommands::Delete {
                stream_name,
                enforce_consumer_deletion,
                yes,
            } => delete_stream(&client, &stream_name, enforce_consumer_deletion, yes).await?,
            KinesisSubcommands::Describe { stream_name } => {
                describe_stream(&client, &stream_name).await?
            }
            KinesisSubcommands::List { limit, page_size } => {
                list_streams(&client, limit, page_size).await?
            }
            KinesisSubcommands::ListShards {
                stream_name,
                limit,
                page_size,
            } => list_shards(&client, &stream_name, limit, page_size).await?,
            KinesisSubcommands::ListConsumers {
                stream_arn,
                limit,
                page_size,
            } => list_consumers(&client, &stream_arn, limit, page_size).await?,
            KinesisSubcommands::RegisterConsumer {
                stream_arn,
                consumer_name,
            } => register_consumer(&client, &stream_arn, &consumer_name).await?,
            KinesisSubcommands::DeregisterConsumer {
                stream_arn,
                consumer_name,
            } => deregister_consumer(&client, &stream_arn, &consumer_name).await?,
            KinesisSubcommands::Push { stream_name } => push(&client, &stream_name).await?,
            KinesisSubcommands::Tail {
                stream_name,
                shard_id,
                trim_horizon,
            } => tail(&client, &stream_name, shard_id, trim_horizon).await?,
            KinesisSubcommands::ScaleUp { stream_name } => scale_up(&client, &stream_name).await?,
            KinesisSubcommands::ScaleDown { stream_name } => {
                scale_down(&client, &stream_name).await?
            }
            KinesisSubcommands::SplitShard {
                stream_name,
                shard_id,
                new_starting_hash_key,
            } => split_shard(&client, &stream_name, shard_id, &new_starting_hash_key).await?,
            KinesisSubcommands::MergeShards {
                stream_name,
                shard_id,
                adjacent_shard_id,
            } => merge_shards(&client, &stream_name, shard_id, adjacent_shard_id).await?,
            KinesisSubcommands::SetRetention { stream_name, hours } => {
                set_retention(&client, &stream_name, hours).await?
            }
            KinesisSubcommands::Tag { stream_name, tags } => {
                tag_stream(&client, &stream_name, &tags).await?
            }
            KinesisSubcommands::Untag {
                stream_name,
                tag_keys,
            } => untag_stream(&client, &stream_name, tag_keys).await?,
            KinesisSubcommands::ListTags { stream_name } => {
                list_tags(&client, &stream_name).await?
            }
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_kinesis::operation::describe_stream_summary::DescribeStreamSummaryOutput;
    use aws_sdk_kinesis::primitives::DateTime;
    use aws_sdk_kinesis::types::{EnhancedMetrics, StreamDescriptionSummary, StreamStatus};
    use aws_smithy_mocks::{mock, mock_client};

    use super::*;

    #[tokio::test]
    async fn test_open_shard_count_unwraps_stream_description() {
        let describe = mock!(Client::describe_stream_summary).then_output(|| {
            let summary = StreamDescriptionSummary::builder()
                .stream_name("users")
                .stream_arn("arn:aws:kinesis:us-east-1:123456789012:stream/users")
                .stream_status(StreamStatus::Active)
                .retention_period_hours(24)
                .stream_creation_timestamp(DateTime::from_secs(0))
                .open_shard_count(4)
                .enhanced_monitoring(EnhancedMetrics::builder().build())
                .build()
                .unwrap();
            DescribeStreamSummaryOutput::builder()
                .stream_description_summary(summary)
                .build()
        });
        let client = mock_client!(aws_sdk_kinesis, [&describe]);

        assert_eq!(open_shard_count(&client, "users").await.unwrap(), 4);
    }

    #[test]
    fn test_make_shard_id() {
        assert_eq!(make_shard_id(0), "shardId-000000000000");
        assert_eq!(make_shard_id(42), "shardId-000000000042");
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            parse_tag("team=ingest").unwrap(),
            ("team".to_string(), "ingest".to_string())
        );
        assert_eq!(
            parse_tag("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_tag("no-separator").is_err());
        assert!(parse_tag("=empty-key").is_err());
    }

    #[test]
    fn test_batcher_flushes_at_record_cap() {
        let mut batcher = RecordBatcher::new();
        for i in 0..MAX_BATCH_RECORDS - 1 {
            assert!(batcher.push(format!("record-{}", i)).unwrap().is_none());
        }
        let batch = batcher.push("last".to_string()).unwrap().unwrap();
        assert_eq!(batch.len(), MAX_BATCH_RECORDS);
        assert!(batcher.finish().is_empty());
    }

    #[test]
    fn test_batcher_flushes_before_exceeding_byte_cap() {
        let mut batcher = RecordBatcher::new();
        let big_line = "x".repeat(ONE_MIB);
        for _ in 0..5 {
            assert!(batcher.push(big_line.clone()).unwrap().is_none());
        }
        // A sixth 1 MiB record would push the batch over 5 MiB.
        let batch = batcher.push(big_line).unwrap().unwrap();
        assert_eq!(batch.len(), 5);
        assert_eq!(batcher.finish().len(), 1);
    }

    #[test]
    fn test_batcher_rejects_oversized_record() {
        let mut batcher = RecordBatcher::new();
        assert!(batcher.push("x".repeat(ONE_MIB + 1)).is_err());
        assert!(batcher.finish().is_empty());
    }

    #[tokio::test]
    async fn test_push_lines_counts_skipped_lines_separately() {
        let config = aws_config::SdkConfig::builder()
            .behavior_version(aws_config::BehaviorVersion::latest())
            .build();
        let client = Client::new(&config);
        let big_line = "x".repeat(ONE_MIB + 1);
        // Two consecutive oversized lines, then one small record. Nothing
        // here fills a batch, so no request is sent.
        let input = format!("{}\n{}\nsmall\n", big_line, big_line);
        let lines = tokio::io::BufReader::new(input.as_bytes()).lines();
        let mut batcher = RecordBatcher::new();

        let summary = push_lines(&client, "test-stream", lines, &mut batcher)
            .await
            .unwrap();
        assert_eq!(summary.num_lines, 3);
        assert_eq!(summary.num_records, 1);
        assert_eq!(summary.num_bytes, 5);
        assert_eq!(batcher.finish().len(), 1);
    }

    #[test]
    fn test_batcher_partition_key_is_stable() {
        let mut batcher = RecordBatcher::new();
        batcher.push("hello".to_string()).unwrap();
        batcher.push("hello".to_string()).unwrap();
        let batch = batcher.finish();
        assert_eq!(batch[0].partition_key(), batch[1].partition_key());
    }
}
