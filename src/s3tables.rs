use aws_sdk_s3tables::error::DisplayErrorContext;
use aws_sdk_s3tables::types::OpenTableFormat;
use aws_sdk_s3tables::Client;
use clap::{Args, Subcommand};

use crate::aws;
use crate::paging::PageBudget;
use crate::term::confirm;

#[derive(Args)]
pub struct S3TablesCommand {
    #[clap(global = true, long)]
    region: Option<String>,
    #[clap(global = true, long)]
    endpoint_url: Option<String>,
    #[clap(subcommand)]
    subcommand: S3TablesSubcommands,
}

#[derive(Subcommand)]
pub enum S3TablesSubcommands {
    CreateBucket {
        #[clap(long)]
        name: String,
    },
    DeleteBucket {
        #[clap(long)]
        bucket_arn: String,
        #[clap(long)]
        yes: bool,
    },
    GetBucket {
        #[clap(long)]
        bucket_arn: String,
    },
    #[clap(alias = "lsb")]
    ListBuckets {
        #[clap(long)]
        prefix: Option<String>,
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long)]
        page_size: Option<i32>,
    },
    CreateNamespace {
        #[clap(long)]
        bucket_arn: String,
        #[clap(long)]
        namespace: String,
    },
    DeleteNamespace {
        #[clap(long)]
        bucket_arn: String,
        #[clap(long)]
        namespace: String,
        #[clap(long)]
        yes: bool,
    },
    GetNamespace {
        #[clap(long)]
        bucket_arn: String,
        #[clap(long)]
        namespace: String,
    },
    #[clap(alias = "lsn")]
    ListNamespaces {
        #[clap(long)]
        bucket_arn: String,
        #[clap(long)]
        prefix: Option<String>,
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long)]
        page_size: Option<i32>,
    },
    CreateTable {
        #[clap(long)]
        bucket_arn: String,
        #[clap(long)]
        namespace: String,
        #[clap(long)]
        name: String,
    },
    DeleteTable {
        #[clap(long)]
        bucket_arn: String,
        #[clap(long)]
        namespace: String,
        #[clap(long)]
        name: String,
        #[clap(long)]
        yes: bool,
    },
    GetTable {
        #[clap(long)]
        bucket_arn: String,
        #[clap(long)]
        namespace: String,
        #[clap(long)]
        name: String,
    },
    #[clap(alias = "lst")]
    ListTables {
        #[clap(long)]
        bucket_arn: String,
        #[clap(long)]
        namespace: Option<String>,
        #[clap(long)]
        prefix: Option<String>,
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long)]
        page_size: Option<i32>,
    },
    RenameTable {
        #[clap(long)]
        bucket_arn: String,
        #[clap(long)]
        namespace: String,
        #[clap(long)]
        name: String,
        #[clap(long)]
        new_namespace: Option<String>,
        #[clap(long)]
        new_name: Option<String>,
    },
}

async fn create_bucket(client: &Client, name: &str) -> anyhow::Result<()> {
    let output = client.create_table_bucket().name(name).send().await?;
    println!("Created table bucket `{}` ({}).", name, output.arn());
    Ok(())
}

async fn delete_bucket(client: &Client, bucket_arn: &str, yes: bool) -> anyhow::Result<()> {
    if !confirm(&format!("Delete table bucket `{}`?", bucket_arn), yes)? {
        println!("Aborted.");
        return Ok(());
    }
    client
        .delete_table_bucket()
        .table_bucket_arn(bucket_arn)
        .send()
        .await?;
    println!("Deleted table bucket `{}` successfully.", bucket_arn);
    Ok(())
}

async fn get_bucket(client: &Client, bucket_arn: &str) -> anyhow::Result<()> {
    let output = client
        .get_table_bucket()
        .table_bucket_arn(bucket_arn)
        .send()
        .await?;
    println!("name:    {}", output.name());
    println!("arn:     {}", output.arn());
    println!("owner:   {}", output.owner_account_id());
    println!("created: {:?}", output.created_at());
    Ok(())
}

async fn list_buckets(
    client: &Client,
    prefix: Option<&str>,
    limit: Option<usize>,
    page_size: Option<i32>,
) -> anyhow::Result<()> {
    let mut budget = PageBudget::new(limit, page_size);
    let mut continuation_token: Option<String> = None;
    let mut first_page = true;

    loop {
        let mut request = client.list_table_buckets();
        if let Some(prefix) = prefix {
            request = request.prefix(prefix);
        }
        if let Some(page_size) = budget.request_size() {
            request = request.max_buckets(page_size);
        }
        if let Some(token) = continuation_token.take() {
            request = request.continuation_token(token);
        }
        let output = match request.send().await {
            Ok(output) => output,
            Err(err) if first_page => return Err(err.into()),
            Err(err) => {
                tracing::warn!(error = %DisplayErrorContext(&err), "stopped listing table buckets");
                break;
            }
        };
        first_page = false;

        let buckets = budget.clamp(output.table_buckets().to_vec());
        let num_emitted = buckets.len();
        for bucket in buckets {
            println!("{}\t{}", bucket.name(), bucket.arn());
        }
        continuation_token = output.continuation_token().map(String::from);
        if continuation_token.is_none() || !budget.consume(num_emitted) {
            break;
        }
    }
    Ok(())
}

async fn create_namespace(client: &Client, bucket_arn: &str, namespace: &str) -> anyhow::Result<()> {
    let output = client
        .create_namespace()
        .table_bucket_arn(bucket_arn)
        .namespace(namespace)
        .send()
        .await?;
    println!(
        "Created namespace `{}` in table bucket `{}`.",
        output.namespace().join("."),
        bucket_arn
    );
    Ok(())
}

async fn delete_namespace(
    client: &Client,
    bucket_arn: &str,
    namespace: &str,
    yes: bool,
) -> anyhow::Result<()> {
    if !confirm(&format!("Delete namespace `{}`?", namespace), yes)? {
        println!("Aborted.");
        return Ok(());
    }
    client
        .delete_namespace()
        .table_bucket_arn(bucket_arn)
        .namespace(namespace)
        .send()
        .await?;
    println!("Deleted namespace `{}` successfully.", namespace);
    Ok(())
}

async fn get_namespace(client: &Client, bucket_arn: &str, namespace: &str) -> anyhow::Result<()> {
    let output = client
        .get_namespace()
        .table_bucket_arn(bucket_arn)
        .namespace(namespace)
        .send()
        .await?;
    println!("namespace: {}", output.namespace().join("."));
    println!("owner:     {}", output.owner_account_id());
    println!("creator:   {}", output.created_by());
    println!("created:   {:?}", output.created_at());
    Ok(())
}

async fn list_namespaces(
    client: &Client,
    bucket_arn: &str,
    prefix: Option<&str>,
    limit: Option<usize>,
    page_size: Option<i32>,
) -> anyhow::Result<()> {
    let mut budget = PageBudget::new(limit, page_size);
    let mut continuation_token: Option<String> = None;
    let mut first_page = true;

    loop {
        let mut request = client.list_namespaces().table_bucket_arn(bucket_arn);
        if let Some(prefix) = prefix {
            request = request.prefix(prefix);
        }
        if let Some(page_size) = budget.request_size() {
            request = request.max_namespaces(page_size);
        }
        if let Some(token) = continuation_token.take() {
            request = request.continuation_token(token);
        }
        let output = match request.send().await {
            Ok(output) => output,
            Err(err) if first_page => return Err(err.into()),
            Err(err) => {
                tracing::warn!(error = %DisplayErrorContext(&err), "stopped listing namespaces");
                break;
            }
        };
        first_page = false;

        let namespaces = budget.clamp(output.namespaces().to_vec());
        let num_emitted = namespaces.len();
        for namespace in namespaces {
            println!("{}", namespace.namespace().join("."));
        }
        continuation_token = output.continuation_token().map(String::from);
        if continuation_token.is_none() || !budget.consume(num_emitted) {
            break;
        }
    }
    Ok(())
}

async fn create_table(
    client: &Client,
    bucket_arn: &str,
    namespace: &str,
    name: &str,
) -> anyhow::Result<()> {
    let output = client
        .create_table()
        .table_bucket_arn(bucket_arn)
        .namespace(namespace)
        .name(name)
        .format(OpenTableFormat::Iceberg)
        .send()
        .await?;
    println!(
        "Created table `{}.{}` ({}).",
        namespace,
        name,
        output.table_arn()
    );
    Ok(())
}

async fn delete_table(
    client: &Client,
    bucket_arn: &str,
    namespace: &str,
    name: &str,
    yes: bool,
) -> anyhow::Result<()> {
    if !confirm(&format!("Delete table `{}.{}`?", namespace, name), yes)? {
        println!("Aborted.");
        return Ok(());
    }
    client
        .delete_table()
        .table_bucket_arn(bucket_arn)
        .namespace(namespace)
        .name(name)
        .send()
        .await?;
    println!("Deleted table `{}.{}` successfully.", namespace, name);
    Ok(())
}

async fn get_table(
    client: &Client,
    bucket_arn: &str,
    namespace: &str,
    name: &str,
) -> anyhow::Result<()> {
    let output = client
        .get_table()
        .table_bucket_arn(bucket_arn)
        .namespace(namespace)
        .name(name)
        .send()
        .await?;
    println!("name:      {}", output.name());
    println!("namespace: {}", output.namespace().join("."));
    println!("arn:       {}", output.table_arn());
    println!("type:      {}", output.r#type().as_str());
    println!("format:    {}", output.format().as_str());
    println!("warehouse: {}", output.warehouse_location());
    if let Some(metadata_location) = output.metadata_location() {
        println!("metadata:  {}", metadata_location);
    }
    println!("version:   {}", output.version_token());
    println!("created:   {:?}", output.created_at());
    println!("modified:  {:?}", output.modified_at());
    Ok(())
}

async fn list_tables(
    client: &Client,
    bucket_arn: &str,
    namespace: Option<&str>,
    prefix: Option<&str>,
    limit: Option<usize>,
    page_size: Option<i32>,
) -> anyhow::Result<()> {
    let mut budget = PageBudget::new(limit, page_size);
    let mut continuation_token: Option<String> = None;
    let mut first_page = true;

    loop {
        let mut request = client.list_tables().table_bucket_arn(bucket_arn);
        if let Some(namespace) = namespace {
            request = request.namespace(namespace);
        }
        if let Some(prefix) = prefix {
            request = request.prefix(prefix);
        }
        if let Some(page_size) = budget.request_size() {
            request = request.max_tables(page_size);
        }
        if let Some(token) = continuation_token.take() {
            request = request.continuation_token(token);
        }
        let output = match request.send().await {
            Ok(output) => output,
            Err(err) if first_page => return Err(err.into()),
            Err(err) => {
                tracing::warn!(error = %DisplayErrorContext(&err), "stopped listing tables");
                break;
            }
        };
        first_page = false;

        let tables = budget.clamp(output.tables().to_vec());
        let num_emitted = tables.len();
        for table in tables {
            println!(
                "{}.{}\t{}",
                table.namespace().join("."),
                table.name(),
                table.table_arn()
            );
        }
        continuation_token = output.continuation_token().map(String::from);
        if continuation_token.is_none() || !budget.consume(num_emitted) {
            break;
        }
    }
    Ok(())
}

async fn rename_table(
    client: &Client,
    bucket_arn: &str,
    namespace: &str,
    name: &str,
    new_namespace: Option<&str>,
    new_name: Option<&str>,
) -> anyhow::Result<()> {
    let mut request = client
        .rename_table()
        .table_bucket_arn(bucket_arn)
        .namespace(namespace)
        .name(name);
    if let Some(new_namespace) = new_namespace {
        request = request.new_namespace_name(new_namespace);
    }
    if let Some(new_name) = new_name {
        request = request.new_name(new_name);
    }
    request.send().await?;
    println!(
        "Renamed table `{}.{}` to `{}.{}`.",
        namespace,
        name,
        new_namespace.unwrap_or(namespace),
        new_name.unwrap_or(name)
    );
    Ok(())
}

impl S3TablesCommand {
    pub async fn exec(self) -> anyhow::Result<()> {
        let config = aws::sdk_config(self.region, self.endpoint_url).await;
        let client = Client::new(&config);

        match self.subcommand {
            S3TablesSubcommands::CreateBucket { name } => create_bucket(&client, &name).await?,
            S3TablesSubcommands::DeleteBucket { bucket_arn, yes } => {
                delete_bucket(&client, &bucket_arn, yes).await?
            }
            S3TablesSubcommands::GetBucket { bucket_arn } => {
                get_bucket(&client, &bucket_arn).await?
            }
            S3TablesSubcommands::ListBuckets {
                prefix,
                limit,
                page_size,
            } => list_buckets(&client, prefix.as_deref(), limit, page_size).await?,
            S3TablesSubcommands::CreateNamespace {
                bucket_arn,
                namespace,
            } => create_namespace(&client, &bucket_arn, &namespace).await?,
            S3TablesSubcommands::DeleteNamespace {
                bucket_arn,
                namespace,
                yes,
            } => delete_namespace(&client, &bucket_arn, &namespace, yes).await?,
            S3TablesSubcommands::GetNamespace {
                bucket_arn,
                namespace,
            } => get_namespace(&client, &bucket_arn, &namespace).await?,
            S3TablesSubcommands::ListNamespaces {
                bucket_arn,
                prefix,
                limit,
                page_size,
            } => {
                list_namespaces(&client, &bucket_arn, prefix.as_deref(), limit, page_size).await?
            }
            S3TablesSubcommands::CreateTable {
                bucket_arn,
                namespace,
                name,
            } => create_table(&client, &bucket_arn, &namespace, &name).await?,
            S3TablesSubcommands::DeleteTable {
                bucket_arn,
                namespace,
                name,
                yes,
            } => delete_table(&client, &bucket_arn, &namespace, &name, yes).await?,
            S3TablesSubcommands::GetTable {
                bucket_arn,
                namespace,
                name,
            } => get_table(&client, &bucket_arn, &namespace, &name).await?,
            S3TablesSubcommands::ListTables {
                bucket_arn,
                namespace,
                prefix,
                limit,
                page_size,
            } => {
                list_tables(
                    &client,
                    &bucket_arn,
                    namespace.as_deref(),
                    prefix.as_deref(),
                    limit,
                    page_size,
                )
                .await?
            }
            S3TablesSubcommands::RenameTable {
                bucket_arn,
                namespace,
                name,
                new_namespace,
                new_name,
            } => {
                rename_table(
                    &client,
                    &bucket_arn,
                    &namespace,
                    &name,
                    new_namespace.as_deref(),
                    new_name.as_deref(),
                )
                .await?
            }
        };
        Ok(())
    }
}
