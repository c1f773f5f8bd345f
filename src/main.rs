use clap::{Parser, Subcommand};

mod aws;
mod bench;
mod kinesis;
mod paging;
mod s3tables;
mod term;

use bench::BenchCommand;
use kinesis::KinesisCommand;
use s3tables::S3TablesCommand;

#[derive(Parser)]
#[clap(version, about = "Command-line wrappers for AWS Kinesis and S3 Tables")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[clap(alias = "ki")]
    Kinesis(KinesisCommand),
    #[clap(name = "s3tables", alias = "s3t")]
    S3Tables(S3TablesCommand),
    Bench(BenchCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Kinesis(subcommand) => subcommand.exec().await?,
        Commands::S3Tables(subcommand) => subcommand.exec().await?,
        Commands::Bench(subcommand) => subcommand.exec().await?,
    }
    Ok(())
}
