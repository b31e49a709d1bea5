//! # Qiita ETL
//!
//! A weekly batch job that pulls recently published Qiita articles, archives a
//! raw copy and a structured row for each one, and publishes a TSV report of
//! the most-liked articles.
//!
//! ## Usage
//!
//! ```sh
//! qiita_etl --secret-name qiita-api-token \
//!     --s3-bucket-name qiita-etl-project-bucket \
//!     --dynamodb-table-name qiita-etl-project-articles
//! ```
//!
//! ## Architecture
//!
//! The run is a fixed sequence:
//! 1. **Fetching**: page through the items API until the lookback cutoff
//! 2. **Archiving**: raw JSON to S3 and a row to DynamoDB per article (20 at a time)
//! 3. **Ranking**: top 20 by likes
//! 4. **Reporting**: TSV report uploaded under today's date
//!
//! Bad configuration, an unreadable secret or a failed fetch makes the process
//! exit non-zero. Archive and report upload failures are logged and counted.

use clap::Parser;
use std::error::Error;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod archive;
mod cli;
mod config;
mod credentials;
mod error;
mod models;
mod pipeline;
mod rank;
mod report;
mod source;
mod storage;
mod utils;

use cli::Cli;
use config::{EtlConfig, FileConfig};
use credentials::{SecretsManagerTokenProvider, StaticTokenProvider, TokenProvider};
use error::{CredentialError, RunError};
use pipeline::{Pipeline, PipelineOptions, RunSummary};
use source::QiitaClient;
use storage::aws::{DynamoArticleTable, S3BlobStore, load_sdk_config};
use storage::local::{LocalArticleTable, LocalBlobStore};
use utils::run_date;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("qiita_etl starting up");

    let summary = match run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, elapsed = ?start_time.elapsed(), "Run aborted");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        fetched = summary.fetched,
        archived = summary.archived,
        archive_failed = summary.archive_failed,
        orphaned_blobs = summary.orphaned_blobs.len(),
        ranked = summary.ranked,
        report_key = summary.report_key.as_deref().unwrap_or("<not published>"),
        "Execution complete"
    );

    Ok(())
}

async fn run() -> Result<RunSummary, RunError> {
    let args = Cli::parse();
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path).await?,
        None => FileConfig::default(),
    };
    let config = EtlConfig::resolve(args, file_config)?;
    info!(
        api_url = %config.api_url,
        region = %config.region,
        bucket = %config.bucket,
        table = %config.table,
        lookback_days = config.lookback.num_days(),
        top_n = config.top_n,
        cutoff_mode = ?config.cutoff_mode,
        local_dir = ?config.local_dir,
        "Resolved configuration"
    );

    // Credentials are resolved lazily by the SDK, so a local run never touches AWS
    // unless it asks for a secret.
    let sdk_config = load_sdk_config(&config.region).await;
    let token = resolve_token(&config, &sdk_config).await?;

    let client = QiitaClient::new(&config.api_url, token, config.request_timeout)?
        .with_max_pages(config.max_pages)
        .with_cutoff_mode(config.cutoff_mode);
    let options = PipelineOptions::from(&config);
    let date = run_date();

    let summary = match &config.local_dir {
        Some(root) => {
            Pipeline::new(
                client,
                LocalBlobStore::new(root.join(&config.bucket)),
                LocalArticleTable::new(root.join(&config.table)),
                options,
            )
            .run(date)
            .await?
        }
        None => {
            Pipeline::new(
                client,
                S3BlobStore::new(&sdk_config, &config.bucket),
                DynamoArticleTable::new(&sdk_config, &config.table),
                options,
            )
            .run(date)
            .await?
        }
    };
    Ok(summary)
}

/// An explicit token wins; otherwise the secret is read once; otherwise anonymous.
#[instrument(level = "info", skip_all)]
async fn resolve_token(
    config: &EtlConfig,
    sdk_config: &aws_config::SdkConfig,
) -> Result<Option<String>, CredentialError> {
    if config.api_token.is_some() {
        return StaticTokenProvider::new(config.api_token.clone())
            .api_token()
            .await;
    }
    match &config.secret_name {
        Some(secret_name) => {
            SecretsManagerTokenProvider::new(sdk_config, secret_name)
                .api_token()
                .await
        }
        None => {
            warn!("No API token or secret configured; requesting anonymously");
            StaticTokenProvider::default().api_token().await
        }
    }
}
