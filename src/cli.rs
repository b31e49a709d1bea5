//! Command-line interface definitions.
//!
//! Every setting can come from a flag, an environment variable, or the YAML
//! file named by `--config`. Flags and environment win over the file; the
//! file wins over built-in defaults (see [`crate::config::EtlConfig::resolve`]).
//! The underscore aliases match the argument names the job scheduler passes.

use crate::source::CutoffMode;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the ETL job.
///
/// # Examples
///
/// ```sh
/// # Against AWS, token from Secrets Manager
/// qiita_etl --secret-name qiita-api-token --region-name ap-northeast-1 \
///     --s3-bucket-name qiita-etl-project-bucket \
///     --dynamodb-table-name qiita-etl-project-articles
///
/// # Local dry run into ./out with a token from the environment
/// QIITA_API_TOKEN=... qiita_etl --local-dir ./out
/// ```
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Secrets Manager secret holding the API token
    #[arg(long, alias = "secret_name", env = "QIITA_SECRET_NAME")]
    pub secret_name: Option<String>,

    /// AWS region for Secrets Manager, S3 and DynamoDB [default: ap-northeast-1]
    #[arg(long, alias = "region_name", env = "AWS_REGION")]
    pub region_name: Option<String>,

    /// Bucket for raw articles and the report
    #[arg(long, alias = "s3_bucket_name", env = "S3_BUCKET_NAME")]
    pub s3_bucket_name: Option<String>,

    /// Table for structured article rows
    #[arg(long, alias = "dynamodb_table_name", env = "DYNAMODB_TABLE_NAME")]
    pub dynamodb_table_name: Option<String>,

    /// Items endpoint [default: https://qiita.com/api/v2/items]
    #[arg(long, alias = "qiita_get_items_api_url", env = "QIITA_API_URL")]
    pub qiita_get_items_api_url: Option<String>,

    /// API token; skips the Secrets Manager lookup
    #[arg(long, env = "QIITA_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Lookback window in days [default: 7]
    #[arg(long)]
    pub lookback_days: Option<i64>,

    /// Number of articles in the report [default: 20]
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Archive uploads in flight at once [default: 20]
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-request timeout for the items API in seconds [default: 100]
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Upper bound on pages fetched [default: 100]
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// How the lookback cutoff is applied to each page [default: last-item]
    #[arg(long, value_enum)]
    pub cutoff_mode: Option<CutoffMode>,

    /// Write to this directory instead of S3 and DynamoDB
    #[arg(long, env = "QIITA_ETL_LOCAL_DIR")]
    pub local_dir: Option<PathBuf>,
}
