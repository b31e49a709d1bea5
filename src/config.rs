//! Run configuration.
//!
//! [`EtlConfig`] is resolved once in `main` from the command line, the
//! environment and an optional YAML file, then handed to the pipeline. Nothing
//! downstream reads the environment.
//!
//! ```yaml
//! secret_name: qiita-api-token
//! region_name: ap-northeast-1
//! s3_bucket_name: qiita-etl-project-bucket
//! dynamodb_table_name: qiita-etl-project-articles
//! qiita_get_items_api_url: https://qiita.com/api/v2/items
//! lookback_days: 7
//! top_n: 20
//! cutoff_mode: last-item
//! ```

use crate::archive::DEFAULT_CONCURRENCY;
use crate::cli::Cli;
use crate::error::ConfigError;
use crate::rank::DEFAULT_TOP_N;
use crate::source::{CutoffMode, DEFAULT_API_URL};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

pub const DEFAULT_REGION: &str = "ap-northeast-1";
pub const DEFAULT_BUCKET: &str = "qiita-etl-project-bucket";
pub const DEFAULT_TABLE: &str = "qiita-etl-project-articles";
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 100;
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// Settings read from the YAML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub secret_name: Option<String>,
    pub region_name: Option<String>,
    pub s3_bucket_name: Option<String>,
    pub dynamodb_table_name: Option<String>,
    pub qiita_get_items_api_url: Option<String>,
    pub api_token: Option<String>,
    pub lookback_days: Option<i64>,
    pub top_n: Option<usize>,
    pub concurrency: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub max_pages: Option<u32>,
    pub cutoff_mode: Option<CutoffMode>,
    pub local_dir: Option<PathBuf>,
}

impl FileConfig {
    #[instrument(level = "info")]
    pub async fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).await.map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let parsed = Self::parse(path, &raw)?;
        info!("Loaded config file");
        Ok(parsed)
    }

    fn parse(path: &str, raw: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub secret_name: Option<String>,
    pub api_token: Option<String>,
    pub region: String,
    pub bucket: String,
    pub table: String,
    pub api_url: String,
    pub lookback: chrono::Duration,
    pub top_n: usize,
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub max_pages: u32,
    pub cutoff_mode: CutoffMode,
    /// When set, storage goes to the filesystem under this directory.
    pub local_dir: Option<PathBuf>,
}

impl EtlConfig {
    /// Merge command line over file over defaults and validate the result.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] when bucket or table is unset for an AWS run,
    /// [`ConfigError::Invalid`] for out-of-range numbers.
    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let local_dir = cli.local_dir.or(file.local_dir);
        let is_local = local_dir.is_some();

        let bucket = match cli.s3_bucket_name.or(file.s3_bucket_name) {
            Some(bucket) => bucket,
            None if is_local => DEFAULT_BUCKET.to_string(),
            None => return Err(ConfigError::Missing("s3_bucket_name")),
        };
        let table = match cli.dynamodb_table_name.or(file.dynamodb_table_name) {
            Some(table) => table,
            None if is_local => DEFAULT_TABLE.to_string(),
            None => return Err(ConfigError::Missing("dynamodb_table_name")),
        };

        let lookback_days = cli
            .lookback_days
            .or(file.lookback_days)
            .unwrap_or(DEFAULT_LOOKBACK_DAYS);
        if lookback_days < 0 {
            return Err(ConfigError::Invalid {
                name: "lookback_days",
                reason: format!("must not be negative, got {lookback_days}"),
            });
        }
        let lookback =
            chrono::Duration::try_days(lookback_days).ok_or_else(|| ConfigError::Invalid {
                name: "lookback_days",
                reason: format!("{lookback_days} is out of range"),
            })?;

        let top_n = at_least_one("top_n", cli.top_n.or(file.top_n).unwrap_or(DEFAULT_TOP_N))?;
        let concurrency = at_least_one(
            "concurrency",
            cli.concurrency
                .or(file.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY),
        )?;
        let max_pages = at_least_one(
            "max_pages",
            cli.max_pages.or(file.max_pages).unwrap_or(DEFAULT_MAX_PAGES),
        )?;
        let timeout_secs = at_least_one(
            "request_timeout_secs",
            cli.request_timeout_secs
                .or(file.request_timeout_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )?;

        Ok(Self {
            secret_name: cli.secret_name.or(file.secret_name),
            api_token: cli.api_token.or(file.api_token),
            region: cli
                .region_name
                .or(file.region_name)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            bucket,
            table,
            api_url: cli
                .qiita_get_items_api_url
                .or(file.qiita_get_items_api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            lookback,
            top_n,
            concurrency,
            request_timeout: Duration::from_secs(timeout_secs),
            max_pages,
            cutoff_mode: cli.cutoff_mode.or(file.cutoff_mode).unwrap_or_default(),
            local_dir,
        })
    }
}

fn at_least_one<N>(name: &'static str, value: N) -> Result<N, ConfigError>
where
    N: PartialOrd + From<u8> + std::fmt::Display,
{
    if value < N::from(1) {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("must be at least 1, got {value}"),
        });
    }
    Ok(value)
}
