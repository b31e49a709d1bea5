//! Run orchestration: fetch → archive → rank → report → publish.
//!
//! Only a fetch failure aborts the run. Archive failures are collected into
//! the [`RunSummary`] and a failed report upload is logged and left out of it;
//! in both cases the run still completes.

use crate::archive::{ArticleArchiver, DEFAULT_CONCURRENCY};
use crate::config::EtlConfig;
use crate::error::FetchError;
use crate::rank::{DEFAULT_TOP_N, top_n};
use crate::report::{self, ReportPublisher};
use crate::source::ArticleSource;
use crate::storage::{ArticleTable, BlobStore};
use chrono::NaiveDate;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Tunables the pipeline needs from [`EtlConfig`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub lookback: chrono::Duration,
    pub top_n: usize,
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            lookback: chrono::Duration::days(7),
            top_n: DEFAULT_TOP_N,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl From<&EtlConfig> for PipelineOptions {
    fn from(config: &EtlConfig) -> Self {
        Self {
            lookback: config.lookback,
            top_n: config.top_n,
            concurrency: config.concurrency,
        }
    }
}

/// What a completed run did.
#[derive(Debug)]
pub struct RunSummary {
    pub fetched: usize,
    pub archived: usize,
    pub archive_failed: usize,
    /// Blobs written without a matching table row.
    pub orphaned_blobs: Vec<String>,
    pub ranked: usize,
    /// `None` when the report upload failed.
    pub report_key: Option<String>,
    pub elapsed: Duration,
}

/// One ETL run over a source and two storage backends.
#[derive(Debug)]
pub struct Pipeline<S, B, T> {
    source: S,
    blobs: B,
    table: T,
    options: PipelineOptions,
}

impl<S, B, T> Pipeline<S, B, T>
where
    S: ArticleSource,
    B: BlobStore,
    T: ArticleTable,
{
    pub fn new(source: S, blobs: B, table: T, options: PipelineOptions) -> Self {
        Self {
            source,
            blobs,
            table,
            options,
        }
    }

    /// Run every step once, partitioning storage keys by `date`.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] if fetching fails; nothing is archived or
    /// published in that case.
    #[instrument(level = "info", skip(self), fields(top_n = self.options.top_n))]
    pub async fn run(&self, date: NaiveDate) -> Result<RunSummary, FetchError> {
        let start = Instant::now();

        let articles = self.source.fetch_recent(self.options.lookback).await?;
        info!(count = articles.len(), "Fetched articles");

        let archive = ArticleArchiver::new(&self.blobs, &self.table, date)
            .with_concurrency(self.options.concurrency)
            .archive_all(&articles)
            .await;
        let orphaned_blobs: Vec<String> = archive.orphaned_blobs().map(str::to_owned).collect();
        if archive.failed_count() > 0 {
            warn!(
                failed = archive.failed_count(),
                orphaned = orphaned_blobs.len(),
                "Some articles were not archived"
            );
        }

        let ranked = top_n(&articles, self.options.top_n);
        let tsv = report::serialize(&report::to_report(ranked.iter().copied()));

        let report_key = match ReportPublisher::new(&self.blobs, date).publish(tsv).await {
            Ok(key) => Some(key),
            Err(e) => {
                error!(error = %e, "Failed to upload report");
                None
            }
        };

        Ok(RunSummary {
            fetched: articles.len(),
            archived: archive.archived.len(),
            archive_failed: archive.failed_count(),
            orphaned_blobs,
            ranked: ranked.len(),
            report_key,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;
    use crate::models::fixtures::article;
    use crate::source::QiitaClient;
    use crate::storage::memory::{MemoryArticleTable, MemoryBlobStore};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Source returning a fixed batch.
    struct FixedSource(Vec<Article>);

    impl ArticleSource for FixedSource {
        async fn fetch_recent(&self, _lookback: chrono::Duration) -> Result<Vec<Article>, FetchError> {
            Ok(self.0.clone())
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    fn batch(n: u64) -> Vec<Article> {
        (0..n)
            .map(|i| article(&format!("id{i}"), "2025-05-06T09:15:00+09:00", i))
            .collect()
    }

    #[tokio::test]
    async fn full_run_archives_ranks_and_publishes() {
        let blobs = MemoryBlobStore::default();
        let table = MemoryArticleTable::default();
        let pipeline = Pipeline::new(
            FixedSource(batch(25)),
            &blobs,
            &table,
            PipelineOptions::default(),
        );

        let summary = pipeline.run(date()).await.unwrap();

        assert_eq!(summary.fetched, 25);
        assert_eq!(summary.archived, 25);
        assert_eq!(summary.archive_failed, 0);
        assert_eq!(summary.ranked, 20);
        let key = summary.report_key.unwrap();
        assert_eq!(key, "articles/processed/2025-05-06/weekly_filtered_top20.tsv");

        let tsv = String::from_utf8(blobs.get(&key).unwrap()).unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 21);
        assert!(lines[1].starts_with("id24\t"));
        assert!(lines[20].starts_with("id5\t"));
        assert_eq!(table.len(), 25);
    }

    #[tokio::test]
    async fn archive_failure_does_not_stop_report() {
        let blobs = MemoryBlobStore::default();
        let table = MemoryArticleTable::default();
        blobs.fail_when_key_contains("/id3.json");
        let pipeline = Pipeline::new(
            FixedSource(batch(10)),
            &blobs,
            &table,
            PipelineOptions::default(),
        );

        let summary = pipeline.run(date()).await.unwrap();

        assert_eq!(summary.archived, 9);
        assert_eq!(summary.archive_failed, 1);
        assert_eq!(table.len(), 9);
        // The report is built from the fetched list, so it still has all ten.
        assert_eq!(summary.ranked, 10);
        assert!(summary.report_key.is_some());
    }

    #[tokio::test]
    async fn orphaned_blobs_surface_in_summary() {
        let blobs = MemoryBlobStore::default();
        let table = MemoryArticleTable::default();
        table.fail_for("id0");
        let pipeline = Pipeline::new(
            FixedSource(batch(2)),
            &blobs,
            &table,
            PipelineOptions::default(),
        );

        let summary = pipeline.run(date()).await.unwrap();

        assert_eq!(
            summary.orphaned_blobs,
            vec!["articles/original/2025-05-06/id0.json".to_string()]
        );
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed() {
        let blobs = MemoryBlobStore::default();
        blobs.fail_when_key_contains("articles/processed/");
        let table = MemoryArticleTable::default();
        let pipeline = Pipeline::new(
            FixedSource(batch(3)),
            &blobs,
            &table,
            PipelineOptions::default(),
        );

        let summary = pipeline.run(date()).await.unwrap();

        assert_eq!(summary.archived, 3);
        assert!(summary.report_key.is_none());
    }

    #[tokio::test]
    async fn empty_fetch_still_publishes_header_only_report() {
        let blobs = MemoryBlobStore::default();
        let table = MemoryArticleTable::default();
        let pipeline = Pipeline::new(
            FixedSource(vec![]),
            &blobs,
            &table,
            PipelineOptions::default(),
        );

        let summary = pipeline.run(date()).await.unwrap();

        assert_eq!(summary.fetched, 0);
        let tsv = blobs.get(&summary.report_key.unwrap()).unwrap();
        assert_eq!(String::from_utf8(tsv).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_on_first_page_aborts_before_archiving() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/items"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        let source = QiitaClient::new(
            &format!("{}/api/v2/items", server.uri()),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let blobs = MemoryBlobStore::default();
        let table = MemoryArticleTable::default();
        let pipeline = Pipeline::new(source, &blobs, &table, PipelineOptions::default());

        let result = pipeline.run(date()).await;

        assert!(matches!(
            result,
            Err(FetchError::UnexpectedStatus { status: 500, .. })
        ));
        assert!(blobs.keys().is_empty());
        assert_eq!(table.len(), 0);
    }
}
