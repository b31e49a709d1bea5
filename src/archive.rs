//! Archiving of fetched articles: raw JSON blob plus a structured table row.
//!
//! Each article is archived by two sequential writes:
//! 1. the article as received, to `articles/original/<date>/<id>.json`
//! 2. an [`ArchiveRecord`] row keyed by article id, pointing at that blob
//!
//! The writes are not transactional. When the row write fails the blob stays
//! behind without a row, and [`ArchiveError::Table`] records its key.
//!
//! [`ArticleArchiver::archive_all`] runs up to `concurrency` archives at once.
//! A failed article never stops the others; every outcome is collected into
//! an [`ArchiveSummary`].

use crate::error::{ArchiveError, StorageError};
use crate::models::{ArchiveRecord, Article};
use crate::storage::{ArticleTable, BlobStore};
use crate::utils::original_key;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument};

/// Default number of archives in flight.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// One article that could not be archived.
#[derive(Debug)]
pub struct ArchiveFailure {
    pub article_id: String,
    pub error: ArchiveError,
}

/// Outcome of archiving a batch.
#[derive(Debug, Default)]
pub struct ArchiveSummary {
    pub archived: Vec<ArchiveRecord>,
    pub failures: Vec<ArchiveFailure>,
}

impl ArchiveSummary {
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// Failed articles whose raw blob was written but whose row was not.
    pub fn orphaned_blobs(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().filter_map(|f| match &f.error {
            ArchiveError::Table { blob_key, .. } => Some(blob_key.as_str()),
            _ => None,
        })
    }
}

/// Writes articles to a blob store and an article table.
#[derive(Debug)]
pub struct ArticleArchiver<'a, B, T> {
    blobs: &'a B,
    table: &'a T,
    date: NaiveDate,
    concurrency: usize,
}

impl<'a, B, T> ArticleArchiver<'a, B, T>
where
    B: BlobStore,
    T: ArticleTable,
{
    /// `date` is the partition used in every blob key written by this archiver.
    pub fn new(blobs: &'a B, table: &'a T, date: NaiveDate) -> Self {
        Self {
            blobs,
            table,
            date,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Archive one article.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::MissingId`] when the article has no id,
    /// [`ArchiveError::Blob`] when the raw write fails (no row is attempted),
    /// [`ArchiveError::Table`] when the row write fails after the blob was stored.
    #[instrument(level = "debug", skip_all, fields(article_id = %article.id))]
    pub async fn archive(&self, article: &Article) -> Result<ArchiveRecord, ArchiveError> {
        if article.id.is_empty() {
            error!(title = %article.title, "Skipping article without id");
            return Err(ArchiveError::MissingId);
        }

        let blob_key = original_key(self.date, &article.id);
        let body = article
            .raw_json()
            .map_err(|e| ArchiveError::Blob(StorageError::Serialize(e)))?;

        if let Err(e) = self.blobs.put(&blob_key, body, "application/json").await {
            error!(article_id = %article.id, key = %blob_key, error = %e, "Failed to upload raw article");
            return Err(ArchiveError::Blob(e));
        }

        let record = ArchiveRecord::from_article(article, blob_key);
        if let Err(e) = self.table.put_record(&record).await {
            error!(article_id = %article.id, key = %record.blob_key, error = %e, "Failed to insert article row");
            return Err(ArchiveError::Table {
                blob_key: record.blob_key,
                source: e,
            });
        }

        Ok(record)
    }

    /// Archive every article with bounded concurrency, in no particular order.
    #[instrument(level = "info", skip_all, fields(count = articles.len(), concurrency = self.concurrency))]
    pub async fn archive_all(&self, articles: &[Article]) -> ArchiveSummary {
        let outcomes: Vec<(&str, Result<ArchiveRecord, ArchiveError>)> = stream::iter(articles)
            .map(|article| async move { (article.id.as_str(), self.archive(article).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = ArchiveSummary::default();
        for (article_id, outcome) in outcomes {
            match outcome {
                Ok(record) => summary.archived.push(record),
                Err(error) => summary.failures.push(ArchiveFailure {
                    article_id: article_id.to_string(),
                    error,
                }),
            }
        }

        info!(
            archived = summary.archived.len(),
            failed = summary.failed_count(),
            "Archive batch finished"
        );
        summary
    }
}
