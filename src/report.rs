//! Ranked report: tabular rows, TSV serialization and publishing.
//!
//! The report has one header line and one line per article, in the order
//! given (ranked order). Fields are tab-separated and lines end with `\n`.
//! A field is wrapped in double quotes only when it contains a tab, quote or
//! line break, with inner quotes doubled.

use crate::error::StorageError;
use crate::models::Article;
use crate::storage::BlobStore;
use crate::utils::report_key;
use chrono::NaiveDate;
use itertools::Itertools;
use tracing::{info, instrument};

/// Column headers of the report, in order.
pub const HEADERS: [&str; 10] = [
    "ID",
    "ユーザ名",
    "生成日時",
    "タイトル",
    "URL",
    "いいね数",
    "リアクション数",
    "コメント数",
    "ストック数",
    "タグ",
];

/// One report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub id: String,
    pub user_name: String,
    pub created_at: String,
    pub title: String,
    pub url: String,
    pub likes_count: u64,
    pub reactions_count: u64,
    pub comments_count: u64,
    pub stocks_count: u64,
    /// Tag names joined with `|`; empty when the article has no tags.
    pub tags: String,
}

impl ReportRow {
    pub fn from_article(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            user_name: article.user.name.clone(),
            created_at: article.created_at.clone(),
            title: article.title.clone(),
            url: article.url.clone(),
            likes_count: article.likes_count,
            reactions_count: article.reactions_count,
            comments_count: article.comments_count,
            stocks_count: article.stocks_count,
            tags: article.tag_names().join("|"),
        }
    }

    fn fields(&self) -> [String; 10] {
        [
            self.id.clone(),
            self.user_name.clone(),
            self.created_at.clone(),
            self.title.clone(),
            self.url.clone(),
            self.likes_count.to_string(),
            self.reactions_count.to_string(),
            self.comments_count.to_string(),
            self.stocks_count.to_string(),
            self.tags.clone(),
        ]
    }
}

/// Reshape articles into report rows, keeping their order.
pub fn to_report<'a>(articles: impl IntoIterator<Item = &'a Article>) -> Vec<ReportRow> {
    articles.into_iter().map(ReportRow::from_article).collect()
}

/// Serialize rows to TSV with a header line.
pub fn serialize(rows: &[ReportRow]) -> String {
    let mut out = HEADERS.iter().map(|h| quote_field(h)).join("\t");
    out.push('\n');
    for row in rows {
        out.push_str(&row.fields().iter().map(|f| quote_field(f)).join("\t"));
        out.push('\n');
    }
    out
}

fn quote_field(field: &str) -> String {
    if field.contains(['\t', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Uploads the serialized report under the run's date partition.
#[derive(Debug)]
pub struct ReportPublisher<'a, B> {
    blobs: &'a B,
    date: NaiveDate,
}

impl<'a, B: BlobStore> ReportPublisher<'a, B> {
    pub fn new(blobs: &'a B, date: NaiveDate) -> Self {
        Self { blobs, date }
    }

    /// Write the report and return its key. Same-day runs overwrite it.
    #[instrument(level = "info", skip_all, fields(bytes = tsv.len()))]
    pub async fn publish(&self, tsv: String) -> Result<String, StorageError> {
        let key = report_key(self.date);
        self.blobs
            .put(&key, tsv.into_bytes(), "text/tab-separated-values; charset=utf-8")
            .await?;
        info!(%key, "Published report");
        Ok(key)
    }
}
