//! Filesystem backends for dry runs without AWS.
//!
//! ```text
//! <root>/
//! ├── qiita-etl-project-bucket/
//! │   └── articles/
//! │       ├── original/2025-05-06/<id>.json
//! │       └── processed/2025-05-06/weekly_filtered_top20.tsv
//! └── qiita-etl-project-articles/
//!     └── <id>.json
//! ```

use super::{ArticleTable, BlobStore};
use crate::error::StorageError;
use crate::models::ArchiveRecord;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

/// Blob store writing each key as a file below `root`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BlobStore for LocalBlobStore {
    #[instrument(level = "debug", skip(self, body), fields(root = %self.root.display()))]
    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let path = resolve_key(&self.root, key)?;
        write_file(&path, &body).await?;
        debug!(path = %path.display(), "Wrote blob");
        Ok(())
    }
}

/// Article table storing one JSON row per article id in `dir`.
#[derive(Debug, Clone)]
pub struct LocalArticleTable {
    dir: PathBuf,
}

impl LocalArticleTable {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArticleTable for LocalArticleTable {
    #[instrument(level = "debug", skip_all, fields(article_id = %record.article_id))]
    async fn put_record(&self, record: &ArchiveRecord) -> Result<(), StorageError> {
        let file_name = format!("{}.json", record.article_id);
        let path = resolve_key(&self.dir, &file_name)?;
        let json = serde_json::to_vec_pretty(&record.to_item())?;
        write_file(&path, &json).await?;
        debug!(path = %path.display(), "Wrote row");
        Ok(())
    }
}

/// Map a `/`-separated key to a path under `root`, refusing anything that
/// could escape it.
fn resolve_key(root: &Path, key: &str) -> Result<PathBuf, StorageError> {
    let mut path = root.to_path_buf();
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        path.push(segment);
    }
    Ok(path)
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let io_err = |source: std::io::Error| StorageError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    fs::write(path, contents).await.map_err(io_err)
}
