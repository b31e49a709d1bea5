//! Storage backends for raw article blobs, table rows and the report.
//!
//! The pipeline only sees the two traits below. Each backend is bound to one
//! bucket or table when it is constructed.
//!
//! # Backends
//!
//! | Backend | Blob store | Article table |
//! |---------|------------|---------------|
//! | [`aws`] | S3 `PutObject` | DynamoDB `PutItem` |
//! | [`local`] | files under `<root>/<bucket>/` | one JSON file per article under `<root>/<table>/` |
//!
//! Writes are plain overwrites: putting the same key or article id twice
//! leaves the last value.

use crate::error::StorageError;
use crate::models::ArchiveRecord;

pub mod aws;
pub mod local;
#[cfg(test)]
pub mod memory;

/// Object store holding raw article copies and reports.
pub trait BlobStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError>;
}

/// Key-value table keyed by article id.
pub trait ArticleTable {
    async fn put_record(&self, record: &ArchiveRecord) -> Result<(), StorageError>;
}

impl<S: BlobStore + ?Sized> BlobStore for &S {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        (**self).put(key, body, content_type).await
    }
}

impl<S: ArticleTable + ?Sized> ArticleTable for &S {
    async fn put_record(&self, record: &ArchiveRecord) -> Result<(), StorageError> {
        (**self).put_record(record).await
    }
}
