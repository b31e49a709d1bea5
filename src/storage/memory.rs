//! In-memory backends with failure injection, for tests.

use super::{ArticleTable, BlobStore};
use crate::error::StorageError;
use crate::models::ArchiveRecord;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryBlobStore {
    /// Make every `put` whose key contains `fragment` fail.
    pub fn fail_when_key_contains(&self, fragment: &str) {
        self.failing.lock().unwrap().insert(fragment.to_string());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        if self.failing.lock().unwrap().iter().any(|f| key.contains(f.as_str())) {
            return Err(StorageError::Backend {
                backend: "memory-blob",
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryArticleTable {
    rows: Mutex<BTreeMap<String, ArchiveRecord>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryArticleTable {
    /// Make `put_record` fail for this article id.
    pub fn fail_for(&self, article_id: &str) {
        self.failing.lock().unwrap().insert(article_id.to_string());
    }

    pub fn get(&self, article_id: &str) -> Option<ArchiveRecord> {
        self.rows.lock().unwrap().get(article_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

impl ArticleTable for MemoryArticleTable {
    async fn put_record(&self, record: &ArchiveRecord) -> Result<(), StorageError> {
        if self.failing.lock().unwrap().contains(&record.article_id) {
            return Err(StorageError::Backend {
                backend: "memory-table",
                key: record.article_id.clone(),
                message: "injected failure".to_string(),
            });
        }
        self.rows
            .lock()
            .unwrap()
            .insert(record.article_id.clone(), record.clone());
        Ok(())
    }
}
