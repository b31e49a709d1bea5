//! S3 and DynamoDB backends.

use super::{ArticleTable, BlobStore};
use crate::error::StorageError;
use crate::models::{ArchiveRecord, Attribute};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_s3::primitives::ByteStream;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Load the shared SDK configuration for `region`.
pub async fn load_sdk_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await
}

/// Blob store backed by one S3 bucket.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(sdk_config: &aws_config::SdkConfig, bucket: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
            bucket: bucket.into(),
        }
    }
}

impl BlobStore for S3BlobStore {
    #[instrument(level = "debug", skip(self, body), fields(bucket = %self.bucket, bytes = body.len()))]
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Backend {
                backend: "s3",
                key: key.to_string(),
                message: aws_sdk_s3::error::DisplayErrorContext(e).to_string(),
            })?;
        debug!(key, "Stored object");
        Ok(())
    }
}

/// Article table backed by one DynamoDB table with partition key `article_id`.
#[derive(Debug, Clone)]
pub struct DynamoArticleTable {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoArticleTable {
    pub fn new(sdk_config: &aws_config::SdkConfig, table: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_dynamodb::Client::new(sdk_config),
            table: table.into(),
        }
    }
}

impl ArticleTable for DynamoArticleTable {
    #[instrument(level = "debug", skip_all, fields(table = %self.table, article_id = %record.article_id))]
    async fn put_record(&self, record: &ArchiveRecord) -> Result<(), StorageError> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_dynamo_item(record)))
            .send()
            .await
            .map_err(|e| StorageError::Backend {
                backend: "dynamodb",
                key: record.article_id.clone(),
                message: aws_sdk_dynamodb::error::DisplayErrorContext(e).to_string(),
            })?;
        debug!("Stored item");
        Ok(())
    }
}

fn to_dynamo_item(record: &ArchiveRecord) -> HashMap<String, AttributeValue> {
    record
        .to_item()
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Attribute::S(s) => AttributeValue::S(s),
                Attribute::Ss(ss) => AttributeValue::Ss(ss),
                Attribute::N(n) => AttributeValue::N(n),
            };
            (name.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    #[test]
    fn test_dynamo_item_types() {
        let article = fixtures::article("abc", "2025-05-06T09:15:00+09:00", 12);
        let record = ArchiveRecord::from_article(&article, "articles/original/2025-05-06/abc.json");
        let item = to_dynamo_item(&record);

        assert_eq!(item.get("article_id"), Some(&AttributeValue::S("abc".to_string())));
        assert_eq!(item.get("likes_count"), Some(&AttributeValue::N("12".to_string())));
        assert_eq!(item.get("stocks_count"), Some(&AttributeValue::N("3".to_string())));
        assert_eq!(
            item.get("tags"),
            Some(&AttributeValue::Ss(vec!["AWS".to_string(), "Rust".to_string()]))
        );
        assert_eq!(
            item.get("user_name"),
            Some(&AttributeValue::S("User abc".to_string()))
        );
    }
}
