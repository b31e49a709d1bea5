//! Data models for fetched articles and their archived representations.
//!
//! - [`Article`]: one item as returned by the Qiita items API
//! - [`User`], [`Tag`]: nested objects of an article
//! - [`ArchiveRecord`]: the structured row mirrored into the article table
//! - [`Attribute`]: backend-neutral typed attribute value for table rows
//!
//! Qiita sends `null` for some optional fields. Every modelled field reads a
//! missing or `null` value as its default (empty string, zero, empty list),
//! so downstream code never has to deal with absence. The untouched item is
//! kept next to the typed fields for the raw archive copy.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single article as returned by the items endpoint.
///
/// Fields the job does not use (`body`, `rendered_body`, `private`, ...) are
/// retained in `extra`. Articles decoded with [`Article::from_raw`] also keep
/// the item exactly as received in `raw`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Article {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: User,
    /// ISO-8601 timestamp with offset, e.g. `2025-05-06T09:15:00+09:00`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<Tag>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reactions_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stocks_count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// The item as the API sent it; `None` for articles built in code.
    #[serde(skip)]
    pub raw: Option<Value>,
}

impl Article {
    /// Decode one API item, keeping the untouched JSON alongside the typed fields.
    pub fn from_raw(raw: Value) -> Result<Self, serde_json::Error> {
        let mut article = Self::deserialize(&raw)?;
        article.raw = Some(raw);
        Ok(article)
    }

    /// Body of the raw archive copy: the received item when there is one,
    /// otherwise the typed article.
    pub fn raw_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        match &self.raw {
            Some(raw) => serde_json::to_vec(raw),
            None => serde_json::to_vec(self),
        }
    }

    /// Parse `created_at` as an instant. Returns `None` when it is empty or malformed.
    pub fn created_at_time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.created_at).ok()
    }

    /// Tag names in the order the API returned them.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }
}

/// Author of an article.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct User {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A tag attached to an article.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Tag {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub versions: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed attribute value of a table row.
///
/// Serializes in the DynamoDB JSON shape (`{"S": "..."}`, `{"SS": [...]}`,
/// `{"N": "42"}`) so local rows read the same as exported table items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attribute {
    S(String),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    /// Decimal string representation of a number.
    N(String),
}

/// Structured row stored in the article table, one per archived article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub article_id: String,
    /// Key of the raw JSON blob this row points to.
    pub blob_key: String,
    pub user_name: String,
    pub created_at: String,
    pub title: String,
    pub url: String,
    pub tags: BTreeSet<String>,
    pub likes_count: u64,
    pub reactions_count: u64,
    pub comments_count: u64,
    pub stocks_count: u64,
}

impl ArchiveRecord {
    pub fn from_article(article: &Article, blob_key: impl Into<String>) -> Self {
        Self {
            article_id: article.id.clone(),
            blob_key: blob_key.into(),
            user_name: article.user.name.clone(),
            created_at: article.created_at.clone(),
            title: article.title.clone(),
            url: article.url.clone(),
            tags: article.tag_names().map(str::to_owned).collect(),
            likes_count: article.likes_count,
            reactions_count: article.reactions_count,
            comments_count: article.comments_count,
            stocks_count: article.stocks_count,
        }
    }

    /// Attribute map keyed by table attribute name.
    ///
    /// String sets cannot be empty in DynamoDB, so `tags` is omitted when the
    /// article has none.
    pub fn to_item(&self) -> BTreeMap<&'static str, Attribute> {
        let mut item = BTreeMap::new();
        item.insert("article_id", Attribute::S(self.article_id.clone()));
        item.insert("s3_key", Attribute::S(self.blob_key.clone()));
        item.insert("user_name", Attribute::S(self.user_name.clone()));
        item.insert("created_at", Attribute::S(self.created_at.clone()));
        item.insert("title", Attribute::S(self.title.clone()));
        item.insert("url", Attribute::S(self.url.clone()));
        if !self.tags.is_empty() {
            item.insert("tags", Attribute::Ss(self.tags.iter().cloned().collect()));
        }
        item.insert("likes_count", Attribute::N(self.likes_count.to_string()));
        item.insert("reactions_count", Attribute::N(self.reactions_count.to_string()));
        item.insert("comments_count", Attribute::N(self.comments_count.to_string()));
        item.insert("stocks_count", Attribute::N(self.stocks_count.to_string()));
        item
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Article with the given id, timestamp and likes; two tags, everything else filled.
    pub fn article(id: &str, created_at: &str, likes: u64) -> Article {
        Article {
            id: id.to_string(),
            user: User {
                id: format!("user_{id}"),
                name: format!("User {id}"),
                extra: Map::new(),
            },
            created_at: created_at.to_string(),
            title: format!("Title {id}"),
            url: format!("https://qiita.com/user_{id}/items/{id}"),
            tags: vec![
                Tag {
                    name: "Rust".to_string(),
                    versions: vec![],
                    extra: Map::new(),
                },
                Tag {
                    name: "AWS".to_string(),
                    versions: vec![],
                    extra: Map::new(),
                },
            ],
            likes_count: likes,
            reactions_count: 1,
            comments_count: 2,
            stocks_count: 3,
            extra: Map::new(),
            raw: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_article_deserialization_keeps_unknown_fields() {
        let raw = json!({
            "id": "c686397e4a0f4f11683d",
            "title": "Example title",
            "body": "# Example",
            "private": false,
            "created_at": "2025-05-06T09:15:00+09:00",
            "url": "https://qiita.com/Qiita/items/c686397e4a0f4f11683d",
            "likes_count": 100,
            "tags": [{"name": "Rust", "versions": ["1.80"]}],
            "user": {"id": "qiita", "name": "Qiita Kaiseki", "followers_count": 10}
        });

        let article: Article = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(article.id, "c686397e4a0f4f11683d");
        assert_eq!(article.user.name, "Qiita Kaiseki");
        assert_eq!(article.likes_count, 100);
        assert_eq!(article.tags[0].versions, vec!["1.80".to_string()]);
        assert_eq!(article.extra.get("body"), Some(&json!("# Example")));

        let round: Value = serde_json::to_value(&article).unwrap();
        assert_eq!(round["body"], raw["body"]);
        assert_eq!(round["private"], raw["private"]);
        assert_eq!(round["user"]["followers_count"], json!(10));
    }

    #[test]
    fn test_missing_and_null_fields_default() {
        let article: Article = serde_json::from_value(json!({
            "id": "x",
            "user": null,
            "title": null,
            "tags": null,
            "likes_count": null
        }))
        .unwrap();

        assert_eq!(article.user.name, "");
        assert_eq!(article.title, "");
        assert_eq!(article.created_at, "");
        assert!(article.tags.is_empty());
        assert_eq!(article.likes_count, 0);
        assert_eq!(article.stocks_count, 0);
    }

    #[test]
    fn test_from_raw_keeps_item_as_received() {
        let raw = json!({
            "id": "x",
            "title": null,
            "likes_count": null,
            "tags": [{"name": "Rust", "versions": [], "extra_tag_field": 1}],
            "user": {"id": "u", "name": null}
        });

        let article = Article::from_raw(raw.clone()).unwrap();
        assert_eq!(article.title, "");
        assert_eq!(article.likes_count, 0);
        assert_eq!(article.user.name, "");
        assert_eq!(article.tags[0].extra.get("extra_tag_field"), Some(&json!(1)));

        let stored: Value = serde_json::from_slice(&article.raw_json().unwrap()).unwrap();
        assert_eq!(stored, raw);
    }

    #[test]
    fn test_raw_json_falls_back_to_typed_fields() {
        let a = fixtures::article("a", "2025-05-06T09:15:00+09:00", 5);
        let stored: Value = serde_json::from_slice(&a.raw_json().unwrap()).unwrap();
        assert_eq!(stored["id"], json!("a"));
        assert_eq!(stored["likes_count"], json!(5));
        assert!(stored.get("raw").is_none());
    }

    #[test]
    fn test_created_at_time_parses_offsets() {
        let a = fixtures::article("a", "2025-05-06T09:15:00+09:00", 0);
        let t = a.created_at_time().unwrap();
        assert_eq!(t.to_rfc3339(), "2025-05-06T09:15:00+09:00");

        let bad = fixtures::article("b", "yesterday", 0);
        assert!(bad.created_at_time().is_none());
    }

    #[test]
    fn test_archive_record_item_attributes() {
        let a = fixtures::article("abc", "2025-05-06T09:15:00+09:00", 42);
        let record = ArchiveRecord::from_article(&a, "articles/original/2025-05-06/abc.json");
        let item = record.to_item();

        assert_eq!(item["article_id"], Attribute::S("abc".to_string()));
        assert_eq!(
            item["s3_key"],
            Attribute::S("articles/original/2025-05-06/abc.json".to_string())
        );
        assert_eq!(item["likes_count"], Attribute::N("42".to_string()));
        assert_eq!(
            item["tags"],
            Attribute::Ss(vec!["AWS".to_string(), "Rust".to_string()])
        );
        assert_eq!(item.len(), 11);
    }

    #[test]
    fn test_archive_record_without_tags_omits_set() {
        let mut a = fixtures::article("abc", "2025-05-06T09:15:00+09:00", 0);
        a.tags.clear();
        let item = ArchiveRecord::from_article(&a, "k").to_item();
        assert!(!item.contains_key("tags"));
        assert_eq!(item.len(), 10);
    }

    #[test]
    fn test_attribute_serializes_in_table_json_shape() {
        let json = serde_json::to_value(Attribute::Ss(vec!["a".to_string()])).unwrap();
        assert_eq!(json, json!({"SS": ["a"]}));
        let json = serde_json::to_value(Attribute::N("7".to_string())).unwrap();
        assert_eq!(json, json!({"N": "7"}));
    }
}
