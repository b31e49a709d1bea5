//! Paginated client for the Qiita items API.
//!
//! The [`ArticleSource`] trait is the seam the pipeline depends on;
//! [`QiitaClient`] is the HTTP implementation.
//!
//! # Paging
//!
//! Pages are requested from `page=1` upward with `per_page=100`. Paging stops
//! when a page comes back empty, when the cutoff rule in [`CutoffMode`] says
//! the lookback window has been passed, or when `max_pages` pages have been
//! fetched. Any non-success status aborts the whole fetch; nothing is retried.

use crate::error::FetchError;
use crate::models::Article;
use crate::utils::truncate_for_log;
use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration as StdDuration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Fixed page size requested from the API.
pub const PER_PAGE: u32 = 100;

/// Default endpoint of the items API.
pub const DEFAULT_API_URL: &str = "https://qiita.com/api/v2/items";

/// How the lookback cutoff is applied to each fetched page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CutoffMode {
    /// Only the last item of each page is checked. The first page whose last
    /// item is older than the cutoff is kept whole and ends paging. Relies on
    /// the API returning items newest first.
    #[default]
    LastItem,
    /// Every item is checked. Stale items are dropped from each page, and
    /// paging ends at the first page with no fresh item.
    EachItem,
}

/// Something that can produce the articles published inside a lookback window.
pub trait ArticleSource {
    /// Fetch every article newer than `now - lookback`, fully materialized.
    async fn fetch_recent(&self, lookback: Duration) -> Result<Vec<Article>, FetchError>;
}

/// HTTP client for the items endpoint.
#[derive(Debug)]
pub struct QiitaClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
    max_pages: u32,
    cutoff_mode: CutoffMode,
}

impl QiitaClient {
    /// Build a client with a per-request `timeout`.
    ///
    /// `token` is sent as `Authorization: Bearer <token>` on every request
    /// when present.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `base_url` does not parse, or
    /// [`FetchError::Http`] if the underlying client cannot be built.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: StdDuration,
    ) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url).map_err(|e| FetchError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("qiita_etl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            token,
            max_pages: 100,
            cutoff_mode: CutoffMode::default(),
        })
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_cutoff_mode(mut self, cutoff_mode: CutoffMode) -> Self {
        self.cutoff_mode = cutoff_mode;
        self
    }

    fn page_url(&self, page: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &PER_PAGE.to_string());
        url
    }

    /// Fetch a single page (1-based).
    ///
    /// # Errors
    ///
    /// [`FetchError::UnexpectedStatus`] for any non-2xx response,
    /// [`FetchError::Http`] on network failure or timeout,
    /// [`FetchError::Decode`] if the body is not a JSON array of articles.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<Article>, FetchError> {
        let url = self.page_url(page);
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body: truncate_for_log(&body, 300),
            });
        }

        let bytes = response.bytes().await?;
        let items: Vec<Value> = serde_json::from_slice(&bytes)
            .map_err(|source| FetchError::Decode { page, source })?;
        let articles = items
            .into_iter()
            .map(Article::from_raw)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| FetchError::Decode { page, source })?;
        debug!(page, count = articles.len(), "Fetched page");
        Ok(articles)
    }

    /// Page through the API until `cutoff` is passed.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`Self::fetch_page`]; articles from
    /// earlier pages are discarded.
    #[instrument(level = "info", skip(self), fields(mode = ?self.cutoff_mode))]
    pub async fn fetch_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Article>, FetchError> {
        let mut all_articles: Vec<Article> = Vec::new();
        let mut page = 1u32;
        let mut fetched_pages = 0u32;

        loop {
            if page > self.max_pages {
                warn!(
                    max_pages = self.max_pages,
                    fetched = all_articles.len(),
                    "Page limit reached before the cutoff; stopping"
                );
                break;
            }

            let articles = self.fetch_page(page).await?;
            fetched_pages += 1;
            if articles.is_empty() {
                info!(page, "Empty page; no more articles");
                break;
            }

            let reached_cutoff = match self.cutoff_mode {
                CutoffMode::LastItem => {
                    let reached = articles.last().is_some_and(|a| is_stale(a, cutoff));
                    all_articles.extend(articles);
                    reached
                }
                CutoffMode::EachItem => {
                    let page_len = articles.len();
                    let fresh: Vec<Article> = articles
                        .into_iter()
                        .filter(|a| !is_stale(a, cutoff))
                        .collect();
                    debug!(page, kept = fresh.len(), dropped = page_len - fresh.len(), "Filtered page");
                    let reached = fresh.is_empty();
                    all_articles.extend(fresh);
                    reached
                }
            };

            if reached_cutoff {
                info!(page, %cutoff, "Reached lookback cutoff");
                break;
            }
            page += 1;
        }

        info!(count = all_articles.len(), pages = fetched_pages, "Fetched recent articles");
        Ok(all_articles)
    }
}

impl ArticleSource for QiitaClient {
    async fn fetch_recent(&self, lookback: Duration) -> Result<Vec<Article>, FetchError> {
        self.fetch_since(Utc::now() - lookback).await
    }
}

/// An article is stale when its timestamp parses and is strictly older than `cutoff`.
fn is_stale(article: &Article, cutoff: DateTime<Utc>) -> bool {
    match article.created_at_time() {
        Some(created) => created.with_timezone(&Utc) < cutoff,
        None => {
            warn!(article_id = %article.id, created_at = %article.created_at, "Unparsable created_at; treating as fresh");
            false
        }
    }
}
