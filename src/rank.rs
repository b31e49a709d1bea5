//! Popularity ranking.

use crate::models::Article;
use std::cmp::Reverse;

/// Default size of the ranked report.
pub const DEFAULT_TOP_N: usize = 20;

/// The `n` most-liked articles, most likes first.
///
/// The sort is stable, so articles with equal likes keep their input order.
/// Returns every article when there are fewer than `n`.
pub fn top_n(articles: &[Article], n: usize) -> Vec<&Article> {
    let mut ranked: Vec<&Article> = articles.iter().collect();
    ranked.sort_by_key(|a| Reverse(a.likes_count));
    ranked.truncate(n);
    ranked
}
