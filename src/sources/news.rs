// src/sources/news.rs
//! News adapter.
//!
//! One upstream search per cache window feeds an in-memory article set;
//! pagination is served entirely from that set. Redacted, incomplete, and
//! stale articles never reach the set.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use serde::Deserialize;

use crate::cache::TtlCache;
use crate::config::NewsConfig;
use crate::sources::clean_text;
use crate::sources::types::{NewsArticle, NewsPage};

/// Marker the upstream substitutes for withdrawn titles and source names.
const REDACTED: &str = "[Removed]";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<WireArticle>,
}

#[derive(Debug, Deserialize)]
struct WireArticle {
    title: Option<String>,
    source: Option<WireSource>,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireSource {
    name: Option<String>,
}

pub struct NewsFeed {
    client: reqwest::Client,
    cfg: NewsConfig,
    cache: TtlCache<Vec<NewsArticle>>,
}

impl NewsFeed {
    pub fn new(client: reqwest::Client, cfg: NewsConfig) -> Self {
        let cache = TtlCache::new(cfg.cache_ttl());
        Self { client, cfg, cache }
    }

    /// One page of the filtered, newest-first article set. The set is
    /// refreshed at most once per cache window; paging through it never
    /// touches the upstream on its own.
    pub async fn page(&self, page: usize) -> Result<NewsPage> {
        let articles = self.cache.get_or_refresh(|| self.refresh()).await?;
        Ok(paginate(&articles, page, self.cfg.page_size))
    }

    /// Drop the cached set so the next read refreshes.
    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    async fn refresh(&self) -> Result<Vec<NewsArticle>> {
        counter!("news_refresh_total").increment(1);
        let url = format!("{}/everything", self.cfg.base_url);
        let resp: SearchResponse = self
            .client
            .get(&url)
            .query(&[
                ("q", self.cfg.query.clone()),
                ("domains", self.cfg.domains.join(",")),
                ("sources", self.cfg.sources.join(",")),
                ("language", "en".to_string()),
                ("sortBy", "publishedAt".to_string()),
                ("pageSize", self.cfg.fetch_size.to_string()),
                ("apiKey", self.cfg.api_key.clone()),
            ])
            .send()
            .await
            .context("news search get()")?
            .error_for_status()
            .context("news search status")?
            .json()
            .await
            .context("news search body")?;

        let kept = filter_articles(resp.articles, Utc::now(), self.cfg.recency_window_days);
        counter!("news_kept_total").increment(kept.len() as u64);
        Ok(kept)
    }
}

/// Keep only complete, non-redacted articles published inside the recency
/// window, newest first.
fn filter_articles(
    raw: Vec<WireArticle>,
    now: DateTime<Utc>,
    window_days: i64,
) -> Vec<NewsArticle> {
    let cutoff = now - ChronoDuration::days(window_days);
    let mut dropped = 0u64;
    let mut kept = Vec::with_capacity(raw.len());

    for article in raw {
        let Some(published_at) = article.published_at else {
            dropped += 1;
            continue;
        };
        let title = article.title.as_deref().unwrap_or_default();
        let source_name = article
            .source
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or_default();
        let complete = !title.is_empty()
            && !source_name.is_empty()
            && !title.contains(REDACTED)
            && !source_name.contains(REDACTED);
        if !complete || published_at < cutoff {
            dropped += 1;
            continue;
        }
        kept.push(NewsArticle {
            title: clean_text(title),
            source_name: clean_text(source_name),
            published_at,
            url: article.url.unwrap_or_default(),
        });
    }

    kept.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    counter!("news_filtered_total").increment(dropped);
    kept
}

/// Slice one fixed-size page out of the article set.
///
/// Pages are 1-based. Page 0 or a page past the end yields empty articles
/// with the same totals, never an error.
pub fn paginate(articles: &[NewsArticle], page: usize, page_size: usize) -> NewsPage {
    let page_size = page_size.max(1);
    let total_results = articles.len();
    let total_pages = total_results.div_ceil(page_size);
    let slice = if page == 0 {
        &[][..]
    } else {
        let start = (page - 1).saturating_mul(page_size);
        if start >= total_results {
            &[][..]
        } else {
            &articles[start..(start + page_size).min(total_results)]
        }
    };
    NewsPage {
        articles: slice.to_vec(),
        total_results,
        total_pages,
        current_page: page,
    }
}
