//! BiblioCommons search page scraper
//!
//! The catalog has no public search API, so records are found by requesting the
//! "smart" search results page and reading the first result's title link.
//! Record links look like `/v2/record/S93C3536620`; the trailing token is the
//! identifier the availability API is keyed by.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client as HttpClient;
use scraper::{Html, Selector};

use crate::{
    error::{AppError, AppResult},
    models::{BookQuery, CatalogIdentifier, LocatedRecord},
    services::catalog::{desktop_headers, RecordLocator},
};

static RECORD_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(S\d+C\d+)").expect("record id pattern is valid"));

static RESULT_ITEM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".cp-search-result-item").expect("result item selector is valid")
});

static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".title-content a, .cp-title a, a.title").expect("title link selector is valid")
});

/// Extracts the record identifier from a record link, if the link has one
pub fn extract_record_id(href: &str) -> Option<CatalogIdentifier> {
    RECORD_ID_PATTERN
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| CatalogIdentifier::new(m.as_str()))
}

/// Turns a result link into an absolute URL
///
/// Root-relative links are prefixed with the catalog origin and absolute links
/// pass through. Anything else yields an empty string.
pub fn resolve_record_url(origin: &str, href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), href)
    } else if href.starts_with("http") {
        href.to_string()
    } else {
        String::new()
    }
}

/// Reads the first search result out of a results page
pub fn parse_search_results(html: &str, origin: &str) -> LocatedRecord {
    let document = Html::parse_document(html);

    let Some(item) = document.select(&RESULT_ITEM).next() else {
        return LocatedRecord::missing();
    };

    let Some(link) = item.select(&TITLE_LINK).next() else {
        return LocatedRecord::missing();
    };

    let href = link.value().attr("href").unwrap_or("");

    LocatedRecord {
        id: extract_record_id(href),
        url: resolve_record_url(origin, href),
    }
}

#[derive(Clone)]
pub struct BiblioCommonsSearch {
    http_client: HttpClient,
    search_url: String,
    origin: String,
}

impl BiblioCommonsSearch {
    pub fn new(http_client: HttpClient, search_url: String, origin: String) -> Self {
        Self {
            http_client,
            search_url,
            origin,
        }
    }

    async fn fetch_results_page(&self, query: &BookQuery) -> AppResult<String> {
        let text = query.search_text();
        let response = self
            .http_client
            .get(&self.search_url)
            .headers(desktop_headers())
            .query(&[("query", text.as_str()), ("searchType", "smart")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "Catalog search returned status {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait::async_trait]
impl RecordLocator for BiblioCommonsSearch {
    async fn locate(&self, query: &BookQuery) -> LocatedRecord {
        let html = match self.fetch_results_page(query).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(
                    title = %query.title,
                    author = %query.author,
                    error = %e,
                    "Catalog search failed"
                );
                return LocatedRecord::missing();
            }
        };

        let record = parse_search_results(&html, &self.origin);

        tracing::debug!(
            title = %query.title,
            record_id = ?record.id,
            url = %record.url,
            "Catalog search completed"
        );

        record
    }
}
