use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    models::{RankedPick, Recommendation, ShelfBook},
    services::shelves::{to_read_books, top_rated_books, ShelfSource},
};

/// Maximum books returned in a recommendation list
const MAX_RECOMMENDATIONS: usize = 100;
/// Loved books shown to the model
const MAX_LOVED: usize = 30;
/// Picks requested from the model
const RANKED_PICKS: usize = 25;
const MAX_TOKENS: u32 = 4000;
const ANTHROPIC_VERSION: &str = "2023-06-01";

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```(?:json)?\s*").expect("fence pattern is valid"));
static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```$").expect("fence pattern is valid"));

/// Ranks a to-read list against the reader's favourite books
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Ranker: Send + Sync {
    async fn rank(&self, loved: &[ShelfBook], wanted: &[ShelfBook]) -> AppResult<Vec<RankedPick>>;
}

/// Builds the ranking prompt
pub fn build_prompt(loved: &[ShelfBook], wanted: &[ShelfBook]) -> String {
    let loved = loved
        .iter()
        .take(MAX_LOVED)
        .map(|b| format!("- {} by {} ({} stars)", b.title, b.author, b.user_rating))
        .collect::<Vec<_>>()
        .join("\n");

    let wanted = wanted
        .iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|b| format!("- {} by {}", b.title, b.author))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "I'm heading to the library and want to pick up some books. \
         Based on books I've loved (rated 4-5 stars), recommend and rank \
         the top {RANKED_PICKS} I should read next from my to-read list.\n\n\
         ## Books I loved\n{loved}\n\n\
         ## My to-read list\n{wanted}\n\n\
         Return ONLY a JSON array of {RANKED_PICKS} objects with keys: \
         \"title\", \"author\", \"reason\" (one short sentence why I'd like it). \
         No markdown fences, just the JSON array."
    )
}

/// Decodes the model's reply, tolerating a surrounding Markdown code fence
pub fn parse_ranked_picks(text: &str) -> AppResult<Vec<RankedPick>> {
    let text = text.trim();
    let text = OPENING_FENCE.replace(text, "");
    let text = CLOSING_FENCE.replace(&text, "");
    Ok(serde_json::from_str(&text)?)
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Ranker backed by the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicRanker {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl AnthropicRanker {
    pub fn new(http_client: HttpClient, api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
            model,
        }
    }
}

#[async_trait::async_trait]
impl Ranker for AnthropicRanker {
    async fn rank(&self, loved: &[ShelfBook], wanted: &[ShelfBook]) -> AppResult<Vec<RankedPick>> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [
                { "role": "user", "content": build_prompt(loved, wanted) }
            ]
        });

        let response = self
            .http_client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Ranking request failed");
            return Err(AppError::ExternalApi(format!(
                "Ranking API returned status {}",
                status
            )));
        }

        let message: MessagesResponse = response.json().await?;
        let text = message
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| AppError::ExternalApi("Ranking reply had no text".to_string()))?;

        let picks = parse_ranked_picks(&text)?;
        tracing::info!(picks = picks.len(), model = %self.model, "Ranking completed");

        Ok(picks)
    }
}

/// A recommendation list as served and cached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationList {
    pub books: Vec<Recommendation>,
    pub to_read_count: usize,
}

/// Unranked list: the to-read shelf in shelf order
pub fn fallback(to_read: &[ShelfBook]) -> Vec<Recommendation> {
    to_read
        .iter()
        .take(MAX_RECOMMENDATIONS)
        .map(Recommendation::from)
        .collect()
}

/// Puts ranked picks first, then the rest of the to-read shelf
///
/// Picks are matched to shelf books by lowercase title to fill in cover and
/// rating. Picks the shelf doesn't know get empty display fields.
pub fn merge_ranked(picks: Vec<RankedPick>, to_read: &[ShelfBook]) -> Vec<Recommendation> {
    let by_title: HashMap<String, &ShelfBook> = to_read
        .iter()
        .map(|book| (book.title.to_lowercase(), book))
        .collect();

    let mut recommendations: Vec<Recommendation> = picks
        .into_iter()
        .map(|pick| {
            let shelf_book = by_title.get(&pick.title.to_lowercase());
            Recommendation {
                image: shelf_book.map(|b| b.image.clone()).unwrap_or_default(),
                avg_rating: shelf_book.map(|b| b.avg_rating).unwrap_or(0.0),
                title: pick.title,
                author: pick.author,
                reason: pick.reason,
            }
        })
        .collect();

    let ranked: HashSet<String> = recommendations
        .iter()
        .map(|r| r.title.to_lowercase())
        .collect();

    for book in to_read {
        if recommendations.len() >= MAX_RECOMMENDATIONS {
            break;
        }
        if !ranked.contains(&book.title.to_lowercase()) {
            recommendations.push(Recommendation::from(book));
        }
    }

    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

/// Builds recommendation lists from the reader's shelves
#[derive(Clone)]
pub struct RecommendationService {
    shelves: Arc<dyn ShelfSource>,
    ranker: Option<Arc<dyn Ranker>>,
    pages: u32,
}

impl RecommendationService {
    pub fn new(shelves: Arc<dyn ShelfSource>, ranker: Option<Arc<dyn Ranker>>, pages: u32) -> Self {
        Self {
            shelves,
            ranker,
            pages,
        }
    }

    /// Fetches both shelves and ranks the to-read list
    ///
    /// Returns `None` when the to-read shelf is empty or unreachable.
    pub async fn recommend(&self) -> Option<RecommendationList> {
        let to_read = to_read_books(self.shelves.as_ref(), self.pages).await;
        if to_read.is_empty() {
            return None;
        }

        let top_rated = top_rated_books(self.shelves.as_ref(), self.pages).await;

        Some(RecommendationList {
            books: self.rank(&to_read, &top_rated).await,
            to_read_count: to_read.len(),
        })
    }

    /// Ranks the to-read list, falling back to shelf order on any failure
    pub async fn rank(&self, to_read: &[ShelfBook], top_rated: &[ShelfBook]) -> Vec<Recommendation> {
        let Some(ranker) = &self.ranker else {
            return fallback(to_read);
        };

        match ranker.rank(top_rated, to_read).await {
            Ok(picks) => merge_ranked(picks, to_read),
            Err(e) => {
                tracing::warn!(error = %e, "Ranking failed, using shelf order");
                fallback(to_read)
            }
        }
    }
}
