use std::time::Duration;

use crate::error::AppResult;

pub mod catalog;
pub mod library_check;
pub mod recommendations;
pub mod shelves;
pub mod summary;

pub use library_check::LibraryChecker;
pub use recommendations::{AnthropicRanker, Ranker, RecommendationService};
pub use shelves::{GoodreadsShelf, ShelfSource};

/// Timeout for the ranking call, which generates a long completion
pub const RANKER_TIMEOUT_SECS: u64 = 120;

/// Builds the shared outbound HTTP client
///
/// Every request made through it is bounded by `timeout_secs`.
pub fn build_http_client(timeout_secs: u64) -> AppResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}
