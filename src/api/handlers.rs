use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{AvailabilityResult, BookQuery},
    services::{catalog::BRANCHES, recommendations::RecommendationList},
    store::{get_json, set_json, StoreKey},
};

use super::AppState;

const EMPTY_SHELF_MESSAGE: &str =
    "Could not fetch your Goodreads to-read shelf. Make sure your profile is public.";

// Request types

#[derive(Debug, Deserialize)]
pub struct CheckBookRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckLibraryRequest {
    #[serde(default)]
    pub books: Vec<BookQuery>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationsQuery {
    pub refresh: Option<String>,
}

impl RecommendationsQuery {
    fn wants_refresh(&self) -> bool {
        self.refresh.as_deref() == Some("1")
    }
}

/// Saved entries are kept verbatim, whatever fields the client sends
#[derive(Debug, Deserialize)]
pub struct SaveListRequest {
    #[serde(default)]
    pub books: Vec<Value>,
}

// Handlers

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Lists the library's branches and the preferred one
pub async fn branches(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "branches": BRANCHES,
        "default": state.config.preferred_branch,
    }))
}

pub async fn check_book(
    State(state): State<AppState>,
    Json(request): Json<CheckBookRequest>,
) -> AppResult<Json<AvailabilityResult>> {
    if request.title.trim().is_empty() {
        return Err(AppError::InvalidInput("No title provided".to_string()));
    }

    let query = BookQuery::new(request.title, request.author);
    Ok(Json(state.checker.check_one(&query).await))
}

/// Checks a whole list, one book at a time
pub async fn check_library(
    State(state): State<AppState>,
    Json(request): Json<CheckLibraryRequest>,
) -> AppResult<Json<Value>> {
    if request.books.is_empty() {
        return Err(AppError::InvalidInput("No books provided".to_string()));
    }

    if let Some(position) = request
        .books
        .iter()
        .position(|book| book.title.trim().is_empty())
    {
        return Err(AppError::InvalidInput(format!(
            "Book {} has no title",
            position + 1
        )));
    }

    let results = state.checker.check_all(&request.books).await;
    Ok(Json(json!({ "results": results })))
}

/// Serves the saved list, then the cached list, then a freshly ranked one
///
/// `?refresh=1` skips both the saved list and the cache.
pub async fn recommendations(
    State(state): State<AppState>,
    Query(params): Query<RecommendationsQuery>,
) -> AppResult<Json<Value>> {
    if !params.wants_refresh() {
        if let Some(saved) = load_saved_list(&state).await {
            return Ok(Json(json!({ "books": saved, "saved": true })));
        }

        if let Some(cached) = load_cached_recommendations(&state).await {
            tracing::debug!(books = cached.books.len(), "Serving cached recommendations");
            return Ok(Json(serde_json::to_value(cached)?));
        }
    }

    let Some(list) = state.recommender.recommend().await else {
        return Ok(Json(json!({ "error": EMPTY_SHELF_MESSAGE, "books": [] })));
    };

    let ttl = state.config.recommendation_cache_ttl_secs;
    if let Err(e) = set_json(state.cache.as_ref(), &StoreKey::Recommendations, &list, Some(ttl)).await {
        tracing::warn!(error = %e, "Failed to cache recommendations");
    }

    Ok(Json(serde_json::to_value(list)?))
}

pub async fn save_list(
    State(state): State<AppState>,
    Json(request): Json<SaveListRequest>,
) -> AppResult<Json<Value>> {
    set_json(state.saved_lists.as_ref(), &StoreKey::SavedList, &request.books, None).await?;
    tracing::info!(books = request.books.len(), "Saved book list");

    Ok(Json(json!({ "ok": true })))
}

/// A missing, empty or unreadable saved list all count as absent
async fn load_saved_list(state: &AppState) -> Option<Vec<Value>> {
    match get_json::<Vec<Value>>(state.saved_lists.as_ref(), &StoreKey::SavedList).await {
        Ok(saved) => saved.filter(|books| !books.is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable saved list");
            None
        }
    }
}

async fn load_cached_recommendations(state: &AppState) -> Option<RecommendationList> {
    match get_json::<RecommendationList>(state.cache.as_ref(), &StoreKey::Recommendations).await {
        Ok(cached) => cached,
        Err(e) => {
            tracing::warn!(error = %e, "Recommendation cache read failed");
            None
        }
    }
}
