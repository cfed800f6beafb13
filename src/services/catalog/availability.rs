//! BiblioCommons availability API client
//!
//! `GET <base>/<id>/availability` returns an `entities` object holding two maps
//! keyed by opaque ids: `availabilities` (one overall entry per record) and
//! `bibItems` (one entry per physical copy). Map order is kept as sent.

use reqwest::Client as HttpClient;
use serde_json::{Map, Value};

use crate::{
    error::{AppError, AppResult},
    models::{
        ApiAvailabilityResponse, ApiBibItem, ApiOverallAvailability, AvailabilitySummary,
        BranchStatus, CatalogIdentifier, RetrievedAvailability,
    },
    services::catalog::{mobile_headers, AvailabilityRetriever},
};

/// Splits an availability response into totals and per-branch statuses
///
/// The first `availabilities` entry is the overall summary; a missing or empty
/// map counts as zero copies. Every `bibItems` entry becomes one branch status.
/// Entries of the wrong shape make the whole payload undecodable.
pub fn decompose(response: ApiAvailabilityResponse) -> AppResult<RetrievedAvailability> {
    let entities = response.entities.unwrap_or_default();

    let overall = entities
        .availabilities
        .and_then(|availabilities| availabilities.into_iter().next())
        .map(|(_, entry)| entry)
        .unwrap_or_else(|| Value::Object(Map::new()));

    let summary: AvailabilitySummary =
        serde_json::from_value::<ApiOverallAvailability>(overall.clone())?.into();

    let branches = entities
        .bib_items
        .unwrap_or_default()
        .into_iter()
        .map(|(_, item)| serde_json::from_value::<ApiBibItem>(item).map(BranchStatus::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RetrievedAvailability {
        summary,
        branches,
        overall,
    })
}

#[derive(Clone)]
pub struct BiblioCommonsAvailability {
    http_client: HttpClient,
    api_url: String,
}

impl BiblioCommonsAvailability {
    pub fn new(http_client: HttpClient, api_url: String) -> Self {
        Self {
            http_client,
            api_url,
        }
    }

    fn availability_url(&self, id: &CatalogIdentifier) -> String {
        format!("{}/{}/availability", self.api_url.trim_end_matches('/'), id)
    }

    async fn fetch_availability(&self, id: &CatalogIdentifier) -> AppResult<RetrievedAvailability> {
        let response = self
            .http_client
            .get(self.availability_url(id))
            .headers(mobile_headers())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "Availability API returned status {}",
                response.status()
            )));
        }

        let payload: ApiAvailabilityResponse = response.json().await?;
        decompose(payload)
    }
}

#[async_trait::async_trait]
impl AvailabilityRetriever for BiblioCommonsAvailability {
    async fn retrieve(&self, id: &CatalogIdentifier) -> Option<RetrievedAvailability> {
        match self.fetch_availability(id).await {
            Ok(availability) => {
                tracing::debug!(
                    record_id = %id,
                    available = availability.summary.available_copies,
                    total = availability.summary.total_copies,
                    held = availability.summary.held_copies,
                    branches = availability.branches.len(),
                    overall = %availability.overall,
                    "Availability fetched"
                );
                Some(availability)
            }
            Err(e) => {
                tracing::warn!(record_id = %id, error = %e, "Availability lookup failed");
                None
            }
        }
    }
}
