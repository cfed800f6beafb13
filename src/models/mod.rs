use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

pub mod books;

pub use books::{RankedPick, Recommendation, ShelfBook};

/// A book to look up in the library catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookQuery {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

impl BookQuery {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
        }
    }

    /// Free-text query sent to the catalog search
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.author)
    }
}

/// Catalog record identifier (e.g., "S93C3536620")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogIdentifier(String);

impl CatalogIdentifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CatalogIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a catalog search: the first record's identifier and page URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatedRecord {
    pub id: Option<CatalogIdentifier>,
    pub url: String,
}

impl LocatedRecord {
    /// No record found, or the search could not be performed
    pub fn missing() -> Self {
        Self::default()
    }
}

// ============================================================================
// Availability Types
// ============================================================================

/// Circulation status of one holding, as reported upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemStatus {
    Available,
    CheckedOut,
    Unknown,
    Other(String),
}

impl From<String> for ItemStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "AVAILABLE" => ItemStatus::Available,
            "CHECKED_OUT" => ItemStatus::CheckedOut,
            "UNKNOWN" => ItemStatus::Unknown,
            _ => ItemStatus::Other(status),
        }
    }
}

impl From<ItemStatus> for String {
    fn from(status: ItemStatus) -> Self {
        status.to_string()
    }
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Available => write!(f, "AVAILABLE"),
            ItemStatus::CheckedOut => write!(f, "CHECKED_OUT"),
            ItemStatus::Unknown => write!(f, "UNKNOWN"),
            ItemStatus::Other(status) => write!(f, "{}", status),
        }
    }
}

/// One holding location for a catalog record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchStatus {
    pub branch_name: String,
    pub status: ItemStatus,
    pub call_number: String,
}

/// Aggregate copy counts for a catalog record
///
/// Counts are passed through as reported; `available_copies` may exceed
/// `total_copies` in upstream data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySummary {
    pub total_copies: u64,
    pub available_copies: u64,
    pub held_copies: u64,
}

/// Decoded availability payload for one record
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedAvailability {
    pub summary: AvailabilitySummary,
    /// Holdings in upstream order, not deduplicated
    pub branches: Vec<BranchStatus>,
    /// The raw overall entry the summary was read from
    pub overall: Value,
}

/// Verdict for a single book
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Available,
    InUse,
    NotFound,
    Unknown,
    CheckOnline,
}

/// Availability of one book, as returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityResult {
    pub title: String,
    pub author: String,
    pub status: Verdict,
    pub detail: String,
    pub url: String,
    pub holds: String,
    pub preferred_branch_hit: bool,
    pub branches_available: Vec<String>,
}

// ============================================================================
// BiblioCommons API Types
// ============================================================================

/// API response from GET /bibs/{id}/availability
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAvailabilityResponse {
    #[serde(default)]
    pub entities: Option<ApiAvailabilityEntities>,
}

/// Entity maps keyed by opaque upstream ids, in document order
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAvailabilityEntities {
    #[serde(default)]
    pub availabilities: Option<Map<String, Value>>,
    #[serde(default)]
    pub bib_items: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOverallAvailability {
    #[serde(default)]
    pub total_copies: Option<u64>,
    #[serde(default)]
    pub available_copies: Option<u64>,
    #[serde(default)]
    pub held_copies: Option<u64>,
}

impl From<ApiOverallAvailability> for AvailabilitySummary {
    fn from(api: ApiOverallAvailability) -> Self {
        Self {
            total_copies: api.total_copies.unwrap_or(0),
            available_copies: api.available_copies.unwrap_or(0),
            held_copies: api.held_copies.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBibItem {
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub call_number: Option<String>,
    #[serde(default)]
    pub availability: Option<ApiItemAvailability>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiItemAvailability {
    #[serde(default)]
    pub status: Option<String>,
}

impl From<ApiBibItem> for BranchStatus {
    fn from(item: ApiBibItem) -> Self {
        let status = item
            .availability
            .and_then(|a| a.status)
            .map(ItemStatus::from)
            .unwrap_or(ItemStatus::Unknown);

        BranchStatus {
            branch_name: item.branch_name.unwrap_or_default(),
            status,
            call_number: item.call_number.unwrap_or_default(),
        }
    }
}
