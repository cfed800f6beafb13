//! Library catalog abstraction
//!
//! A lookup runs in two steps: the locator turns a (title, author) pair into a
//! record identifier by scraping the catalog's search page, and the retriever
//! fetches per-copy status for that identifier from the availability API.
//! Both steps swallow upstream failures and report them as absent values.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use crate::models::{BookQuery, CatalogIdentifier, LocatedRecord, RetrievedAvailability};

pub mod availability;
pub mod search;

pub use availability::BiblioCommonsAvailability;
pub use search::BiblioCommonsSearch;

/// Branches of the San Francisco Public Library, as named in availability data
pub const BRANCHES: &[&str] = &[
    "ANZA BRANCH",
    "BAYVIEW BRANCH",
    "BERNAL HEIGHTS BRANCH",
    "CHINATOWN BRANCH",
    "EUREKA VALLEY BRANCH",
    "EXCELSIOR BRANCH",
    "GLEN PARK BRANCH",
    "GOLDEN GATE VALLEY BRANCH",
    "INGLESIDE BRANCH",
    "MAIN",
    "MARINA BRANCH",
    "MERCED BRANCH",
    "MISSION BRANCH",
    "MISSION BAY BRANCH",
    "NOE VALLEY BRANCH",
    "NORTH BEACH BRANCH",
    "OCEAN VIEW BRANCH",
    "ORTEGA BRANCH",
    "PARK BRANCH",
    "PARKSIDE BRANCH",
    "PORTOLA BRANCH",
    "POTRERO BRANCH",
    "PRESIDIO BRANCH",
    "RICHMOND BRANCH",
    "SUNSET BRANCH",
    "VISITACION VALLEY BRANCH",
    "WEST PORTAL BRANCH",
    "WESTERN ADDITION BRANCH",
];

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

/// Finds the catalog record for a book
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecordLocator: Send + Sync {
    /// Returns the first search hit's identifier and URL.
    ///
    /// Transport failures, error statuses and empty result pages all yield
    /// [`LocatedRecord::missing`]. A URL may be present without an identifier.
    async fn locate(&self, query: &BookQuery) -> LocatedRecord;
}

/// Fetches per-branch copy status for a catalog record
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AvailabilityRetriever: Send + Sync {
    /// Returns `None` when availability could not be verified.
    async fn retrieve(&self, id: &CatalogIdentifier) -> Option<RetrievedAvailability>;
}

/// Header set sent with catalog search page requests
fn desktop_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers
}

/// Header set sent with availability API requests
fn mobile_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(MOBILE_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Serves one canned HTTP response to every connection, returning the base URL
#[cfg(test)]
pub(crate) async fn serve_canned(status: &'static str, body: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}", address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branches_include_default_preferred_branch() {
        assert!(BRANCHES.contains(&"PARK BRANCH"));
        assert_eq!(BRANCHES.len(), 28);
    }

    #[test]
    fn test_header_sets_differ_by_client_profile() {
        let desktop = desktop_headers();
        let mobile = mobile_headers();

        assert!(desktop[USER_AGENT].to_str().unwrap().contains("Macintosh"));
        assert!(mobile[USER_AGENT].to_str().unwrap().contains("iPhone"));
        assert_eq!(mobile[ACCEPT], "application/json");
    }
}
