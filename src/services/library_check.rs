use std::sync::Arc;
use std::time::Duration;

use crate::{
    models::{AvailabilityResult, BookQuery},
    services::{
        catalog::{AvailabilityRetriever, RecordLocator},
        summary::{summarize, SummaryPolicy},
    },
};

/// Runs the catalog lookup pipeline for one book or a paced batch of books
#[derive(Clone)]
pub struct LibraryChecker {
    locator: Arc<dyn RecordLocator>,
    retriever: Arc<dyn AvailabilityRetriever>,
    policy: SummaryPolicy,
    /// Pause between successive books in a batch
    delay: Duration,
}

impl LibraryChecker {
    pub fn new(
        locator: Arc<dyn RecordLocator>,
        retriever: Arc<dyn AvailabilityRetriever>,
        policy: SummaryPolicy,
        delay: Duration,
    ) -> Self {
        Self {
            locator,
            retriever,
            policy,
            delay,
        }
    }

    pub fn policy(&self) -> &SummaryPolicy {
        &self.policy
    }

    /// Looks up a single book: locate, then retrieve, then summarize
    ///
    /// The retriever is only called when the locator found a record identifier.
    pub async fn check_one(&self, query: &BookQuery) -> AvailabilityResult {
        let located = self.locator.locate(query).await;

        let retrieved = match &located.id {
            Some(id) => self.retriever.retrieve(id).await,
            None => None,
        };

        let result = summarize(query, &located, retrieved.as_ref(), &self.policy);

        tracing::info!(
            title = %query.title,
            author = %query.author,
            status = ?result.status,
            preferred_branch_hit = result.preferred_branch_hit,
            "Library check completed"
        );

        result
    }

    /// Looks up books one after another, in input order
    ///
    /// Every book gets a result, whatever its verdict. Successive lookups are
    /// separated by the configured delay so the catalog is never hit in bursts.
    pub async fn check_all(&self, queries: &[BookQuery]) -> Vec<AvailabilityResult> {
        tracing::info!(
            book_count = queries.len(),
            delay_ms = self.delay.as_millis() as u64,
            "Checking library batch"
        );

        let mut results = Vec::with_capacity(queries.len());

        for (index, query) in queries.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            results.push(self.check_one(query).await);
        }

        tracing::info!(checked = results.len(), "Library batch completed");

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AvailabilitySummary, BranchStatus, CatalogIdentifier, ItemStatus, LocatedRecord,
        RetrievedAvailability, Verdict,
    };
    use crate::services::catalog::{MockAvailabilityRetriever, MockRecordLocator};
    use mockall::predicate::eq;
    use serde_json::Value;

    fn located(id: &str) -> LocatedRecord {
        LocatedRecord {
            id: Some(CatalogIdentifier::new(id)),
            url: format!("https://sfpl.bibliocommons.com/v2/record/{}", id),
        }
    }

    fn on_shelf(branch: &str) -> RetrievedAvailability {
        RetrievedAvailability {
            summary: AvailabilitySummary {
                total_copies: 1,
                available_copies: 1,
                held_copies: 0,
            },
            branches: vec![BranchStatus {
                branch_name: branch.to_string(),
                status: ItemStatus::Available,
                call_number: String::new(),
            }],
            overall: Value::Null,
        }
    }

    fn checker(
        locator: MockRecordLocator,
        retriever: MockAvailabilityRetriever,
        delay: Duration,
    ) -> LibraryChecker {
        LibraryChecker::new(
            Arc::new(locator),
            Arc::new(retriever),
            SummaryPolicy::new("PARK BRANCH", "SFPL"),
            delay,
        )
    }

    #[tokio::test]
    async fn test_not_found_never_calls_retriever() {
        let mut locator = MockRecordLocator::new();
        locator
            .expect_locate()
            .times(1)
            .returning(|_| LocatedRecord::missing());

        let mut retriever = MockAvailabilityRetriever::new();
        retriever.expect_retrieve().never();

        let result = checker(locator, retriever, Duration::ZERO)
            .check_one(&BookQuery::new("Nonexistent Book", "Nobody"))
            .await;

        assert_eq!(result.status, Verdict::NotFound);
    }

    #[tokio::test]
    async fn test_retriever_failure_is_check_online() {
        let mut locator = MockRecordLocator::new();
        locator.expect_locate().returning(|_| located("S93C1"));

        let mut retriever = MockAvailabilityRetriever::new();
        retriever
            .expect_retrieve()
            .with(eq(CatalogIdentifier::new("S93C1")))
            .times(1)
            .returning(|_| None);

        let result = checker(locator, retriever, Duration::ZERO)
            .check_one(&BookQuery::new("Dune", "Frank Herbert"))
            .await;

        assert_eq!(result.status, Verdict::CheckOnline);
        assert_eq!(result.url, "https://sfpl.bibliocommons.com/v2/record/S93C1");
    }

    #[tokio::test]
    async fn test_available_at_preferred_branch() {
        let mut locator = MockRecordLocator::new();
        locator.expect_locate().returning(|_| located("S93C1"));

        let mut retriever = MockAvailabilityRetriever::new();
        retriever
            .expect_retrieve()
            .returning(|_| Some(on_shelf("PARK BRANCH")));

        let result = checker(locator, retriever, Duration::ZERO)
            .check_one(&BookQuery::new("Dune", "Frank Herbert"))
            .await;

        assert_eq!(result.status, Verdict::Available);
        assert!(result.preferred_branch_hit);
    }

    #[tokio::test]
    async fn test_batch_preserves_order_through_failures() {
        let mut locator = MockRecordLocator::new();
        locator.expect_locate().times(4).returning(|query| match query.title.as_str() {
            "Lost" => LocatedRecord::missing(),
            "Flaky" => located("S1C1"),
            "Shelved" => located("S2C2"),
            _ => located("S3C3"),
        });

        let mut retriever = MockAvailabilityRetriever::new();
        retriever
            .expect_retrieve()
            .times(3)
            .returning(|id| match id.as_str() {
                "S1C1" => None,
                "S2C2" => Some(on_shelf("MAIN")),
                _ => Some(RetrievedAvailability {
                    summary: AvailabilitySummary::default(),
                    branches: vec![],
                    overall: Value::Null,
                }),
            });

        let queries = vec![
            BookQuery::new("Flaky", "A"),
            BookQuery::new("Lost", "B"),
            BookQuery::new("Shelved", "C"),
            BookQuery::new("Circulating", "D"),
        ];

        let results = checker(locator, retriever, Duration::ZERO)
            .check_all(&queries)
            .await;

        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Flaky", "Lost", "Shelved", "Circulating"]);

        let statuses: Vec<Verdict> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                Verdict::CheckOnline,
                Verdict::NotFound,
                Verdict::Available,
                Verdict::InUse
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let mut locator = MockRecordLocator::new();
        locator.expect_locate().never();
        let retriever = MockAvailabilityRetriever::new();

        let results = checker(locator, retriever, Duration::from_millis(500))
            .check_all(&[])
            .await;

        assert!(results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_paces_lookups() {
        let mut locator = MockRecordLocator::new();
        locator
            .expect_locate()
            .times(3)
            .returning(|_| LocatedRecord::missing());
        let retriever = MockAvailabilityRetriever::new();

        let queries = vec![
            BookQuery::new("One", ""),
            BookQuery::new("Two", ""),
            BookQuery::new("Three", ""),
        ];

        let started = tokio::time::Instant::now();
        let results = checker(locator, retriever, Duration::from_millis(500))
            .check_all(&queries)
            .await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 3);
        // Two gaps between three books, none after the last
        assert!(elapsed >= Duration::from_millis(1000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1500), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_check_is_not_delayed() {
        let mut locator = MockRecordLocator::new();
        locator
            .expect_locate()
            .returning(|_| LocatedRecord::missing());
        let retriever = MockAvailabilityRetriever::new();

        let started = tokio::time::Instant::now();
        checker(locator, retriever, Duration::from_millis(500))
            .check_one(&BookQuery::new("One", ""))
            .await;

        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
