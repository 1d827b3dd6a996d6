use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::info;

use crate::adapters::SearchClient;
use crate::error::{NodeError, NodeResult};
use crate::schema::{ResearchPlan, SearchResult};

/// Search node.
///
/// Issues every planned query, aggregates in query order regardless of
/// completion order, de-duplicates by URL keeping the first occurrence,
/// and caps the aggregate. A single query's transient failure makes the
/// whole node retryable; there is no per-query retry isolation.
pub struct SearchNode {
    search: Arc<dyn SearchClient>,
    max_results: usize,
    max_concurrent: usize,
}

impl SearchNode {
    /// Create the node over a search client handle
    pub fn new(search: Arc<dyn SearchClient>, max_results: usize, max_concurrent: usize) -> Self {
        Self {
            search,
            max_results,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run the node.
    pub async fn run(&self, plan: &ResearchPlan) -> NodeResult<Vec<SearchResult>> {
        if plan.search_queries.is_empty() {
            return Err(NodeError::consistency("plan contains no search queries"));
        }

        let per_query = (self.max_results / plan.search_queries.len()).max(1);

        let outcomes: Vec<_> = stream::iter(plan.search_queries.iter().cloned())
            .map(|query| {
                let client = Arc::clone(&self.search);
                async move { client.search(&query, per_query).await }
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut aggregated = Vec::new();
        for outcome in outcomes {
            // Auth and other unrecoverable errors become fatal through
            // the classification; anything transient re-runs the node.
            aggregated.extend(outcome.map_err(NodeError::from)?);
        }

        let mut seen = HashSet::new();
        let mut results: Vec<SearchResult> = aggregated
            .into_iter()
            .filter(|r| seen.insert(r.url.clone()))
            .collect();
        results.truncate(self.max_results);

        if results.is_empty() {
            return Err(NodeError::retryable("no results for any search query"));
        }

        info!(
            queries = plan.search_queries.len(),
            results = results.len(),
            "Search aggregation complete"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AdapterError, AdapterResult};

    struct StubSearch {
        per_query: Vec<SearchResult>,
    }

    #[async_trait::async_trait]
    impl SearchClient for StubSearch {
        async fn search(
            &self,
            query: &str,
            _max_results: usize,
        ) -> AdapterResult<Vec<SearchResult>> {
            Ok(self
                .per_query
                .iter()
                .cloned()
                .map(|mut r| {
                    r.query = query.to_string();
                    r
                })
                .collect())
        }

        async fn ping(&self) -> AdapterResult<()> {
            Ok(())
        }
    }

    struct AuthFailingSearch;

    #[async_trait::async_trait]
    impl SearchClient for AuthFailingSearch {
        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> AdapterResult<Vec<SearchResult>> {
            Err(AdapterError::Auth {
                message: "invalid credentials".to_string(),
            })
        }

        async fn ping(&self) -> AdapterResult<()> {
            Ok(())
        }
    }

    fn result(url: &str) -> SearchResult {
        SearchResult {
            query: String::new(),
            url: url.to_string(),
            title: format!("title for {}", url),
            snippet: "snippet".to_string(),
        }
    }

    fn plan(queries: &[&str]) -> ResearchPlan {
        ResearchPlan {
            topic: "Renewable Energy Trends".to_string(),
            research_questions: vec!["What is happening?".to_string()],
            search_queries: queries.iter().map(|q| q.to_string()).collect(),
            expected_sources: vec![],
            depth_level: 3,
        }
    }

    #[tokio::test]
    async fn test_duplicate_urls_appear_once() {
        // Every query returns the same two URLs
        let node = SearchNode::new(
            Arc::new(StubSearch {
                per_query: vec![result("https://a.example"), result("https://b.example")],
            }),
            10,
            4,
        );

        let results = node.run(&plan(&["q1", "q2", "q3"])).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://a.example");
        assert_eq!(results[1].url, "https://b.example");
        // First occurrence wins, so both trace back to the first query
        assert_eq!(results[0].query, "q1");
    }

    #[tokio::test]
    async fn test_aggregate_capped_at_max_results() {
        let per_query: Vec<SearchResult> =
            (0..6).map(|i| result(&format!("https://s{}.example", i))).collect();
        let node = SearchNode::new(Arc::new(StubSearch { per_query }), 4, 2);

        // Distinct urls per query would exceed the cap without truncation
        let results = node.run(&plan(&["q1"])).await.unwrap();
        assert_eq!(results.len(), 4);
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal() {
        let node = SearchNode::new(Arc::new(AuthFailingSearch), 10, 4);
        let err = node.run(&plan(&["q1", "q2"])).await.unwrap_err();
        assert!(matches!(err, NodeError::Fatal { .. }));
    }

    #[tokio::test]
    async fn test_empty_aggregate_is_retryable() {
        let node = SearchNode::new(Arc::new(StubSearch { per_query: vec![] }), 10, 4);
        let err = node.run(&plan(&["q1"])).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
