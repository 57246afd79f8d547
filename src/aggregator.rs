use futures::{StreamExt, stream};
use serde_json::Value;
use thiserror::Error;

use crate::error::UpstreamError;
use crate::spoonacular::{SearchQuery, SpoonacularClient};

/// Number of search hits a by-name lookup expands into full recipes.
pub const BYNAME_RESULT_COUNT: u32 = 5;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("search failed: {0}")]
    Search(#[source] UpstreamError),

    #[error("no recipe found for {0:?}")]
    NoResults(String),
}

/// Result of the detail call for one search hit.
#[derive(Debug)]
pub enum DetailOutcome {
    Fetched { id: u64, detail: Value },
    Failed { id: u64, error: UpstreamError },
}

#[derive(Debug)]
pub struct Aggregation {
    /// One entry per search hit, in search order.
    pub outcomes: Vec<DetailOutcome>,
}

impl Aggregation {
    pub fn fetched_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DetailOutcome::Fetched { .. }))
            .count()
    }

    pub fn dropped_count(&self) -> usize {
        self.outcomes.len() - self.fetched_count()
    }

    /// Keeps the successful details in search order and discards failures.
    pub fn into_details(self) -> Vec<Value> {
        self.outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                DetailOutcome::Fetched { detail, .. } => Some(detail),
                DetailOutcome::Failed { .. } => None,
            })
            .collect()
    }
}

pub struct Aggregator<'a> {
    client: &'a SpoonacularClient,
    concurrency: usize,
}

impl<'a> Aggregator<'a> {
    pub fn new(client: &'a SpoonacularClient, concurrency: usize) -> Aggregator<'a> {
        Aggregator {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Searches for `query` and fetches the details of every hit.
    ///
    /// Detail failures never fail the whole call: they are logged and kept as
    /// [`DetailOutcome::Failed`]. With a concurrency of 1 the detail calls run
    /// strictly one after another; above that at most `concurrency` are in
    /// flight and outcomes still come back in search order.
    pub async fn recipes_by_name(&self, query: &str) -> Result<Aggregation, AggregateError> {
        let page = self
            .client
            .search_page(&SearchQuery::new(query, BYNAME_RESULT_COUNT))
            .await
            .map_err(AggregateError::Search)?;

        let results = page.into_results();
        if results.is_empty() {
            return Err(AggregateError::NoResults(query.to_string()));
        }

        let client = self.client;
        let outcomes = stream::iter(results.into_iter().map(|r| r.id))
            .map(|id| async move {
                match client.recipe_information(id).await {
                    Ok(detail) => DetailOutcome::Fetched { id, detail },
                    Err(error) => {
                        log::warn!("failed to fetch info for recipe id {id}, error: {:#}", error);
                        DetailOutcome::Failed { id, error }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(Aggregation { outcomes })
    }
}
