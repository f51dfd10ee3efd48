use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::domain::posts;
use crate::presentation::views::SearchHit;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct SearchService {
    posts: Arc<dyn PostsRepo>,
}

impl SearchService {
    pub fn new(posts: Arc<dyn PostsRepo>) -> Self {
        Self { posts }
    }

    /// Run a full-text query over published posts. Callers validate the query
    /// first; a blank query never reaches this method.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let records = self.posts.search_published(query).await?;

        metrics::counter!("quaderno_search_queries_total").increment(1);
        debug!(
            target: "quaderno::search",
            query = %query,
            results = records.len(),
            "search executed"
        );

        Ok(records.iter().map(search_hit).collect())
    }
}

fn search_hit(record: &PostRecord) -> SearchHit {
    let date = posts::publish_date(record).unwrap_or_else(|| record.created_at.date());

    SearchHit {
        title: record.title.clone(),
        permalink: posts::permalink(date, &record.slug),
        published: posts::format_human_date(date),
        snippet: posts::excerpt(&record.body, 200),
    }
}
