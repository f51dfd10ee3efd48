//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::Date;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{CommentRecord, PostRecord, TagRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Published posts in reverse publish order, optionally restricted to a
    /// tag slug, as one page of a page-number pagination.
    async fn list_published(
        &self,
        tag: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<PostRecord>, RepoError>;

    /// The single published post matching a UTC publish date and slug.
    async fn find_published_by_date_slug(
        &self,
        date: Date,
        slug: &str,
    ) -> Result<Option<PostRecord>, RepoError>;

    async fn find_published_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    /// Published posts sharing at least one tag with `post_id`, excluding the
    /// post itself, ordered by shared-tag count then recency.
    async fn list_similar(&self, post_id: Uuid, limit: u32) -> Result<Vec<PostRecord>, RepoError>;

    /// Full-text search over title and body, published posts only, ranked by
    /// relevance then recency.
    async fn search_published(&self, query: &str) -> Result<Vec<PostRecord>, RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError>;

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, RepoError>;

    /// All tags with their published-post counts, for the listing sidebar.
    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub name: String,
    pub email: String,
    pub body: String,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Active comments for a post, oldest first.
    async fn list_active_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;

    /// Insert a comment; the active flag takes the storage default.
    async fn insert(&self, comment: NewComment) -> Result<CommentRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct TagWithCount {
    pub slug: String,
    pub name: String,
    pub count: u64,
}
