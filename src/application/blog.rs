use std::sync::Arc;

use thiserror::Error;
use time::Date;
use tracing::info;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{CommentsRepo, PostsRepo, RepoError, TagWithCount, TagsRepo};
use crate::domain::entities::{CommentRecord, PostRecord, TagRecord};
use crate::domain::posts;
use crate::presentation::views::{
    CommentFormView, CommentView, DetailContext, ListContext, PaginationView, PostCard,
    PostDetailView, TagBadge, TagSummary,
};

/// Which slice of the published feed a listing request addresses.
#[derive(Debug, Clone)]
pub enum ListFilter {
    All,
    Tag(String),
}

impl ListFilter {
    pub fn tag(&self) -> Option<&str> {
        match self {
            ListFilter::Tag(value) => Some(value.as_str()),
            ListFilter::All => None,
        }
    }

    pub fn base_path(&self) -> String {
        match self {
            ListFilter::All => "/".to_string(),
            ListFilter::Tag(value) => format!("/tags/{value}"),
        }
    }
}

/// Listing knobs resolved from configuration at startup.
#[derive(Debug, Clone, Copy)]
pub struct ListingSettings {
    pub page_size: u32,
    pub similar_posts: u32,
}

/// A validated comment submission, ready to persist.
#[derive(Debug, Clone)]
pub struct CommentSubmission {
    pub name: String,
    pub email: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("unknown tag")]
    UnknownTag,
    #[error("page out of range")]
    UnknownPage,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct BlogService {
    posts: Arc<dyn PostsRepo>,
    tags: Arc<dyn TagsRepo>,
    comments: Arc<dyn CommentsRepo>,
    settings: ListingSettings,
}

impl BlogService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        tags: Arc<dyn TagsRepo>,
        comments: Arc<dyn CommentsRepo>,
        settings: ListingSettings,
    ) -> Self {
        Self {
            posts,
            tags,
            comments,
            settings,
        }
    }

    pub async fn list_page(
        &self,
        filter: ListFilter,
        page_number: u32,
    ) -> Result<ListContext, BlogError> {
        let active_tag = match filter.tag() {
            Some(slug) => match self.tags.find_by_slug(slug).await? {
                Some(tag) => Some(tag),
                None => return Err(BlogError::UnknownTag),
            },
            None => None,
        };

        let request = PageRequest::new(page_number, self.settings.page_size)
            .map_err(|_| BlogError::UnknownPage)?;
        let page = self.posts.list_published(filter.tag(), request).await?;
        if page.is_out_of_range() {
            return Err(BlogError::UnknownPage);
        }

        let mut cards = Vec::with_capacity(page.items.len());
        for record in &page.items {
            let tags = self.tags.list_for_post(record.id).await?;
            cards.push(post_card(record, &tags));
        }

        let tag_counts = self.tags.list_with_counts().await?;

        Ok(ListContext {
            post_count: cards.len(),
            posts: cards,
            pagination: pagination_view(&page, filter.base_path()),
            active_tag: active_tag.map(|tag| tag_badge(&tag)),
            tags: tag_summaries(&tag_counts, filter.tag()),
        })
    }

    /// The single published post behind a detail or comment route.
    pub async fn find_post(
        &self,
        date: Date,
        slug: &str,
    ) -> Result<Option<PostRecord>, BlogError> {
        self.posts
            .find_published_by_date_slug(date, slug)
            .await
            .map_err(BlogError::from)
    }

    /// Detail-page context with a fresh comment form; comment state is
    /// adjusted by the handler after a submission.
    pub async fn detail_context(&self, post: &PostRecord) -> Result<DetailContext, BlogError> {
        let tags = self.tags.list_for_post(post.id).await?;
        let comments = self.comments.list_active_for_post(post.id).await?;

        let similar_records = self
            .posts
            .list_similar(post.id, self.settings.similar_posts)
            .await?;
        let mut similar = Vec::with_capacity(similar_records.len());
        for record in &similar_records {
            let tags = self.tags.list_for_post(record.id).await?;
            similar.push(post_card(record, &tags));
        }

        Ok(DetailContext {
            post: post_detail_view(post, &tags),
            comment_count: comments.len(),
            comments: comments.iter().map(comment_view).collect(),
            new_comment: None,
            form: CommentFormView::default(),
            similar,
        })
    }

    pub async fn submit_comment(
        &self,
        post: &PostRecord,
        submission: CommentSubmission,
    ) -> Result<CommentView, BlogError> {
        let record = self
            .comments
            .insert(crate::application::repos::NewComment {
                post_id: post.id,
                name: submission.name,
                email: submission.email,
                body: submission.body,
            })
            .await?;

        metrics::counter!("quaderno_comments_created_total").increment(1);
        info!(
            target: "quaderno::blog",
            post = %post.slug,
            comment = %record.id,
            "comment created"
        );

        Ok(comment_view(&record))
    }
}

pub(crate) fn post_card(record: &PostRecord, tags: &[TagRecord]) -> PostCard {
    let date = posts::publish_date(record).unwrap_or_else(|| record.created_at.date());

    PostCard {
        title: record.title.clone(),
        permalink: posts::permalink(date, &record.slug),
        published: posts::format_human_date(date),
        excerpt: posts::excerpt(&record.body, 200),
        badges: tags.iter().map(tag_badge).collect(),
    }
}

fn post_detail_view(record: &PostRecord, tags: &[TagRecord]) -> PostDetailView {
    let date = posts::publish_date(record).unwrap_or_else(|| record.created_at.date());

    PostDetailView {
        title: record.title.clone(),
        permalink: posts::permalink(date, &record.slug),
        share_path: format!("/posts/{}/share", record.id),
        published: posts::format_human_date(date),
        paragraphs: posts::body_paragraphs(&record.body),
        badges: tags.iter().map(tag_badge).collect(),
    }
}

fn comment_view(record: &CommentRecord) -> CommentView {
    CommentView {
        name: record.name.clone(),
        body: record.body.clone(),
        published: posts::format_human_date(record.created_at.date()),
    }
}

fn tag_badge(tag: &TagRecord) -> TagBadge {
    TagBadge {
        label: tag.name.clone(),
        path: format!("/tags/{}", tag.slug),
    }
}

fn pagination_view(page: &Page<PostRecord>, base_path: String) -> PaginationView {
    PaginationView {
        number: page.number,
        total_pages: page.total_pages(),
        has_previous: page.has_previous(),
        has_next: page.has_next(),
        previous_page: page.number.saturating_sub(1),
        next_page: page.number.saturating_add(1),
        base_path,
    }
}

fn tag_summaries(counts: &[TagWithCount], active_tag: Option<&str>) -> Vec<TagSummary> {
    counts
        .iter()
        .map(|entry| TagSummary {
            label: format!("#{}", entry.name),
            path: format!("/tags/{}", entry.slug),
            count: usize::try_from(entry.count).unwrap_or(usize::MAX),
            is_active: active_tag == Some(entry.slug.as_str()),
        })
        .collect()
}
