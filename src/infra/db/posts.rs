use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::domain::types::PostStatus;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

const POST_COLUMNS: &str =
    "p.id, p.slug, p.title, p.body, p.status, p.published_at, p.created_at, p.updated_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    slug: String,
    title: String,
    body: String,
    status: PostStatus,
    published_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            body: row.body,
            status: row.status,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_published(
        &self,
        tag: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts p WHERE 1=1 "));
        Self::push_published_scope(&mut qb);
        if let Some(tag) = tag {
            Self::push_tag_filter(&mut qb, tag);
        }
        qb.push(" ORDER BY p.published_at DESC, p.id DESC ");
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::push_published_scope(&mut count_qb);
        if let Some(tag) = tag {
            Self::push_tag_filter(&mut count_qb, tag);
        }

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let records = rows.into_iter().map(PostRecord::from).collect();
        Ok(Page::new(records, page, Self::convert_count(total)?))
    }

    async fn find_published_by_date_slug(
        &self,
        date: Date,
        slug: &str,
    ) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT p.id, p.slug, p.title, p.body, p.status, p.published_at, p.created_at, p.updated_at \
             FROM posts p \
             WHERE p.slug = $1 \
               AND p.status = $2 \
               AND p.published_at IS NOT NULL \
               AND (p.published_at AT TIME ZONE 'UTC')::date = $3",
        )
        .bind(slug)
        .bind(PostStatus::Published)
        .bind(date)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn find_published_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT p.id, p.slug, p.title, p.body, p.status, p.published_at, p.created_at, p.updated_at \
             FROM posts p \
             WHERE p.id = $1 AND p.status = $2 AND p.published_at IS NOT NULL",
        )
        .bind(id)
        .bind(PostStatus::Published)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn list_similar(&self, post_id: Uuid, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(
            "SELECT p.id, p.slug, p.title, p.body, p.status, p.published_at, p.created_at, p.updated_at, \
                    COUNT(pt.tag_id) AS shared_tags \
             FROM posts p \
             INNER JOIN post_tags pt ON pt.post_id = p.id \
             WHERE pt.tag_id IN (SELECT tag_id FROM post_tags WHERE post_id = $1) \
               AND p.id <> $1 \
               AND p.status = $2 \
               AND p.published_at IS NOT NULL \
             GROUP BY p.id \
             ORDER BY shared_tags DESC, p.published_at DESC, p.id DESC \
             LIMIT $3",
        )
        .bind(post_id)
        .bind(PostStatus::Published)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn search_published(&self, query: &str) -> Result<Vec<PostRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(
            "SELECT p.id, p.slug, p.title, p.body, p.status, p.published_at, p.created_at, p.updated_at, \
                    ts_rank(to_tsvector('english', p.title || ' ' || p.body), \
                            plainto_tsquery('english', $1)) AS rank \
             FROM posts p \
             WHERE p.status = $2 \
               AND p.published_at IS NOT NULL \
               AND to_tsvector('english', p.title || ' ' || p.body) @@ plainto_tsquery('english', $1) \
             ORDER BY rank DESC, p.published_at DESC, p.id DESC",
        )
        .bind(query)
        .bind(PostStatus::Published)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }
}
