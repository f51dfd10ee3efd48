use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::application::mail::{MailError, Mailer, OutgoingEmail};
use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::domain::posts;

/// A validated recommendation submission.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: Option<String>,
}

#[derive(Debug, Error)]
pub enum ShareError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

#[derive(Clone)]
pub struct ShareService {
    posts: Arc<dyn PostsRepo>,
    mailer: Arc<dyn Mailer>,
    public_site_url: Url,
}

impl ShareService {
    pub fn new(posts: Arc<dyn PostsRepo>, mailer: Arc<dyn Mailer>, public_site_url: Url) -> Self {
        Self {
            posts,
            mailer,
            public_site_url,
        }
    }

    pub async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, ShareError> {
        self.posts
            .find_published_by_id(id)
            .await
            .map_err(ShareError::from)
    }

    /// Compose and dispatch exactly one recommendation email for `post`.
    pub async fn send_recommendation(
        &self,
        post: &PostRecord,
        recommendation: Recommendation,
    ) -> Result<(), ShareError> {
        let email = compose_recommendation(&self.public_site_url, post, &recommendation);
        let recipient = email.to.clone();
        self.mailer.send(email).await?;

        metrics::counter!("quaderno_share_emails_sent_total").increment(1);
        info!(
            target: "quaderno::share",
            post = %post.slug,
            to = %recipient,
            "recommendation email sent"
        );

        Ok(())
    }
}

fn compose_recommendation(
    site_url: &Url,
    post: &PostRecord,
    recommendation: &Recommendation,
) -> OutgoingEmail {
    let post_url = absolute_post_url(site_url, post);
    let subject = format!("{} recommends you read {}", recommendation.name, post.title);
    let comments = recommendation.comments.as_deref().unwrap_or_default();
    let body = format!(
        "Read {} at {}\n\n{}'s comments: {}",
        post.title, post_url, recommendation.name, comments
    );

    OutgoingEmail {
        to: recommendation.to.clone(),
        reply_to: Some(recommendation.email.clone()),
        subject,
        body,
    }
}

/// Absolute URL for a post, built from the configured public site URL.
pub fn absolute_post_url(site_url: &Url, post: &PostRecord) -> String {
    let date = posts::publish_date(post).unwrap_or_else(|| post.created_at.date());
    let permalink = posts::permalink(date, &post.slug);
    site_url
        .join(permalink.trim_start_matches('/'))
        .map(String::from)
        .unwrap_or(permalink)
}
