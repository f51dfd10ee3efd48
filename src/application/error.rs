use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::application::blog::BlogError;
use crate::application::mail::MailError;
use crate::application::repos::RepoError;
use crate::application::search::SearchError;
use crate::application::share::ShareError;
use crate::infra::error::InfraError;

/// Diagnostic attached to error responses so the logging middleware can
/// report the full cause chain without leaking it to clients.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

fn repo_error_to_http(source: &'static str, err: &RepoError) -> HttpError {
    match err {
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            "database timeout",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            message.clone(),
        ),
    }
}

impl From<BlogError> for HttpError {
    fn from(error: BlogError) -> Self {
        const SOURCE: &str = "application::error::blog_error";
        match error {
            BlogError::UnknownTag => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown tag",
                "tag slug did not match any known tag",
            ),
            BlogError::UnknownPage => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown page",
                "page number is beyond the last page",
            ),
            BlogError::Repo(err) => repo_error_to_http(SOURCE, &err),
        }
    }
}

impl From<ShareError> for HttpError {
    fn from(error: ShareError) -> Self {
        const SOURCE: &str = "application::error::share_error";
        match error {
            ShareError::Repo(err) => repo_error_to_http(SOURCE, &err),
            ShareError::Mail(err @ MailError::InvalidAddress { .. }) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Recommendation could not be sent",
                &err,
            ),
            ShareError::Mail(err @ MailError::Transport(_)) => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Recommendation could not be sent",
                &err,
            ),
        }
    }
}

impl From<SearchError> for HttpError {
    fn from(error: SearchError) -> Self {
        const SOURCE: &str = "application::error::search_error";
        match error {
            SearchError::Repo(err) => repo_error_to_http(SOURCE, &err),
        }
    }
}

/// Top-level error for startup and the binary entry point.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
