//! Public form payloads and their validation.
//!
//! Validation never mutates state: a failed form re-renders the page with
//! field errors and the submitted values echoed back.

use lettre::Address;
use serde::Deserialize;
use thiserror::Error;

use crate::application::blog::CommentSubmission;
use crate::application::share::Recommendation;

const MAX_COMMENT_NAME: usize = 80;
const MAX_SHARE_NAME: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("`{field}` is required")]
    Required { field: &'static str },
    #[error("`{field}` must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("`{field}` must be a valid email address")]
    InvalidEmail { field: &'static str },
}

pub fn error_messages(errors: &[FieldError]) -> Vec<String> {
    errors.iter().map(FieldError::to_string).collect()
}

fn require<'a>(
    value: &'a str,
    field: &'static str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::Required { field });
        None
    } else {
        Some(trimmed)
    }
}

fn check_length(value: &str, field: &'static str, max: usize, errors: &mut Vec<FieldError>) {
    if value.chars().count() > max {
        errors.push(FieldError::TooLong { field, max });
    }
}

fn check_email(value: &str, field: &'static str, errors: &mut Vec<FieldError>) {
    if value.parse::<Address>().is_err() {
        errors.push(FieldError::InvalidEmail { field });
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub name: String,
    pub email: String,
    pub body: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<CommentSubmission, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = require(&self.name, "name", &mut errors);
        if let Some(name) = name {
            check_length(name, "name", MAX_COMMENT_NAME, &mut errors);
        }

        let email = require(&self.email, "email", &mut errors);
        if let Some(email) = email {
            check_email(email, "email", &mut errors);
        }

        let body = require(&self.body, "body", &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CommentSubmission {
            name: name.unwrap_or_default().to_string(),
            email: email.unwrap_or_default().to_string(),
            body: body.unwrap_or_default().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmailPostForm {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: String,
}

impl EmailPostForm {
    pub fn validate(&self) -> Result<Recommendation, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = require(&self.name, "name", &mut errors);
        if let Some(name) = name {
            check_length(name, "name", MAX_SHARE_NAME, &mut errors);
        }

        let email = require(&self.email, "email", &mut errors);
        if let Some(email) = email {
            check_email(email, "email", &mut errors);
        }

        let to = require(&self.to, "to", &mut errors);
        if let Some(to) = to {
            check_email(to, "to", &mut errors);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let comments = self.comments.trim();
        Ok(Recommendation {
            name: name.unwrap_or_default().to_string(),
            email: email.unwrap_or_default().to_string(),
            to: to.unwrap_or_default().to_string(),
            comments: (!comments.is_empty()).then(|| comments.to_string()),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchForm {
    pub query: String,
}

impl SearchForm {
    pub fn validate(&self) -> Result<String, Vec<FieldError>> {
        let trimmed = self.query.trim();
        if trimmed.is_empty() {
            return Err(vec![FieldError::Required { field: "query" }]);
        }
        Ok(trimmed.to_string())
    }
}
