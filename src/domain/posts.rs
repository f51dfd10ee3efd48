//! Date and permalink helpers for published posts.

use time::{Date, format_description::FormatItem, macros::format_description};

use crate::domain::entities::PostRecord;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");

/// UTC calendar date a post was published on, if it was.
pub fn publish_date(post: &PostRecord) -> Option<Date> {
    post.published_at.map(|stamp| stamp.date())
}

/// Canonical site-relative path for a published post.
///
/// Slugs are unique per publish date, so the date prefix disambiguates.
pub fn permalink(date: Date, slug: &str) -> String {
    format!(
        "/{:04}/{:02}/{:02}/{}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        slug
    )
}

pub fn format_human_date(date: Date) -> String {
    date.format(HUMAN_DATE_FORMAT).expect("valid calendar date")
}

/// A short plain-text preview of the first paragraph, clipped at a word
/// boundary.
pub fn excerpt(body: &str, max_len: usize) -> String {
    let first = body.split("\n\n").map(str::trim).find(|p| !p.is_empty());
    let Some(paragraph) = first else {
        return String::new();
    };

    if paragraph.chars().count() <= max_len {
        return paragraph.to_string();
    }

    let mut clipped = String::with_capacity(max_len);
    for word in paragraph.split_whitespace() {
        if clipped.chars().count() + word.chars().count() + 1 > max_len {
            break;
        }
        if !clipped.is_empty() {
            clipped.push(' ');
        }
        clipped.push_str(word);
    }
    clipped.push('…');
    clipped
}

/// Split a plain-text body into paragraphs on blank lines.
pub fn body_paragraphs(body: &str) -> Vec<String> {
    body.split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(str::to_string)
        .collect()
}
