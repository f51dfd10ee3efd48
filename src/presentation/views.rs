use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::error::{ErrorReport, HttpError};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct FooterView {
    pub copy: String,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
}

/// Shared layout state resolved once from configuration.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub footer: FooterView,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    /// Replace the document title for a content-specific page.
    pub fn with_title(self, title: String) -> Self {
        Self {
            meta: PageMetaView {
                title,
                ..self.meta
            },
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub footer: FooterView,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            footer: chrome.footer,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Clone)]
pub struct TagBadge {
    pub label: String,
    pub path: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub title: String,
    pub permalink: String,
    pub published: String,
    pub excerpt: String,
    pub badges: Vec<TagBadge>,
}

#[derive(Clone)]
pub struct TagSummary {
    pub label: String,
    pub path: String,
    pub count: usize,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct PaginationView {
    pub number: u32,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page: u32,
    pub next_page: u32,
    pub base_path: String,
}

pub struct ListContext {
    pub posts: Vec<PostCard>,
    pub post_count: usize,
    pub pagination: PaginationView,
    pub active_tag: Option<TagBadge>,
    pub tags: Vec<TagSummary>,
}

#[derive(Template)]
#[template(path = "list.html")]
pub struct ListTemplate {
    pub view: LayoutContext<ListContext>,
}

#[derive(Clone)]
pub struct PostDetailView {
    pub title: String,
    pub permalink: String,
    pub share_path: String,
    pub published: String,
    pub paragraphs: Vec<String>,
    pub badges: Vec<TagBadge>,
}

#[derive(Clone)]
pub struct CommentView {
    pub name: String,
    pub body: String,
    pub published: String,
}

/// Comment form state echoed back on re-render.
#[derive(Clone, Default)]
pub struct CommentFormView {
    pub name: String,
    pub email: String,
    pub body: String,
    pub errors: Vec<String>,
}

pub struct DetailContext {
    pub post: PostDetailView,
    pub comments: Vec<CommentView>,
    pub comment_count: usize,
    pub new_comment: Option<CommentView>,
    pub form: CommentFormView,
    pub similar: Vec<PostCard>,
}

#[derive(Template)]
#[template(path = "detail.html")]
pub struct DetailTemplate {
    pub view: LayoutContext<DetailContext>,
}

#[derive(Clone, Default)]
pub struct ShareFormView {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: String,
    pub errors: Vec<String>,
}

pub struct ShareContext {
    pub post_title: String,
    pub permalink: String,
    pub form: ShareFormView,
    pub sent: bool,
}

#[derive(Template)]
#[template(path = "share.html")]
pub struct ShareTemplate {
    pub view: LayoutContext<ShareContext>,
}

#[derive(Clone)]
pub struct SearchHit {
    pub title: String,
    pub permalink: String,
    pub published: String,
    pub snippet: String,
}

#[derive(Clone, Default)]
pub struct SearchFormView {
    pub query: String,
    pub errors: Vec<String>,
}

pub struct SearchContext {
    pub form: SearchFormView,
    pub query: Option<String>,
    pub results: Vec<SearchHit>,
    pub result_count: usize,
}

impl SearchContext {
    pub fn empty() -> Self {
        Self {
            form: SearchFormView::default(),
            query: None,
            results: Vec::new(),
            result_count: 0,
        }
    }
}

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub view: LayoutContext<SearchContext>,
}

pub struct ErrorPageView {
    pub heading: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            heading: "Page not found".to_string(),
            message: "The page you were looking for does not exist or is no longer published."
                .to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
