use std::sync::Arc;

use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use time::{Date, Month};
use uuid::Uuid;

use crate::{
    application::{
        blog::{BlogError, BlogService, ListFilter},
        error::{ErrorReport, HttpError},
        search::SearchService,
        share::ShareService,
    },
    config::SiteSettings,
    domain::{entities::PostRecord, posts},
    infra::db::PostgresRepositories,
    presentation::views::{
        BrandView, CommentFormView, DetailTemplate, FooterView, LayoutChrome, LayoutContext,
        ListTemplate, PageMetaView, SearchContext, SearchFormView, SearchTemplate, ShareContext,
        ShareFormView, ShareTemplate, render_not_found_response, render_template_response,
    },
};

use super::{
    db_health_response,
    forms::{CommentForm, EmailPostForm, SearchForm, error_messages},
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub blog: Arc<BlogService>,
    pub share: Arc<ShareService>,
    pub search: Arc<SearchService>,
    pub db: Arc<PostgresRepositories>,
    pub chrome: LayoutChrome,
}

/// Layout chrome resolved once from site configuration.
pub fn site_chrome(site: &SiteSettings) -> LayoutChrome {
    LayoutChrome {
        brand: BrandView {
            title: site.title.clone(),
            href: "/".to_string(),
        },
        footer: FooterView {
            copy: site.footer_copy.clone(),
        },
        meta: PageMetaView {
            title: site.title.clone(),
            description: site.description.clone(),
        },
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/tags/{tag}", get(tag_index))
        .route("/search", get(post_search))
        .route("/posts/{id}/share", get(post_share).post(submit_share))
        .route(
            "/{year}/{month}/{day}/{slug}",
            get(post_detail).post(submit_comment),
        )
        .route("/_health/db", get(public_health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchParams {
    query: Option<String>,
}

async fn index(State(state): State<HttpState>, Query(query): Query<PageQuery>) -> Response {
    list_response(&state, ListFilter::All, query.page.unwrap_or(1)).await
}

async fn tag_index(
    State(state): State<HttpState>,
    Path(tag): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    list_response(&state, ListFilter::Tag(tag), query.page.unwrap_or(1)).await
}

async fn list_response(state: &HttpState, filter: ListFilter, page: u32) -> Response {
    match state.blog.list_page(filter, page).await {
        Ok(content) => {
            let view = LayoutContext::new(state.chrome.clone(), content);
            render_template_response(ListTemplate { view }, StatusCode::OK)
        }
        Err(err) => blog_error_to_response(err, state.chrome.clone()),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Path((year, month, day, slug)): Path<(i32, u8, u8, String)>,
) -> Response {
    let chrome = state.chrome.clone();
    let Some(post) = (match lookup_post(&state, year, month, day, &slug).await {
        Ok(post) => post,
        Err(response) => return response,
    }) else {
        return render_not_found_response(chrome);
    };

    match state.blog.detail_context(&post).await {
        Ok(content) => {
            let view = LayoutContext::new(chrome.with_title(post.title.clone()), content);
            render_template_response(DetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => blog_error_to_response(err, chrome),
    }
}

async fn submit_comment(
    State(state): State<HttpState>,
    Path((year, month, day, slug)): Path<(i32, u8, u8, String)>,
    Form(form): Form<CommentForm>,
) -> Response {
    let chrome = state.chrome.clone();
    let Some(post) = (match lookup_post(&state, year, month, day, &slug).await {
        Ok(post) => post,
        Err(response) => return response,
    }) else {
        return render_not_found_response(chrome);
    };

    // Context is gathered before the insert so a fresh comment appears only
    // as `new_comment`, not in the listed thread.
    let mut content = match state.blog.detail_context(&post).await {
        Ok(content) => content,
        Err(err) => return blog_error_to_response(err, chrome),
    };

    match form.validate() {
        Ok(submission) => match state.blog.submit_comment(&post, submission).await {
            Ok(comment) => content.new_comment = Some(comment),
            Err(err) => return blog_error_to_response(err, chrome),
        },
        Err(errors) => {
            content.form = CommentFormView {
                name: form.name.clone(),
                email: form.email.clone(),
                body: form.body.clone(),
                errors: error_messages(&errors),
            };
        }
    }

    let view = LayoutContext::new(chrome.with_title(post.title.clone()), content);
    render_template_response(DetailTemplate { view }, StatusCode::OK)
}

async fn post_share(State(state): State<HttpState>, Path(id): Path<Uuid>) -> Response {
    let chrome = state.chrome.clone();
    match state.share.find_post(id).await {
        Ok(Some(post)) => {
            let view = LayoutContext::new(
                chrome.with_title(format!("Share: {}", post.title)),
                share_context(&post, ShareFormView::default(), false),
            );
            render_template_response(ShareTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(chrome),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn submit_share(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
    Form(form): Form<EmailPostForm>,
) -> Response {
    let chrome = state.chrome.clone();
    let post = match state.share.find_post(id).await {
        Ok(Some(post)) => post,
        Ok(None) => return render_not_found_response(chrome),
        Err(err) => return HttpError::from(err).into_response(),
    };

    let (form_view, sent) = match form.validate() {
        Ok(recommendation) => {
            if let Err(err) = state.share.send_recommendation(&post, recommendation).await {
                return HttpError::from(err).into_response();
            }
            (ShareFormView::default(), true)
        }
        Err(errors) => (
            ShareFormView {
                name: form.name.clone(),
                email: form.email.clone(),
                to: form.to.clone(),
                comments: form.comments.clone(),
                errors: error_messages(&errors),
            },
            false,
        ),
    };

    let view = LayoutContext::new(
        chrome.with_title(format!("Share: {}", post.title)),
        share_context(&post, form_view, sent),
    );
    render_template_response(ShareTemplate { view }, StatusCode::OK)
}

async fn post_search(
    State(state): State<HttpState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let chrome = state.chrome.clone().with_title("Search".to_string());

    let content = match params.query {
        // No query submitted at all: fresh form, and the search engine is
        // never consulted.
        None => SearchContext::empty(),
        Some(raw) => {
            let form = SearchForm { query: raw.clone() };
            match form.validate() {
                Ok(query) => match state.search.search(&query).await {
                    Ok(results) => SearchContext {
                        form: SearchFormView {
                            query: raw,
                            errors: Vec::new(),
                        },
                        query: Some(query),
                        result_count: results.len(),
                        results,
                    },
                    Err(err) => return HttpError::from(err).into_response(),
                },
                Err(errors) => SearchContext {
                    form: SearchFormView {
                        query: raw,
                        errors: error_messages(&errors),
                    },
                    query: None,
                    results: Vec::new(),
                    result_count: 0,
                },
            }
        }
    };

    let view = LayoutContext::new(chrome, content);
    render_template_response(SearchTemplate { view }, StatusCode::OK)
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn fallback(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.chrome.clone())
}

/// Resolve the detail-route date segments and fetch the matching published
/// post. Calendar-impossible dates are indistinguishable from missing posts.
async fn lookup_post(
    state: &HttpState,
    year: i32,
    month: u8,
    day: u8,
    slug: &str,
) -> Result<Option<PostRecord>, Response> {
    let Some(date) = resolve_date(year, month, day) else {
        return Ok(None);
    };

    state
        .blog
        .find_post(date, slug)
        .await
        .map_err(|err| blog_error_to_response(err, state.chrome.clone()))
}

fn resolve_date(year: i32, month: u8, day: u8) -> Option<Date> {
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

fn share_context(post: &PostRecord, form: ShareFormView, sent: bool) -> ShareContext {
    let date = posts::publish_date(post).unwrap_or_else(|| post.created_at.date());
    ShareContext {
        post_title: post.title.clone(),
        permalink: posts::permalink(date, &post.slug),
        form,
        sent,
    }
}

fn blog_error_to_response(err: BlogError, chrome: LayoutChrome) -> Response {
    match err {
        BlogError::UnknownTag | BlogError::UnknownPage => {
            let detail = err.to_string();
            let mut response = render_not_found_response(chrome);
            ErrorReport::from_message(
                "infra::http::public::blog_error_to_response",
                StatusCode::NOT_FOUND,
                detail,
            )
            .attach(&mut response);
            response
        }
        err => HttpError::from(err).into_response(),
    }
}
