use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use time::{Date, OffsetDateTime, macros::datetime};
use tokio::sync::Mutex;
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

use quaderno::application::blog::{BlogService, ListingSettings};
use quaderno::application::mail::{MailError, Mailer, OutgoingEmail};
use quaderno::application::pagination::{Page, PageRequest};
use quaderno::application::repos::{
    CommentsRepo, NewComment, PostsRepo, RepoError, TagWithCount, TagsRepo,
};
use quaderno::application::search::SearchService;
use quaderno::application::share::ShareService;
use quaderno::domain::entities::{CommentRecord, PostRecord, TagRecord};
use quaderno::domain::types::PostStatus;
use quaderno::infra::db::PostgresRepositories;
use quaderno::infra::http::{HttpState, build_router};
use quaderno::presentation::views::{BrandView, FooterView, LayoutChrome, PageMetaView};

#[derive(Default)]
struct FakeStore {
    posts: Vec<PostRecord>,
    tags: Vec<TagRecord>,
    post_tags: Vec<(Uuid, Uuid)>,
    comments: Mutex<Vec<CommentRecord>>,
    search_calls: AtomicUsize,
}

impl FakeStore {
    fn public_posts(&self) -> Vec<&PostRecord> {
        let mut posts: Vec<&PostRecord> = self
            .posts
            .iter()
            .filter(|post| post.is_public())
            .collect();
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then(b.id.cmp(&a.id))
        });
        posts
    }

    fn post_has_tag_slug(&self, post_id: Uuid, slug: &str) -> bool {
        self.post_tags.iter().any(|(pid, tid)| {
            *pid == post_id
                && self
                    .tags
                    .iter()
                    .any(|tag| tag.id == *tid && tag.slug == slug)
        })
    }

    fn tag_ids_for(&self, post_id: Uuid) -> Vec<Uuid> {
        self.post_tags
            .iter()
            .filter(|(pid, _)| *pid == post_id)
            .map(|(_, tid)| *tid)
            .collect()
    }
}

#[async_trait]
impl PostsRepo for FakeStore {
    async fn list_published(
        &self,
        tag: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<PostRecord>, RepoError> {
        let filtered: Vec<PostRecord> = self
            .public_posts()
            .into_iter()
            .filter(|post| tag.is_none_or(|slug| self.post_has_tag_slug(post.id, slug)))
            .cloned()
            .collect();

        let total = filtered.len() as u64;
        let start = usize::try_from(page.offset()).expect("offset fits usize");
        let items = filtered
            .into_iter()
            .skip(start)
            .take(page.size() as usize)
            .collect();

        Ok(Page::new(items, page, total))
    }

    async fn find_published_by_date_slug(
        &self,
        date: Date,
        slug: &str,
    ) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .posts
            .iter()
            .find(|post| {
                post.is_public()
                    && post.slug == slug
                    && post.published_at.map(|stamp| stamp.date()) == Some(date)
            })
            .cloned())
    }

    async fn find_published_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .posts
            .iter()
            .find(|post| post.is_public() && post.id == id)
            .cloned())
    }

    async fn list_similar(&self, post_id: Uuid, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        let own_tags = self.tag_ids_for(post_id);

        let mut scored: Vec<(usize, &PostRecord)> = self
            .public_posts()
            .into_iter()
            .filter(|post| post.id != post_id)
            .filter_map(|post| {
                let shared = self
                    .tag_ids_for(post.id)
                    .iter()
                    .filter(|tid| own_tags.contains(tid))
                    .count();
                (shared > 0).then_some((shared, post))
            })
            .collect();

        scored.sort_by(|(a_shared, a), (b_shared, b)| {
            b_shared
                .cmp(a_shared)
                .then(b.published_at.cmp(&a.published_at))
        });

        Ok(scored
            .into_iter()
            .take(limit as usize)
            .map(|(_, post)| post.clone())
            .collect())
    }

    async fn search_published(&self, query: &str) -> Result<Vec<PostRecord>, RepoError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let needle = query.to_lowercase();

        Ok(self
            .public_posts()
            .into_iter()
            .filter(|post| {
                post.title.to_lowercase().contains(&needle)
                    || post.body.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TagsRepo for FakeStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError> {
        Ok(self.tags.iter().find(|tag| tag.slug == slug).cloned())
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, RepoError> {
        let ids = self.tag_ids_for(post_id);
        Ok(self
            .tags
            .iter()
            .filter(|tag| ids.contains(&tag.id))
            .cloned()
            .collect())
    }

    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>, RepoError> {
        Ok(self
            .tags
            .iter()
            .map(|tag| TagWithCount {
                slug: tag.slug.clone(),
                name: tag.name.clone(),
                count: self
                    .post_tags
                    .iter()
                    .filter(|(pid, tid)| {
                        *tid == tag.id
                            && self
                                .posts
                                .iter()
                                .any(|post| post.id == *pid && post.is_public())
                    })
                    .count() as u64,
            })
            .collect())
    }
}

#[async_trait]
impl CommentsRepo for FakeStore {
    async fn list_active_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let mut comments: Vec<CommentRecord> = self
            .comments
            .lock()
            .await
            .iter()
            .filter(|comment| comment.post_id == post_id && comment.active)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn insert(&self, comment: NewComment) -> Result<CommentRecord, RepoError> {
        let record = CommentRecord {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            name: comment.name,
            email: comment.email,
            body: comment.body,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        self.comments.lock().await.push(record.clone());
        Ok(record)
    }
}

#[derive(Default)]
struct FakeMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        self.sent.lock().await.push(email);
        Ok(())
    }
}

fn chrome() -> LayoutChrome {
    LayoutChrome {
        brand: BrandView {
            title: "Quaderno".to_string(),
            href: "/".to_string(),
        },
        footer: FooterView {
            copy: "Powered by Quaderno.".to_string(),
        },
        meta: PageMetaView {
            title: "Quaderno".to_string(),
            description: "Test blog".to_string(),
        },
    }
}

fn build_app(store: Arc<FakeStore>, mailer: Arc<FakeMailer>) -> Router {
    let posts: Arc<dyn PostsRepo> = store.clone();
    let tags: Arc<dyn TagsRepo> = store.clone();
    let comments: Arc<dyn CommentsRepo> = store.clone();
    let mailer: Arc<dyn Mailer> = mailer;

    // Lazy pool: never connected because these tests avoid /_health/db.
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://postgres@127.0.0.1/quaderno_test")
        .expect("lazy pool");

    let state = HttpState {
        blog: Arc::new(BlogService::new(
            posts.clone(),
            tags,
            comments,
            ListingSettings {
                page_size: 3,
                similar_posts: 4,
            },
        )),
        share: Arc::new(ShareService::new(
            posts.clone(),
            mailer,
            Url::parse("https://blog.example.net/").expect("valid url"),
        )),
        search: Arc::new(SearchService::new(posts)),
        db: Arc::new(PostgresRepositories::new(pool)),
        chrome: chrome(),
    };

    build_router(state)
}

fn published_post(day: u8, slug: &str, title: &str, body: &str) -> PostRecord {
    let published = datetime!(2025-01-01 12:00 UTC).replace_day(day).expect("valid day");
    PostRecord {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        status: PostStatus::Published,
        published_at: Some(published),
        created_at: published,
        updated_at: published,
    }
}

fn draft_post(slug: &str, title: &str) -> PostRecord {
    let created = datetime!(2025-01-10 09:00 UTC);
    PostRecord {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: title.to_string(),
        body: "Unfinished thoughts.".to_string(),
        status: PostStatus::Draft,
        published_at: None,
        created_at: created,
        updated_at: created,
    }
}

fn tag(slug: &str, name: &str) -> TagRecord {
    let created = datetime!(2024-12-01 00:00 UTC);
    TagRecord {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        name: name.to_string(),
        created_at: created,
        updated_at: created,
    }
}

fn comment(post_id: Uuid, name: &str, body: &str, active: bool) -> CommentRecord {
    CommentRecord {
        id: Uuid::new_v4(),
        post_id,
        name: name.to_string(),
        email: format!("{}@example.net", name.to_lowercase()),
        body: body.to_string(),
        active,
        created_at: datetime!(2025-01-05 10:00 UTC),
    }
}

fn five_published() -> Vec<PostRecord> {
    (1..=5)
        .map(|day| {
            published_post(
                day,
                &format!("post-{day}"),
                &format!("Post number {day}"),
                "A body about quiet mornings.",
            )
        })
        .collect()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}

async fn post_form(app: &Router, uri: &str, form: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .expect("valid request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}

#[tokio::test]
async fn first_page_lists_newest_three_with_page_indicator() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let app = build_app(store, Arc::new(FakeMailer::default()));

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);

    let pos5 = body.find("Post number 5").expect("newest post shown");
    let pos4 = body.find("Post number 4").expect("second post shown");
    let pos3 = body.find("Post number 3").expect("third post shown");
    assert!(pos5 < pos4 && pos4 < pos3, "posts are newest-first");

    assert!(!body.contains("Post number 2"));
    assert!(body.contains("Page 1 of 2"));
    assert!(body.contains("?page=2"));
}

#[tokio::test]
async fn second_page_lists_the_remainder() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let app = build_app(store, Arc::new(FakeMailer::default()));

    let (status, body) = get(&app, "/?page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Post number 2"));
    assert!(body.contains("Post number 1"));
    assert!(!body.contains("Post number 3"));
    assert!(body.contains("Page 2 of 2"));
}

#[tokio::test]
async fn page_beyond_the_end_is_not_found() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let app = build_app(store, Arc::new(FakeMailer::default()));

    let (status, _) = get(&app, "/?page=3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn drafts_never_appear_in_listings() {
    let mut posts = five_published();
    posts.push(draft_post("unfinished", "A secret draft"));
    let store = Arc::new(FakeStore {
        posts,
        ..Default::default()
    });
    let app = build_app(store, Arc::new(FakeMailer::default()));

    let (_, first) = get(&app, "/").await;
    let (_, second) = get(&app, "/?page=2").await;
    assert!(!first.contains("A secret draft"));
    assert!(!second.contains("A secret draft"));
}

#[tokio::test]
async fn tag_filter_restricts_the_listing() {
    let mut store = FakeStore {
        posts: five_published(),
        tags: vec![tag("rust", "Rust")],
        ..Default::default()
    };
    let tag_id = store.tags[0].id;
    store.post_tags.push((store.posts[0].id, tag_id));
    store.post_tags.push((store.posts[2].id, tag_id));
    let app = build_app(Arc::new(store), Arc::new(FakeMailer::default()));

    let (status, body) = get(&app, "/tags/rust").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Post number 1"));
    assert!(body.contains("Post number 3"));
    assert!(!body.contains("Post number 2"));
    assert!(body.contains("Posts tagged"));
}

#[tokio::test]
async fn unknown_tag_is_not_found() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let app = build_app(store, Arc::new(FakeMailer::default()));

    let (status, _) = get(&app, "/tags/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn detail_shows_only_active_comments() {
    let posts = five_published();
    let post_id = posts[2].id;
    let store = FakeStore {
        posts,
        comments: Mutex::new(vec![
            comment(post_id, "Ada", "A fine read.", true),
            comment(post_id, "Troll", "Hidden words.", false),
        ]),
        ..Default::default()
    };
    let app = build_app(Arc::new(store), Arc::new(FakeMailer::default()));

    let (status, body) = get(&app, "/2025/01/03/post-3").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("A fine read."));
    assert!(!body.contains("Hidden words."));
    assert!(body.contains("1 comment"));
}

#[tokio::test]
async fn detail_with_wrong_date_is_not_found() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let app = build_app(store, Arc::new(FakeMailer::default()));

    let (status, _) = get(&app, "/2025/01/04/post-3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/2025/02/30/post-3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn valid_comment_creates_exactly_one_active_record() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let app = build_app(store.clone(), Arc::new(FakeMailer::default()));

    let (status, body) = post_form(
        &app,
        "/2025/01/03/post-3",
        "name=Ada&email=ada%40example.net&body=Lovely+piece.",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Your comment has been added"));
    assert!(body.contains("Lovely piece."));

    let comments = store.comments.lock().await;
    assert_eq!(comments.len(), 1);
    assert!(comments[0].active);
    assert_eq!(comments[0].name, "Ada");
}

#[tokio::test]
async fn invalid_comment_creates_nothing() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let app = build_app(store.clone(), Arc::new(FakeMailer::default()));

    let (status, body) = post_form(
        &app,
        "/2025/01/03/post-3",
        "name=Ada&email=not-an-address&body=",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("must be a valid email address"));
    assert!(body.contains("is required"));
    assert!(store.comments.lock().await.is_empty());
}

#[tokio::test]
async fn similar_posts_share_a_tag_and_exclude_self() {
    let mut store = FakeStore {
        posts: five_published(),
        tags: vec![tag("rust", "Rust"), tag("journal", "Journal")],
        ..Default::default()
    };
    let rust = store.tags[0].id;
    let journal = store.tags[1].id;
    // post-3 is the subject; post-1 shares a tag, post-5 does not.
    store.post_tags.push((store.posts[2].id, rust));
    store.post_tags.push((store.posts[0].id, rust));
    store.post_tags.push((store.posts[4].id, journal));
    let app = build_app(Arc::new(store), Arc::new(FakeMailer::default()));

    let (_, body) = get(&app, "/2025/01/03/post-3").await;
    assert!(body.contains("Similar posts"));

    let section = body.split("Similar posts").nth(1).expect("similar section");
    let section = section.split("comment").next().expect("section prefix");
    assert!(section.contains("Post number 1"));
    assert!(!section.contains("Post number 5"));
}

#[tokio::test]
async fn valid_share_sends_exactly_one_email() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let mailer = Arc::new(FakeMailer::default());
    let app = build_app(store.clone(), mailer.clone());
    let id = store.posts[1].id;

    let (status, body) = post_form(
        &app,
        &format!("/posts/{id}/share"),
        "name=Ada&email=ada%40example.net&to=friend%40example.net&comments=Read+this",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("successfully sent"));

    let sent = mailer.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "friend@example.net");
    assert_eq!(sent[0].subject, "Ada recommends you read Post number 2");
    assert!(
        sent[0]
            .body
            .contains("https://blog.example.net/2025/01/02/post-2")
    );
}

#[tokio::test]
async fn invalid_share_sends_nothing() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let mailer = Arc::new(FakeMailer::default());
    let app = build_app(store.clone(), mailer.clone());
    let id = store.posts[1].id;

    let (status, body) = post_form(
        &app,
        &format!("/posts/{id}/share"),
        "name=Ada&email=bad&to=friend%40example.net",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("successfully sent"));
    assert!(body.contains("must be a valid email address"));
    assert!(mailer.sent.lock().await.is_empty());
}

#[tokio::test]
async fn sharing_an_unknown_post_is_not_found() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let app = build_app(store, Arc::new(FakeMailer::default()));

    let (status, _) = get(&app, &format!("/posts/{}/share", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_without_a_query_never_reaches_the_engine() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let app = build_app(store.clone(), Arc::new(FakeMailer::default()));

    let (status, body) = get(&app, "/search").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Search posts"));
    assert!(!body.contains("Results for"));
    assert_eq!(store.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_search_query_rerenders_with_an_error() {
    let store = Arc::new(FakeStore {
        posts: five_published(),
        ..Default::default()
    });
    let app = build_app(store.clone(), Arc::new(FakeMailer::default()));

    let (status, body) = get(&app, "/search?query=++").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("is required"));
    assert_eq!(store.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn search_matches_published_posts_only() {
    let mut posts = five_published();
    posts.push(draft_post("drafted", "Quiet drafts"));
    posts[0].title = "Quiet mornings".to_string();
    let store = Arc::new(FakeStore {
        posts,
        ..Default::default()
    });
    let app = build_app(store.clone(), Arc::new(FakeMailer::default()));

    let (status, body) = get(&app, "/search?query=quiet").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Results for"));
    assert!(body.contains("Quiet mornings"));
    assert!(!body.contains("Quiet drafts"));
    assert_eq!(store.search_calls.load(Ordering::SeqCst), 1);
}
