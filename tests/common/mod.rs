#![allow(dead_code)]

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use time::OffsetDateTime;
use time::macros::datetime;
use tokio::sync::Mutex;
use tower::ServiceExt;

use blogwire::application::catalog::{BlogCatalog, format_published};
use blogwire::application::directory::Directory;
use blogwire::application::likes::LikeAggregator;
use blogwire::application::replies::ReplyTreeSerializer;
use blogwire::application::repos::{
    BlogQueryFilter, BlogsRepo, CommentsRepo, HealthCheck, LikesRepo, RepliesRepo, RepoError,
    UsersRepo,
};
use blogwire::cache::{QueryCache, QueryCacheState};
use blogwire::domain::entities::{
    BlogRecord, CommentListing, CommentRecord, LikeTotal, ReplyListing, ReplyRecord, UserRecord,
};
use blogwire::domain::types::{Subject, SubjectKind};
use blogwire::infra::http::{self, ApiState, RateLimitPolicy, RouteGuards};

pub const PUBLISHED: OffsetDateTime = datetime!(2025-06-12 09:30 UTC);

#[derive(Default)]
pub struct InMemoryStore {
    pub users: Mutex<Vec<UserRecord>>,
    pub blogs: Mutex<Vec<BlogRecord>>,
    pub comments: Mutex<Vec<CommentRecord>>,
    pub replies: Mutex<Vec<ReplyRecord>>,
    pub likes: Mutex<Vec<(Subject, i64)>>,
    pub fail_likes: AtomicBool,
    pub fail_blogs: AtomicBool,
    pub fail_health: AtomicBool,
    pub blog_queries: AtomicUsize,
}

impl InMemoryStore {
    pub fn blog_queries(&self) -> usize {
        self.blog_queries.load(Ordering::SeqCst)
    }

    fn record_blog_query(&self) -> Result<(), RepoError> {
        self.blog_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_blogs.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("blog table unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl LikesRepo for InMemoryStore {
    async fn sum_likes(&self, subject: Subject) -> Result<Vec<LikeTotal>, RepoError> {
        self.sum_likes_many(subject.kind, &[subject.id]).await
    }

    async fn sum_likes_many(
        &self,
        kind: SubjectKind,
        ids: &[i64],
    ) -> Result<Vec<LikeTotal>, RepoError> {
        if self.fail_likes.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("likes table unavailable"));
        }

        let likes = self.likes.lock().await;
        let mut totals = Vec::new();
        for id in ids {
            let weights: Vec<i64> = likes
                .iter()
                .filter(|(subject, _)| subject.kind == kind && subject.id == *id)
                .map(|(_, weight)| *weight)
                .collect();
            if !weights.is_empty() {
                totals.push(LikeTotal {
                    subject_id: *id,
                    total: weights.iter().sum(),
                });
            }
        }
        Ok(totals)
    }
}

#[async_trait]
impl RepliesRepo for InMemoryStore {
    async fn load_replies(&self, comment_id: i64) -> Result<Vec<ReplyRecord>, RepoError> {
        self.list_replies_for_comments(&[comment_id]).await
    }

    async fn list_replies_for_comments(
        &self,
        comment_ids: &[i64],
    ) -> Result<Vec<ReplyRecord>, RepoError> {
        Ok(self
            .replies
            .lock()
            .await
            .iter()
            .filter(|reply| comment_ids.contains(&reply.comment_id))
            .cloned()
            .collect())
    }

    async fn list_reply_listings(&self) -> Result<Vec<ReplyListing>, RepoError> {
        let replies = self.replies.lock().await.clone();
        let comments = self.comments.lock().await.clone();
        let blogs = self.blogs.lock().await.clone();

        let mut listings = Vec::new();
        for reply in replies {
            let Some(comment) = comments.iter().find(|c| c.id == reply.comment_id) else {
                continue;
            };
            let Some(blog) = blogs.iter().find(|b| b.id == comment.blog_id) else {
                continue;
            };
            listings.push(ReplyListing {
                id: reply.id,
                text: reply.text.clone(),
                author_name: reply.author_name.clone(),
                comment_content: comment.content.clone(),
                comment_author: comment.author_name.clone(),
                blog_title: blog.title.clone(),
            });
        }
        Ok(listings)
    }
}

#[async_trait]
impl CommentsRepo for InMemoryStore {
    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self
            .comments
            .lock()
            .await
            .iter()
            .find(|comment| comment.id == id)
            .cloned())
    }

    async fn list_comments_for_blogs(
        &self,
        blog_ids: &[i64],
    ) -> Result<Vec<CommentRecord>, RepoError> {
        Ok(self
            .comments
            .lock()
            .await
            .iter()
            .filter(|comment| blog_ids.contains(&comment.blog_id))
            .cloned()
            .collect())
    }

    async fn list_comment_listings(&self) -> Result<Vec<CommentListing>, RepoError> {
        let comments = self.comments.lock().await.clone();
        let blogs = self.blogs.lock().await.clone();

        Ok(comments
            .into_iter()
            .filter_map(|comment| {
                let blog = blogs.iter().find(|b| b.id == comment.blog_id)?;
                Some(CommentListing {
                    id: comment.id,
                    content: comment.content,
                    author_name: comment.author_name,
                    blog_id: blog.id,
                    blog_title: blog.title.clone(),
                    blog_content: blog.content.clone(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl BlogsRepo for InMemoryStore {
    async fn list_blogs(&self) -> Result<Vec<BlogRecord>, RepoError> {
        self.record_blog_query()?;
        Ok(self.blogs.lock().await.clone())
    }

    async fn search_blogs(&self, filter: &BlogQueryFilter) -> Result<Vec<BlogRecord>, RepoError> {
        self.record_blog_query()?;
        let matches = |wanted: &Option<String>, actual: &str| {
            wanted.as_deref().is_none_or(|wanted| wanted == actual)
        };

        Ok(self
            .blogs
            .lock()
            .await
            .iter()
            .filter(|blog| {
                matches(&filter.title, &blog.title)
                    && matches(&filter.category, &blog.category)
                    && matches(&filter.author, &blog.author)
                    && matches(&filter.published_on, &format_published(blog.published_at))
                    && filter
                        .tag
                        .as_ref()
                        .is_none_or(|tag| blog.tags.iter().any(|t| t == tag))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UsersRepo for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<UserRecord>, RepoError> {
        Ok(self.users.lock().await.clone())
    }
}

#[async_trait]
impl HealthCheck for InMemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.fail_health.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        Ok(())
    }
}

pub fn user(id: i64, username: &str) -> UserRecord {
    UserRecord {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        joined_at: PUBLISHED,
    }
}

pub fn blog(id: i64, title: &str, category: &str, author: &str, tags: &[&str]) -> BlogRecord {
    BlogRecord {
        id,
        title: title.to_string(),
        content: format!("{title} body"),
        category: category.to_string(),
        author: author.to_string(),
        user_id: None,
        published_at: PUBLISHED,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

pub fn comment(id: i64, blog_id: i64, content: &str, author: &str) -> CommentRecord {
    CommentRecord {
        id,
        content: content.to_string(),
        author_id: 1,
        author_name: author.to_string(),
        blog_id,
        created_at: PUBLISHED,
    }
}

pub fn reply(id: i64, comment_id: i64, parent: Option<i64>, text: &str, author: &str) -> ReplyRecord {
    ReplyRecord {
        id,
        text: text.to_string(),
        author_id: 1,
        author_name: author.to_string(),
        blog_id: 1,
        comment_id,
        parent_reply_id: parent,
        created_at: PUBLISHED,
    }
}

/// A small site: two blogs, comments on the first, a reply thread and some likes.
pub async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::default());
    store
        .users
        .lock()
        .await
        .extend([user(1, "ada"), user(2, "linus")]);
    store.blogs.lock().await.extend([
        blog(1, "Ownership", "tech", "ada", &["rust", "memory"]),
        blog(2, "Sourdough", "food", "linus", &["bread"]),
    ]);
    store.comments.lock().await.extend([
        comment(10, 1, "Great read", "linus"),
        comment(11, 1, "Borrowck explained", "ada"),
    ]);
    store.replies.lock().await.extend([
        reply(100, 10, None, "Thanks!", "ada"),
        reply(101, 10, Some(100), "You're welcome", "linus"),
        reply(102, 10, None, "Agreed", "ada"),
    ]);
    store.likes.lock().await.extend([
        (Subject::blog(1), 1),
        (Subject::blog(1), 1),
        (Subject::comment(10), 1),
        (Subject::reply(100), 1),
        (Subject::reply(100), 1),
        (Subject::reply(100), 1),
    ]);
    store
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub search_cache: Arc<QueryCache>,
}

pub fn lenient() -> RateLimitPolicy {
    RateLimitPolicy::per_minutes(1_000, 1)
}

pub fn build_app(
    store: Arc<InMemoryStore>,
    search: RateLimitPolicy,
    listings: RateLimitPolicy,
) -> TestApp {
    build_app_with_body_limit(store, search, listings, 1024 * 1024)
}

pub fn build_app_with_body_limit(
    store: Arc<InMemoryStore>,
    search: RateLimitPolicy,
    listings: RateLimitPolicy,
    body_limit: usize,
) -> TestApp {
    let likes = LikeAggregator::new(store.clone());
    let threads = ReplyTreeSerializer::new(store.clone(), likes.clone());
    let state = ApiState {
        catalog: Arc::new(BlogCatalog::new(
            store.clone(),
            store.clone(),
            store.clone(),
            likes,
        )),
        directory: Arc::new(Directory::new(
            store.clone(),
            store.clone(),
            store.clone(),
            threads,
        )),
        health: store.clone(),
    };

    let search_cache = Arc::new(QueryCache::new(NonZeroU32::new(3).expect("non-zero")));
    let guards = RouteGuards::new(
        search,
        listings,
        QueryCacheState::new(search_cache.clone(), true, body_limit),
    );

    TestApp {
        router: http::build_router(state, guards),
        store,
        search_cache,
    }
}

pub fn client(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, last_octet], 40_000))
}

/// Issue a GET as if it arrived from `from` and decode the JSON body.
pub async fn get_json(router: &Router, uri: &str, from: SocketAddr) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    request.extensions_mut().insert(ConnectInfo(from));

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}
