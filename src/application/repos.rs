//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    BlogRecord, CommentListing, CommentRecord, LikeTotal, ReplyListing, ReplyRecord, UserRecord,
};
use crate::domain::error::DomainError;
use crate::domain::types::{Subject, SubjectKind};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<DomainError> for RepoError {
    fn from(err: DomainError) -> Self {
        Self::Integrity {
            message: err.to_string(),
        }
    }
}

/// Blog search filter; every populated field must match exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogQueryFilter {
    pub title: Option<String>,
    pub tag: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    /// Publication day formatted `YYYY-MM-DD`.
    pub published_on: Option<String>,
}

#[async_trait]
pub trait LikesRepo: Send + Sync {
    /// Grouped sum of like weights for one subject. No rows means no likes.
    async fn sum_likes(&self, subject: Subject) -> Result<Vec<LikeTotal>, RepoError>;

    /// Grouped sums for several subjects of one kind; subjects without likes are absent.
    async fn sum_likes_many(
        &self,
        kind: SubjectKind,
        ids: &[i64],
    ) -> Result<Vec<LikeTotal>, RepoError>;
}

#[async_trait]
pub trait RepliesRepo: Send + Sync {
    /// Every reply of a comment, in stored order.
    async fn load_replies(&self, comment_id: i64) -> Result<Vec<ReplyRecord>, RepoError>;

    async fn list_replies_for_comments(
        &self,
        comment_ids: &[i64],
    ) -> Result<Vec<ReplyRecord>, RepoError>;

    async fn list_reply_listings(&self) -> Result<Vec<ReplyListing>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>, RepoError>;

    async fn list_comments_for_blogs(
        &self,
        blog_ids: &[i64],
    ) -> Result<Vec<CommentRecord>, RepoError>;

    async fn list_comment_listings(&self) -> Result<Vec<CommentListing>, RepoError>;
}

#[async_trait]
pub trait BlogsRepo: Send + Sync {
    async fn list_blogs(&self) -> Result<Vec<BlogRecord>, RepoError>;

    async fn search_blogs(&self, filter: &BlogQueryFilter) -> Result<Vec<BlogRecord>, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserRecord>, RepoError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
