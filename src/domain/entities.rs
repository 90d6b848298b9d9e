//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::types::Subject;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub joined_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub user_id: Option<i64>,
    pub published_at: OffsetDateTime,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    pub author_name: String,
    pub blog_id: i64,
    pub created_at: OffsetDateTime,
}

/// A reply row; `parent_reply_id` links replies into a tree scoped to one comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyRecord {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub author_name: String,
    pub blog_id: i64,
    pub comment_id: i64,
    pub parent_reply_id: Option<i64>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikeRecord {
    pub id: i64,
    pub weight: i32,
    pub subject: Subject,
    pub author_id: i64,
    pub created_at: OffsetDateTime,
}

/// Summed like weight for one subject, as produced by a grouped aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeTotal {
    pub subject_id: i64,
    pub total: i64,
}

/// A comment joined with the blog and user it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentListing {
    pub id: i64,
    pub content: String,
    pub author_name: String,
    pub blog_id: i64,
    pub blog_title: String,
    pub blog_content: String,
}

/// A reply joined with its comment, the comment's author and the blog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyListing {
    pub id: i64,
    pub text: String,
    pub author_name: String,
    pub comment_content: String,
    pub comment_author: String,
    pub blog_title: String,
}
