//! Read-only listings of users, comments and replies.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::application::replies::{ReplyThread, ReplyTreeSerializer};
use crate::application::repos::{CommentsRepo, RepliesRepo, RepoError, UsersRepo};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("comment `{0}` not found")]
    CommentNotFound(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserEntry {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogExcerpt {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentEntry {
    pub id: i64,
    pub content: String,
    pub blog: BlogExcerpt,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyEntry {
    pub id: i64,
    pub reply: String,
    pub comment: String,
    pub comment_user: String,
    pub blog: String,
    pub user: String,
}

/// A comment with its full reply forest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    pub comment_id: i64,
    pub blog: String,
    pub comment_author: String,
    pub comment: String,
    pub replies: ReplyThread,
}

#[derive(Clone)]
pub struct Directory {
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    replies: Arc<dyn RepliesRepo>,
    threads: ReplyTreeSerializer,
}

impl Directory {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        replies: Arc<dyn RepliesRepo>,
        threads: ReplyTreeSerializer,
    ) -> Self {
        Self {
            users,
            comments,
            replies,
            threads,
        }
    }

    pub async fn users(&self) -> Result<Vec<UserEntry>, DirectoryError> {
        let users = self.users.list_users().await?;
        Ok(users
            .into_iter()
            .map(|user| UserEntry {
                username: user.username,
                email: user.email,
            })
            .collect())
    }

    pub async fn comments(&self) -> Result<Vec<CommentEntry>, DirectoryError> {
        let listings = self.comments.list_comment_listings().await?;
        Ok(listings
            .into_iter()
            .map(|row| CommentEntry {
                id: row.id,
                content: row.content,
                blog: BlogExcerpt {
                    title: row.blog_title,
                    content: row.blog_content,
                },
                user: row.author_name,
            })
            .collect())
    }

    pub async fn replies(&self) -> Result<Vec<ReplyEntry>, DirectoryError> {
        let listings = self.replies.list_reply_listings().await?;
        Ok(listings
            .into_iter()
            .map(|row| ReplyEntry {
                id: row.id,
                reply: row.text,
                comment: row.comment_content,
                comment_user: row.comment_author,
                blog: row.blog_title,
                user: row.author_name,
            })
            .collect())
    }

    /// Every comment with its nested replies. Reply loading failures are
    /// reported per comment instead of failing the listing.
    pub async fn interactions(&self) -> Result<Vec<Interaction>, DirectoryError> {
        let listings = self.comments.list_comment_listings().await?;
        let ids: Vec<i64> = listings.iter().map(|row| row.id).collect();
        let mut threads = self.threads.serialize_many(&ids).await;

        Ok(listings
            .into_iter()
            .map(|row| Interaction {
                comment_id: row.id,
                replies: threads
                    .remove(&row.id)
                    .unwrap_or(ReplyThread::Replies(Vec::new())),
                blog: row.blog_title,
                comment_author: row.author_name,
                comment: row.content,
            })
            .collect())
    }

    pub async fn comment_thread(&self, comment_id: i64) -> Result<ReplyThread, DirectoryError> {
        if self.comments.find_comment(comment_id).await?.is_none() {
            return Err(DirectoryError::CommentNotFound(comment_id));
        }
        Ok(self.threads.serialize_replies(comment_id).await)
    }
}
