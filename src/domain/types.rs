//! Shared domain enumerations aligned with persisted columns.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// The kinds of content that can receive likes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Blog,
    Comment,
    Reply,
}

impl SubjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SubjectKind::Blog => "blog",
            SubjectKind::Comment => "comment",
            SubjectKind::Reply => "reply",
        }
    }

    /// Column of the `likes` table that references this kind of subject.
    pub fn like_column(self) -> &'static str {
        match self {
            SubjectKind::Blog => "blog_id",
            SubjectKind::Comment => "comment_id",
            SubjectKind::Reply => "reply_id",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blog, comment or reply addressed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub id: i64,
}

impl Subject {
    pub fn blog(id: i64) -> Self {
        Self {
            kind: SubjectKind::Blog,
            id,
        }
    }

    pub fn comment(id: i64) -> Self {
        Self {
            kind: SubjectKind::Comment,
            id,
        }
    }

    pub fn reply(id: i64) -> Self {
        Self {
            kind: SubjectKind::Reply,
            id,
        }
    }

    /// Resolve the single subject referenced by the three nullable like columns.
    ///
    /// Exactly one column must be set.
    pub fn from_columns(
        blog_id: Option<i64>,
        comment_id: Option<i64>,
        reply_id: Option<i64>,
    ) -> Result<Self, DomainError> {
        match (blog_id, comment_id, reply_id) {
            (Some(id), None, None) => Ok(Self::blog(id)),
            (None, Some(id), None) => Ok(Self::comment(id)),
            (None, None, Some(id)) => Ok(Self::reply(id)),
            (None, None, None) => Err(DomainError::like_subject(
                "like does not reference any subject",
            )),
            _ => Err(DomainError::like_subject(
                "like references more than one subject",
            )),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
