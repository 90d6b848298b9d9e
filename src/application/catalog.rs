//! Blog listing and search with nested interactions.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::application::likes::{LikeAggregate, LikeAggregator};
use crate::application::repos::{
    BlogQueryFilter, BlogsRepo, CommentsRepo, RepliesRepo, RepoError,
};
use crate::domain::entities::{BlogRecord, CommentRecord, ReplyRecord};
use crate::domain::types::SubjectKind;

const PUBLISHED_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub likes: LikeAggregate,
    pub author: String,
    pub interactions: Vec<CommentView>,
    pub published: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub comment: String,
    pub author_name: String,
    pub likes: LikeAggregate,
    pub replies: Vec<FlatReplyView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatReplyView {
    pub id: i64,
    pub text: String,
    pub author_name: String,
    pub likes: LikeAggregate,
}

/// A blog search, resolved from the request parameters by precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum SearchQuery {
    Combined {
        title: String,
        category: String,
        author: String,
    },
    Title {
        value: String,
    },
    Tag {
        value: String,
    },
    Category {
        value: String,
    },
    Author {
        value: String,
    },
    Published {
        value: String,
    },
}

impl SearchQuery {
    /// Title, category and author together narrow the search; otherwise the first
    /// of title, tag, category, author, published date wins. Blank values count
    /// as absent.
    pub fn resolve(
        title: Option<&str>,
        tag: Option<&str>,
        category: Option<&str>,
        author: Option<&str>,
        published: Option<&str>,
    ) -> Option<Self> {
        let present = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);
        let (title, tag, category, author, published) = (
            present(title),
            present(tag),
            present(category),
            present(author),
            present(published),
        );

        match (title, tag, category, author, published) {
            (Some(title), _, Some(category), Some(author), _) => Some(Self::Combined {
                title,
                category,
                author,
            }),
            (Some(value), ..) => Some(Self::Title { value }),
            (None, Some(value), ..) => Some(Self::Tag { value }),
            (None, None, Some(value), ..) => Some(Self::Category { value }),
            (None, None, None, Some(value), _) => Some(Self::Author { value }),
            (None, None, None, None, Some(value)) => Some(Self::Published { value }),
            (None, None, None, None, None) => None,
        }
    }

    pub fn filter(&self) -> BlogQueryFilter {
        let mut filter = BlogQueryFilter::default();
        match self {
            Self::Combined {
                title,
                category,
                author,
            } => {
                filter.title = Some(title.clone());
                filter.category = Some(category.clone());
                filter.author = Some(author.clone());
            }
            Self::Title { value } => filter.title = Some(value.clone()),
            Self::Tag { value } => filter.tag = Some(value.clone()),
            Self::Category { value } => filter.category = Some(value.clone()),
            Self::Author { value } => filter.author = Some(value.clone()),
            Self::Published { value } => filter.published_on = Some(value.clone()),
        }
        filter
    }

    pub fn label(&self) -> String {
        match self {
            Self::Combined {
                title,
                category,
                author,
            } => format!("{title} || {category} || {author}"),
            Self::Title { value }
            | Self::Tag { value }
            | Self::Category { value }
            | Self::Author { value }
            | Self::Published { value } => value.clone(),
        }
    }

    pub fn no_match_message(&self) -> &'static str {
        match self {
            Self::Combined { .. } => "No content matches that title, category and author",
            Self::Title { .. } => "No content with such title",
            Self::Tag { .. } => "No content with such tag",
            Self::Category { .. } => "No content with such category",
            Self::Author { .. } => "No content by such author",
            Self::Published { .. } => "No content with such date",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found {
        query: SearchQuery,
        results: Vec<BlogView>,
    },
    NoMatch {
        query: SearchQuery,
    },
}

#[derive(Clone)]
pub struct BlogCatalog {
    blogs: Arc<dyn BlogsRepo>,
    comments: Arc<dyn CommentsRepo>,
    replies: Arc<dyn RepliesRepo>,
    likes: LikeAggregator,
}

impl BlogCatalog {
    pub fn new(
        blogs: Arc<dyn BlogsRepo>,
        comments: Arc<dyn CommentsRepo>,
        replies: Arc<dyn RepliesRepo>,
        likes: LikeAggregator,
    ) -> Self {
        Self {
            blogs,
            comments,
            replies,
            likes,
        }
    }

    pub async fn list(&self) -> Result<Vec<BlogView>, CatalogError> {
        let blogs = self.blogs.list_blogs().await?;
        self.assemble(blogs).await
    }

    pub async fn search(&self, query: SearchQuery) -> Result<SearchOutcome, CatalogError> {
        let blogs = self.blogs.search_blogs(&query.filter()).await?;
        if blogs.is_empty() {
            return Ok(SearchOutcome::NoMatch { query });
        }

        let results = self.assemble(blogs).await?;
        Ok(SearchOutcome::Found { query, results })
    }

    async fn assemble(&self, blogs: Vec<BlogRecord>) -> Result<Vec<BlogView>, CatalogError> {
        let blog_ids: Vec<i64> = blogs.iter().map(|blog| blog.id).collect();
        let comments = self.comments.list_comments_for_blogs(&blog_ids).await?;
        let comment_ids: Vec<i64> = comments.iter().map(|comment| comment.id).collect();
        let replies = self.replies.list_replies_for_comments(&comment_ids).await?;
        let reply_ids: Vec<i64> = replies.iter().map(|reply| reply.id).collect();

        let blog_likes = self.likes.aggregate_many(SubjectKind::Blog, &blog_ids).await;
        let comment_likes = self
            .likes
            .aggregate_many(SubjectKind::Comment, &comment_ids)
            .await;
        let reply_likes = self.likes.aggregate_many(SubjectKind::Reply, &reply_ids).await;

        let mut replies_by_comment: HashMap<i64, Vec<ReplyRecord>> = HashMap::new();
        for reply in replies {
            replies_by_comment
                .entry(reply.comment_id)
                .or_default()
                .push(reply);
        }

        let mut comments_by_blog: HashMap<i64, Vec<CommentView>> = HashMap::new();
        for comment in comments {
            let replies = replies_by_comment.remove(&comment.id).unwrap_or_default();
            let blog_id = comment.blog_id;
            let view = comment_view(comment, replies, &comment_likes, &reply_likes);
            comments_by_blog.entry(blog_id).or_default().push(view);
        }

        Ok(blogs
            .into_iter()
            .map(|blog| {
                let interactions = comments_by_blog.remove(&blog.id).unwrap_or_default();
                BlogView {
                    id: blog.id,
                    likes: tally(&blog_likes, blog.id),
                    title: blog.title,
                    content: blog.content,
                    category: blog.category,
                    author: blog.author,
                    interactions,
                    published: format_published(blog.published_at),
                    tags: blog.tags,
                }
            })
            .collect())
    }
}

fn comment_view(
    comment: CommentRecord,
    replies: Vec<ReplyRecord>,
    comment_likes: &HashMap<i64, LikeAggregate>,
    reply_likes: &HashMap<i64, LikeAggregate>,
) -> CommentView {
    CommentView {
        id: comment.id,
        likes: tally(comment_likes, comment.id),
        comment: comment.content,
        author_name: comment.author_name,
        replies: replies
            .into_iter()
            .map(|reply| FlatReplyView {
                id: reply.id,
                likes: tally(reply_likes, reply.id),
                text: reply.text,
                author_name: reply.author_name,
            })
            .collect(),
    }
}

fn tally(tallies: &HashMap<i64, LikeAggregate>, id: i64) -> LikeAggregate {
    tallies.get(&id).cloned().unwrap_or_else(LikeAggregate::empty)
}

/// Publication day as `YYYY-MM-DD`, the format the `p` search parameter matches.
pub fn format_published(at: OffsetDateTime) -> String {
    at.format(PUBLISHED_DATE_FORMAT)
        .unwrap_or_else(|_| at.date().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_category_author_combine() {
        let query = SearchQuery::resolve(Some("Rust"), None, Some("tech"), Some("ada"), None)
            .expect("query");
        assert_eq!(
            query,
            SearchQuery::Combined {
                title: "Rust".to_string(),
                category: "tech".to_string(),
                author: "ada".to_string(),
            }
        );
        assert_eq!(query.label(), "Rust || tech || ada");
    }

    #[test]
    fn title_wins_without_full_combination() {
        let query =
            SearchQuery::resolve(Some("Rust"), Some("lang"), Some("tech"), None, None).expect("q");
        assert_eq!(
            query,
            SearchQuery::Title {
                value: "Rust".to_string()
            }
        );
    }

    #[test]
    fn precedence_runs_tag_category_author_date() {
        let tag = SearchQuery::resolve(None, Some("lang"), Some("tech"), Some("ada"), None);
        assert!(matches!(tag, Some(SearchQuery::Tag { .. })));

        let category = SearchQuery::resolve(None, None, Some("tech"), Some("ada"), Some("x"));
        assert!(matches!(category, Some(SearchQuery::Category { .. })));

        let author = SearchQuery::resolve(None, None, None, Some("ada"), Some("2025-06-12"));
        assert!(matches!(author, Some(SearchQuery::Author { .. })));

        let date = SearchQuery::resolve(None, None, None, None, Some("2025-06-12"));
        assert_eq!(
            date.expect("date").filter().published_on.as_deref(),
            Some("2025-06-12")
        );
    }

    #[test]
    fn blank_parameters_count_as_missing() {
        assert_eq!(SearchQuery::resolve(Some(""), None, Some(""), None, None), None);
    }

    #[test]
    fn published_dates_use_iso_days() {
        let at = time::macros::datetime!(2025-06-12 18:30 UTC);
        assert_eq!(format_published(at), "2025-06-12");
    }
}
