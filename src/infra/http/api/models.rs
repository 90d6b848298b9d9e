use serde::{Deserialize, Serialize};

use crate::application::catalog::{BlogView, SearchQuery};
use crate::application::directory::{CommentEntry, Interaction, ReplyEntry, UserEntry};
use crate::application::replies::ReplyThread;

/// Blog search parameters: title, tag, category, author and publication day.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub t: Option<String>,
    pub c: Option<String>,
    pub a: Option<String>,
    pub p: Option<String>,
}

impl SearchParams {
    pub fn resolve(&self) -> Option<SearchQuery> {
        SearchQuery::resolve(
            self.q.as_deref(),
            self.t.as_deref(),
            self.c.as_deref(),
            self.a.as_deref(),
            self.p.as_deref(),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct BlogsResponse {
    pub blogs: Vec<BlogView>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: SearchQuery,
    pub results: Vec<BlogView>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<CommentEntry>,
}

#[derive(Debug, Serialize)]
pub struct RepliesResponse {
    pub replies: Vec<ReplyEntry>,
}

#[derive(Debug, Serialize)]
pub struct InteractionsResponse {
    pub interactions: Vec<Interaction>,
}

#[derive(Debug, Serialize)]
pub struct CommentThreadResponse {
    pub comment_id: i64,
    pub replies: ReplyThread,
}

#[derive(Debug, Serialize)]
pub struct EndpointGuide {
    pub route: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ApiGuide {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<EndpointGuide>,
}

impl ApiGuide {
    pub fn current() -> Self {
        let endpoint = |route, description| EndpointGuide { route, description };
        Self {
            message: "Welcome! The endpoints below describe how to read content from this API.",
            version: "v1",
            endpoints: vec![
                endpoint("/v1/blogs", "every blog with its comments, replies, likes and tags"),
                endpoint("/v1/search?q=<title>", "blogs with this exact title"),
                endpoint("/v1/search?t=<tag>", "blogs carrying this tag"),
                endpoint("/v1/search?c=<category>", "blogs in this category"),
                endpoint("/v1/search?a=<author>", "blogs by this author"),
                endpoint("/v1/search?p=<YYYY-MM-DD>", "blogs published on this day"),
                endpoint(
                    "/v1/search?q=<title>&c=<category>&a=<author>",
                    "blogs matching title, category and author together",
                ),
                endpoint("/v1/view-users", "registered users"),
                endpoint("/v1/view-comment", "comments with their blog"),
                endpoint("/v1/view-reply", "replies with their comment and blog"),
                endpoint("/v1/view-replies", "comments with their nested reply threads"),
                endpoint("/v1/comments/{id}/replies", "the nested reply thread of one comment"),
            ],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchParameterGuide {
    pub q: &'static str,
    pub t: &'static str,
    pub c: &'static str,
    pub a: &'static str,
    pub p: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SearchGuide {
    pub notice: &'static str,
    pub parameters: SearchParameterGuide,
    pub combined: &'static str,
}

impl SearchGuide {
    pub fn missing_parameters() -> Self {
        Self {
            notice: "Missing search parameters.",
            parameters: SearchParameterGuide {
                q: "query by exact blog title",
                t: "query by tag",
                c: "query by category",
                a: "query by author",
                p: "query by publication day formatted YYYY-MM-DD, e.g. 2025-06-12",
            },
            combined: "Supply q, c and a together for a narrower search.",
        }
    }
}
