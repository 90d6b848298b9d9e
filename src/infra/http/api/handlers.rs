use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::catalog::SearchOutcome;

use super::error::ApiError;
use super::models::*;
use super::state::ApiState;

pub async fn home() -> Json<ApiGuide> {
    Json(ApiGuide::current())
}

pub async fn list_blogs(State(state): State<ApiState>) -> Result<Json<BlogsResponse>, ApiError> {
    let blogs = state.catalog.list().await?;
    Ok(Json(BlogsResponse { blogs }))
}

pub async fn search_blogs(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let Some(query) = params.resolve() else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(SearchGuide::missing_parameters()),
        )
            .into_response());
    };

    let response = match state.catalog.search(query).await? {
        SearchOutcome::Found { query, results } => {
            let message = format!(
                "These are all the results pertaining to your search query '{}'.",
                query.label()
            );
            Json(SearchResponse {
                query,
                results,
                message,
            })
            .into_response()
        }
        SearchOutcome::NoMatch { query } => Json(MessageResponse {
            message: query.no_match_message().to_string(),
        })
        .into_response(),
    };

    Ok(response)
}

pub async fn view_users(State(state): State<ApiState>) -> Result<Json<UsersResponse>, ApiError> {
    let users = state.directory.users().await?;
    Ok(Json(UsersResponse { users }))
}

pub async fn view_comments(
    State(state): State<ApiState>,
) -> Result<Json<CommentsResponse>, ApiError> {
    let comments = state.directory.comments().await?;
    Ok(Json(CommentsResponse { comments }))
}

pub async fn view_reply_listing(
    State(state): State<ApiState>,
) -> Result<Json<RepliesResponse>, ApiError> {
    let replies = state.directory.replies().await?;
    Ok(Json(RepliesResponse { replies }))
}

pub async fn view_reply_threads(
    State(state): State<ApiState>,
) -> Result<Json<InteractionsResponse>, ApiError> {
    let interactions = state.directory.interactions().await?;
    Ok(Json(InteractionsResponse { interactions }))
}

pub async fn comment_replies(
    State(state): State<ApiState>,
    Path(comment_id): Path<i64>,
) -> Result<Json<CommentThreadResponse>, ApiError> {
    let replies = state.directory.comment_thread(comment_id).await?;
    Ok(Json(CommentThreadResponse {
        comment_id,
        replies,
    }))
}
