use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::catalog::CatalogError;
use crate::application::directory::DirectoryError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

const SOURCE: &str = "infra::http::api";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

/// Body of a rate-limit rejection.
#[derive(Debug, Serialize)]
pub struct RejectionBody {
    #[serde(rename = "Message")]
    pub message: String,
}

/// JSON API error: a public message for the client and a detail for the logs.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            message,
            detail: detail.into(),
        }
    }

    pub fn not_found(message: &'static str, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// 403 answer for a request turned away by a route rate limiter.
    pub fn rejected(message: String) -> Response {
        let mut response = (
            StatusCode::FORBIDDEN,
            Json(RejectionBody {
                message: message.clone(),
            }),
        )
            .into_response();
        ErrorReport::from_message("infra::http::api::rate_limit", StatusCode::FORBIDDEN, message)
            .attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        let detail = err.to_string();
        match err {
            RepoError::NotFound => Self::new(StatusCode::NOT_FOUND, "Resource not found", detail),
            RepoError::InvalidInput { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "Invalid input", detail)
            }
            RepoError::Integrity { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Stored data is inconsistent",
                detail,
            ),
            RepoError::Timeout => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Database timeout", detail)
            }
            RepoError::Persistence(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Persistence error",
                detail,
            ),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Repo(err) => Self::from(err),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::CommentNotFound(_) => {
                Self::not_found("No comment found", err.to_string())
            }
            DirectoryError::Repo(err) => Self::from(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.message.to_string(),
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(SOURCE, self.status, self.detail).attach(&mut response);
        response
    }
}
