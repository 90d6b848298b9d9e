use thiserror::Error;

use super::replies::ReplyTreeError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("like row is malformed: {message}")]
    LikeSubject { message: String },
    #[error(transparent)]
    ReplyTree(#[from] ReplyTreeError),
}

impl DomainError {
    pub fn like_subject(message: impl Into<String>) -> Self {
        Self::LikeSubject {
            message: message.into(),
        }
    }
}
