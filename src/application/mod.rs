//! Application services layer.

pub mod catalog;
pub mod directory;
pub mod error;
pub mod likes;
pub mod replies;
pub mod repos;
