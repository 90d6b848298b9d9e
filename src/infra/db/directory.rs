use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CommentsRepo, RepoError, UsersRepo};
use crate::domain::entities::{CommentListing, CommentRecord, UserRecord};

use super::{PostgresRepositories, map_sqlx_error};

const COMMENT_COLUMNS: &str = r#"
    SELECT c.id::int8 AS id,
           c.content,
           c.user_id::int8 AS author_id,
           COALESCE(u.username, '') AS author_name,
           c.blog_id::int8 AS blog_id,
           c.date_commented AT TIME ZONE 'UTC' AS created_at
    FROM comment c
    LEFT JOIN "user" u ON u.id = c.user_id
"#;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    joined_at: Option<OffsetDateTime>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            joined_at: row.joined_at.unwrap_or(OffsetDateTime::UNIX_EPOCH),
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    content: String,
    author_id: Option<i64>,
    author_name: String,
    blog_id: Option<i64>,
    created_at: Option<OffsetDateTime>,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            author_id: row.author_id.unwrap_or_default(),
            author_name: row.author_name,
            blog_id: row.blog_id.unwrap_or_default(),
            created_at: row.created_at.unwrap_or(OffsetDateTime::UNIX_EPOCH),
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentListingRow {
    id: i64,
    content: String,
    author_name: String,
    blog_id: i64,
    blog_title: String,
    blog_content: String,
}

impl From<CommentListingRow> for CommentListing {
    fn from(row: CommentListingRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            author_name: row.author_name,
            blog_id: row.blog_id,
            blog_title: row.blog_title,
            blog_content: row.blog_content,
        }
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn list_users(&self) -> Result<Vec<UserRecord>, RepoError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id::int8 AS id,
                   username,
                   email,
                   date_joined AT TIME ZONE 'UTC' AS joined_at
            FROM "user"
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(UserRecord::from).collect())
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>, RepoError> {
        let sql = format!("{COMMENT_COLUMNS} WHERE c.id = $1");
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(CommentRecord::from))
    }

    async fn list_comments_for_blogs(
        &self,
        blog_ids: &[i64],
    ) -> Result<Vec<CommentRecord>, RepoError> {
        if blog_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("{COMMENT_COLUMNS} WHERE c.blog_id = ANY($1) ORDER BY c.id");
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(blog_ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn list_comment_listings(&self) -> Result<Vec<CommentListing>, RepoError> {
        let rows = sqlx::query_as::<_, CommentListingRow>(
            r#"
            SELECT c.id::int8 AS id,
                   c.content,
                   COALESCE(u.username, '') AS author_name,
                   b.id::int8 AS blog_id,
                   b.title AS blog_title,
                   b.content AS blog_content
            FROM comment c
            INNER JOIN blog b ON b.id = c.blog_id
            LEFT JOIN "user" u ON u.id = c.user_id
            ORDER BY c.id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentListing::from).collect())
    }
}
