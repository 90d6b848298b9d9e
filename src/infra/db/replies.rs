use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{RepliesRepo, RepoError};
use crate::domain::entities::{ReplyListing, ReplyRecord};

use super::{PostgresRepositories, map_sqlx_error};

const REPLY_COLUMNS: &str = r#"
    SELECT r.id::int8 AS id,
           r.replies AS text,
           r.user_id::int8 AS author_id,
           COALESCE(u.username, '') AS author_name,
           COALESCE(r.blog_id, c.blog_id)::int8 AS blog_id,
           r.comment_id::int8 AS comment_id,
           r.parent_reply_id::int8 AS parent_reply_id,
           COALESCE(r.replies_date, c.date_commented) AT TIME ZONE 'UTC' AS created_at
    FROM reply r
    INNER JOIN comment c ON c.id = r.comment_id
    LEFT JOIN "user" u ON u.id = r.user_id
"#;

#[derive(sqlx::FromRow)]
struct ReplyRow {
    id: i64,
    text: String,
    author_id: Option<i64>,
    author_name: String,
    blog_id: Option<i64>,
    comment_id: i64,
    parent_reply_id: Option<i64>,
    created_at: Option<OffsetDateTime>,
}

impl From<ReplyRow> for ReplyRecord {
    fn from(row: ReplyRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            author_id: row.author_id.unwrap_or_default(),
            author_name: row.author_name,
            blog_id: row.blog_id.unwrap_or_default(),
            comment_id: row.comment_id,
            parent_reply_id: row.parent_reply_id,
            created_at: row.created_at.unwrap_or(OffsetDateTime::UNIX_EPOCH),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReplyListingRow {
    id: i64,
    text: String,
    author_name: String,
    comment_content: String,
    comment_author: String,
    blog_title: String,
}

impl From<ReplyListingRow> for ReplyListing {
    fn from(row: ReplyListingRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            author_name: row.author_name,
            comment_content: row.comment_content,
            comment_author: row.comment_author,
            blog_title: row.blog_title,
        }
    }
}

#[async_trait]
impl RepliesRepo for PostgresRepositories {
    async fn load_replies(&self, comment_id: i64) -> Result<Vec<ReplyRecord>, RepoError> {
        let sql = format!("{REPLY_COLUMNS} WHERE r.comment_id = $1 ORDER BY r.id");
        let rows = sqlx::query_as::<_, ReplyRow>(&sql)
            .bind(comment_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ReplyRecord::from).collect())
    }

    async fn list_replies_for_comments(
        &self,
        comment_ids: &[i64],
    ) -> Result<Vec<ReplyRecord>, RepoError> {
        if comment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("{REPLY_COLUMNS} WHERE r.comment_id = ANY($1) ORDER BY r.id");
        let rows = sqlx::query_as::<_, ReplyRow>(&sql)
            .bind(comment_ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ReplyRecord::from).collect())
    }

    async fn list_reply_listings(&self) -> Result<Vec<ReplyListing>, RepoError> {
        let rows = sqlx::query_as::<_, ReplyListingRow>(
            r#"
            SELECT r.id::int8 AS id,
                   r.replies AS text,
                   COALESCE(ru.username, '') AS author_name,
                   c.content AS comment_content,
                   COALESCE(cu.username, '') AS comment_author,
                   b.title AS blog_title
            FROM reply r
            INNER JOIN comment c ON c.id = r.comment_id
            INNER JOIN blog b ON b.id = c.blog_id
            LEFT JOIN "user" ru ON ru.id = r.user_id
            LEFT JOIN "user" cu ON cu.id = c.user_id
            ORDER BY r.id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ReplyListing::from).collect())
    }
}
