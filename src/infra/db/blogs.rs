use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::repos::{BlogQueryFilter, BlogsRepo, RepoError};
use crate::domain::entities::BlogRecord;

use super::{PostgresRepositories, map_sqlx_error};

const BLOG_SELECT: &str = r#"
    SELECT b.id::int8 AS id,
           b.title,
           b.content,
           b.category,
           COALESCE(b.author, '') AS author,
           b.user_id::int8 AS user_id,
           b.published_date AT TIME ZONE 'UTC' AS published_at,
           COALESCE(
               array_agg(t.name::text ORDER BY t.id) FILTER (WHERE t.id IS NOT NULL),
               ARRAY[]::text[]
           ) AS tags
    FROM blog b
    LEFT JOIN tag_blog tb ON tb.blog_id = b.id
    LEFT JOIN tag t ON t.id = tb.tag_id
    WHERE TRUE
"#;

const BLOG_GROUP_ORDER: &str = " GROUP BY b.id ORDER BY b.id";

#[derive(sqlx::FromRow)]
struct BlogRow {
    id: i64,
    title: String,
    content: String,
    category: String,
    author: String,
    user_id: Option<i64>,
    published_at: Option<OffsetDateTime>,
    tags: Vec<String>,
}

impl From<BlogRow> for BlogRecord {
    fn from(row: BlogRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            category: row.category,
            author: row.author,
            user_id: row.user_id,
            published_at: row.published_at.unwrap_or(OffsetDateTime::UNIX_EPOCH),
            tags: row.tags,
        }
    }
}

impl PostgresRepositories {
    fn apply_blog_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q BlogQueryFilter) {
        if let Some(title) = filter.title.as_ref() {
            qb.push(" AND b.title = ");
            qb.push_bind(title);
        }

        if let Some(category) = filter.category.as_ref() {
            qb.push(" AND b.category = ");
            qb.push_bind(category);
        }

        if let Some(author) = filter.author.as_ref() {
            qb.push(" AND b.author = ");
            qb.push_bind(author);
        }

        if let Some(tag) = filter.tag.as_ref() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM tag_blog ftb INNER JOIN tag ft ON ft.id = ftb.tag_id WHERE ftb.blog_id = b.id AND ft.name = ",
            );
            qb.push_bind(tag);
            qb.push(")");
        }

        if let Some(day) = filter.published_on.as_ref() {
            qb.push(" AND to_char(b.published_date, 'YYYY-MM-DD') = ");
            qb.push_bind(day);
        }
    }
}

#[async_trait]
impl BlogsRepo for PostgresRepositories {
    async fn list_blogs(&self) -> Result<Vec<BlogRecord>, RepoError> {
        let sql = format!("{BLOG_SELECT}{BLOG_GROUP_ORDER}");
        let rows = sqlx::query_as::<_, BlogRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(BlogRecord::from).collect())
    }

    async fn search_blogs(&self, filter: &BlogQueryFilter) -> Result<Vec<BlogRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(BLOG_SELECT);
        Self::apply_blog_filter(&mut qb, filter);
        qb.push(BLOG_GROUP_ORDER);

        let rows = qb
            .build_query_as::<BlogRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(BlogRecord::from).collect())
    }
}
