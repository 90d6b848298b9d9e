use async_trait::async_trait;
use tracing::warn;

use crate::application::repos::{LikesRepo, RepoError};
use crate::domain::entities::LikeTotal;
use crate::domain::types::{Subject, SubjectKind};

use super::{PostgresRepositories, map_sqlx_error};

/// One grouped sum, still carrying all three subject columns so malformed
/// rows surface instead of being folded into a total.
#[derive(sqlx::FromRow)]
struct LikeSumRow {
    blog_id: Option<i64>,
    comment_id: Option<i64>,
    reply_id: Option<i64>,
    total: i64,
}

impl TryFrom<LikeSumRow> for LikeTotal {
    type Error = RepoError;

    fn try_from(row: LikeSumRow) -> Result<Self, Self::Error> {
        let subject = Subject::from_columns(row.blog_id, row.comment_id, row.reply_id)?;
        Ok(Self {
            subject_id: subject.id,
            total: row.total,
        })
    }
}

fn grouped_sum_sql(kind: SubjectKind) -> String {
    format!(
        r#"
        SELECT blog_id::int8 AS blog_id,
               comment_id::int8 AS comment_id,
               reply_id::int8 AS reply_id,
               SUM("like")::int8 AS total
        FROM "like"
        WHERE {column} = ANY($1)
        GROUP BY blog_id, comment_id, reply_id
        ORDER BY {column}
        "#,
        column = kind.like_column()
    )
}

#[async_trait]
impl LikesRepo for PostgresRepositories {
    async fn sum_likes(&self, subject: Subject) -> Result<Vec<LikeTotal>, RepoError> {
        self.sum_likes_many(subject.kind, &[subject.id]).await
    }

    async fn sum_likes_many(
        &self,
        kind: SubjectKind,
        ids: &[i64],
    ) -> Result<Vec<LikeTotal>, RepoError> {
        let sql = grouped_sum_sql(kind);
        let rows = sqlx::query_as::<_, LikeSumRow>(&sql)
            .bind(ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(totals_from_rows(kind, rows))
    }
}

/// Convert grouped rows, dropping the ones that name more than one subject so
/// the remaining subjects keep their own tallies.
fn totals_from_rows(kind: SubjectKind, rows: Vec<LikeSumRow>) -> Vec<LikeTotal> {
    rows.into_iter()
        .filter_map(|row| {
            let columns = (row.blog_id, row.comment_id, row.reply_id);
            match LikeTotal::try_from(row) {
                Ok(total) => Some(total),
                Err(err) => {
                    warn!(
                        target = "blogwire::db::likes",
                        kind = %kind,
                        blog_id = ?columns.0,
                        comment_id = ?columns.1,
                        reply_id = ?columns.2,
                        error = %err,
                        "skipping malformed like rows"
                    );
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_sum_filters_on_the_subject_column() {
        let sql = grouped_sum_sql(SubjectKind::Comment);
        assert!(sql.contains("WHERE comment_id = ANY($1)"));
    }

    #[test]
    fn rows_with_two_subjects_are_rejected() {
        let row = LikeSumRow {
            blog_id: Some(1),
            comment_id: Some(2),
            reply_id: None,
            total: 4,
        };

        let err = LikeTotal::try_from(row).expect_err("malformed row");
        assert!(matches!(err, RepoError::Integrity { .. }));
    }

    #[test]
    fn malformed_row_only_drops_its_own_total() {
        let rows = vec![
            LikeSumRow {
                blog_id: Some(1),
                comment_id: None,
                reply_id: None,
                total: 3,
            },
            LikeSumRow {
                blog_id: Some(2),
                comment_id: Some(9),
                reply_id: None,
                total: 1,
            },
        ];

        let totals = totals_from_rows(SubjectKind::Blog, rows);
        assert_eq!(
            totals,
            vec![LikeTotal {
                subject_id: 1,
                total: 3,
            }]
        );
    }
}
