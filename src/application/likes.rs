//! Like tallies for blogs, comments and replies.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::application::repos::{LikesRepo, RepoError};
use crate::domain::entities::LikeTotal;
use crate::domain::types::{Subject, SubjectKind};

/// Aggregated likes for one subject.
///
/// Serialises as `[]` when nobody liked the subject, `[total]` otherwise, and as
/// `{"error": "..."}` when the ledger could not be read. Callers treat an empty
/// tally as zero likes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LikeAggregate {
    Totals(Vec<i64>),
    Failed { error: String },
}

impl LikeAggregate {
    pub fn empty() -> Self {
        Self::Totals(Vec::new())
    }

    pub fn failed(err: &RepoError) -> Self {
        Self::Failed {
            error: err.to_string(),
        }
    }

    fn from_rows(rows: &[LikeTotal]) -> Self {
        Self::Totals(rows.iter().map(|row| row.total).collect())
    }

    /// Total like weight, `None` when the tally failed.
    pub fn total(&self) -> Option<i64> {
        match self {
            Self::Totals(totals) => Some(totals.iter().sum()),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Totals(totals) if totals.is_empty())
    }
}

#[derive(Clone)]
pub struct LikeAggregator {
    likes: Arc<dyn LikesRepo>,
}

impl LikeAggregator {
    pub fn new(likes: Arc<dyn LikesRepo>) -> Self {
        Self { likes }
    }

    pub async fn aggregate(&self, subject: Subject) -> LikeAggregate {
        match self.likes.sum_likes(subject).await {
            Ok(rows) => LikeAggregate::from_rows(&rows),
            Err(err) => {
                warn!(
                    target = "blogwire::likes",
                    subject = %subject,
                    error = %err,
                    "like aggregation failed"
                );
                LikeAggregate::failed(&err)
            }
        }
    }

    /// Aggregate many subjects of one kind with a single ledger query.
    ///
    /// Every requested id is present in the result. A failed query marks every
    /// subject as failed.
    pub async fn aggregate_many(
        &self,
        kind: SubjectKind,
        ids: &[i64],
    ) -> HashMap<i64, LikeAggregate> {
        if ids.is_empty() {
            return HashMap::new();
        }

        match self.likes.sum_likes_many(kind, ids).await {
            Ok(rows) => {
                let mut grouped: HashMap<i64, Vec<LikeTotal>> = HashMap::new();
                for row in rows {
                    grouped.entry(row.subject_id).or_default().push(row);
                }
                ids.iter()
                    .map(|id| {
                        let aggregate = grouped
                            .get(id)
                            .map(|rows| LikeAggregate::from_rows(rows))
                            .unwrap_or_else(LikeAggregate::empty);
                        (*id, aggregate)
                    })
                    .collect()
            }
            Err(err) => {
                warn!(
                    target = "blogwire::likes",
                    kind = %kind,
                    subjects = ids.len(),
                    error = %err,
                    "batched like aggregation failed"
                );
                let failed = LikeAggregate::failed(&err);
                ids.iter().map(|id| (*id, failed.clone())).collect()
            }
        }
    }
}
