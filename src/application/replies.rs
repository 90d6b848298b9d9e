//! Nested reply threads with like tallies at every node.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::application::likes::{LikeAggregate, LikeAggregator};
use crate::application::repos::{RepliesRepo, RepoError};
use crate::domain::entities::ReplyRecord;
use crate::domain::error::DomainError;
use crate::domain::replies::{ReplyNode, build_reply_tree};
use crate::domain::types::SubjectKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedReply {
    pub id: i64,
    pub text: String,
    pub author_name: String,
    pub likes: LikeAggregate,
    pub children: Vec<RenderedReply>,
}

/// A comment's reply forest, or the reason it could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyThread {
    Replies(Vec<RenderedReply>),
    Failed { error: String },
}

impl ReplyThread {
    pub fn replies(&self) -> Option<&[RenderedReply]> {
        match self {
            Self::Replies(replies) => Some(replies),
            Self::Failed { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct ReplyTreeSerializer {
    replies: Arc<dyn RepliesRepo>,
    likes: LikeAggregator,
}

impl ReplyTreeSerializer {
    pub fn new(replies: Arc<dyn RepliesRepo>, likes: LikeAggregator) -> Self {
        Self { replies, likes }
    }

    /// Render every top-level reply of a comment with its nested children.
    pub async fn serialize_replies(&self, comment_id: i64) -> ReplyThread {
        match self.replies.load_replies(comment_id).await {
            Ok(records) => self.render_records(comment_id, records).await,
            Err(err) => {
                warn!(
                    target = "blogwire::replies",
                    comment_id,
                    error = %err,
                    "loading replies failed"
                );
                ReplyThread::from(err)
            }
        }
    }

    /// Render reply threads for several comments with one reply query and one like query.
    pub async fn serialize_many(&self, comment_ids: &[i64]) -> HashMap<i64, ReplyThread> {
        if comment_ids.is_empty() {
            return HashMap::new();
        }

        let records = match self.replies.list_replies_for_comments(comment_ids).await {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    target = "blogwire::replies",
                    comments = comment_ids.len(),
                    error = %err,
                    "loading reply threads failed"
                );
                let failed = ReplyThread::from(err);
                return comment_ids.iter().map(|id| (*id, failed.clone())).collect();
            }
        };

        let mut grouped: HashMap<i64, Vec<_>> = HashMap::new();
        for record in records {
            grouped.entry(record.comment_id).or_default().push(record);
        }

        let mut forests = Vec::with_capacity(comment_ids.len());
        let mut reply_ids = Vec::new();
        for comment_id in comment_ids {
            let rows = grouped.remove(comment_id).unwrap_or_default();
            let forest = build_reply_tree(rows).map_err(DomainError::from);
            if let Ok(nodes) = &forest {
                ReplyNode::collect_ids(nodes, &mut reply_ids);
            }
            forests.push((*comment_id, forest));
        }

        let tallies = self.likes.aggregate_many(SubjectKind::Reply, &reply_ids).await;

        forests
            .into_iter()
            .map(|(comment_id, forest)| {
                let thread = match forest {
                    Ok(nodes) => ReplyThread::Replies(render_forest(nodes, &tallies)),
                    Err(err) => thread_error(comment_id, &err),
                };
                (comment_id, thread)
            })
            .collect()
    }

    async fn render_records(
        &self,
        comment_id: i64,
        records: Vec<ReplyRecord>,
    ) -> ReplyThread {
        let nodes = match build_reply_tree(records) {
            Ok(nodes) => nodes,
            Err(err) => return thread_error(comment_id, &DomainError::from(err)),
        };

        let mut ids = Vec::new();
        ReplyNode::collect_ids(&nodes, &mut ids);
        let tallies = self.likes.aggregate_many(SubjectKind::Reply, &ids).await;

        ReplyThread::Replies(render_forest(nodes, &tallies))
    }
}

fn thread_error(comment_id: i64, err: &DomainError) -> ReplyThread {
    warn!(
        target = "blogwire::replies",
        comment_id,
        error = %err,
        "reply thread is malformed"
    );
    ReplyThread::Failed {
        error: err.to_string(),
    }
}

fn render_forest(
    nodes: Vec<ReplyNode>,
    tallies: &HashMap<i64, LikeAggregate>,
) -> Vec<RenderedReply> {
    nodes
        .into_iter()
        .map(|node| RenderedReply {
            id: node.id,
            likes: tallies
                .get(&node.id)
                .cloned()
                .unwrap_or_else(LikeAggregate::empty),
            text: node.text,
            author_name: node.author_name,
            children: render_forest(node.children, tallies),
        })
        .collect()
}

impl From<RepoError> for ReplyThread {
    fn from(err: RepoError) -> Self {
        Self::Failed {
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use serde_json::json;
    use time::OffsetDateTime;

    use crate::application::repos::LikesRepo;
    use crate::domain::entities::{LikeTotal, ReplyListing};
    use crate::domain::types::Subject;

    struct StaticReplies {
        rows: Vec<ReplyRecord>,
        fail: bool,
    }

    #[async_trait]
    impl RepliesRepo for StaticReplies {
        async fn load_replies(&self, comment_id: i64) -> Result<Vec<ReplyRecord>, RepoError> {
            self.list_replies_for_comments(&[comment_id]).await
        }

        async fn list_replies_for_comments(
            &self,
            comment_ids: &[i64],
        ) -> Result<Vec<ReplyRecord>, RepoError> {
            if self.fail {
                return Err(RepoError::Timeout);
            }
            Ok(self
                .rows
                .iter()
                .filter(|row| comment_ids.contains(&row.comment_id))
                .cloned()
                .collect())
        }

        async fn list_reply_listings(&self) -> Result<Vec<ReplyListing>, RepoError> {
            Ok(Vec::new())
        }
    }

    struct OneLikeEach;

    #[async_trait]
    impl LikesRepo for OneLikeEach {
        async fn sum_likes(&self, subject: Subject) -> Result<Vec<LikeTotal>, RepoError> {
            self.sum_likes_many(subject.kind, &[subject.id]).await
        }

        async fn sum_likes_many(
            &self,
            _kind: SubjectKind,
            ids: &[i64],
        ) -> Result<Vec<LikeTotal>, RepoError> {
            Ok(ids
                .iter()
                .map(|id| LikeTotal {
                    subject_id: *id,
                    total: 1,
                })
                .collect())
        }
    }

    fn reply(id: i64, comment_id: i64, parent: Option<i64>) -> ReplyRecord {
        ReplyRecord {
            id,
            text: format!("reply {id}"),
            author_id: 1,
            author_name: "ada".to_string(),
            blog_id: 1,
            comment_id,
            parent_reply_id: parent,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn serializer(rows: Vec<ReplyRecord>, fail: bool) -> ReplyTreeSerializer {
        ReplyTreeSerializer::new(
            Arc::new(StaticReplies { rows, fail }),
            LikeAggregator::new(Arc::new(OneLikeEach)),
        )
    }

    #[tokio::test]
    async fn every_node_carries_its_likes() {
        let threads = serializer(vec![reply(1, 7, None), reply(2, 7, Some(1))], false);

        let thread = threads.serialize_replies(7).await;
        let replies = thread.replies().expect("replies");
        assert_eq!(replies[0].likes, LikeAggregate::Totals(vec![1]));
        assert_eq!(replies[0].children[0].likes, LikeAggregate::Totals(vec![1]));
    }

    #[tokio::test]
    async fn load_failure_becomes_error_payload() {
        let threads = serializer(Vec::new(), true);

        let thread = threads.serialize_replies(7).await;
        assert_eq!(
            serde_json::to_value(&thread).expect("json"),
            json!({ "error": "database timeout" })
        );
    }

    #[tokio::test]
    async fn batch_keeps_threads_apart() {
        let threads = serializer(
            vec![reply(1, 7, None), reply(2, 8, None), reply(3, 8, Some(99))],
            false,
        );

        let mut batch = threads.serialize_many(&[7, 8, 9]).await;
        let seven = batch.remove(&7).expect("thread 7");
        assert_eq!(seven.replies().map(<[RenderedReply]>::len), Some(1));
        assert!(matches!(batch.remove(&8), Some(ReplyThread::Failed { .. })));
        assert_eq!(batch.remove(&9), Some(ReplyThread::Replies(Vec::new())));
    }
}
