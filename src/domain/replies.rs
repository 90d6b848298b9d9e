use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::domain::entities::ReplyRecord;

pub const MAX_REPLY_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct ReplyNode {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub author_name: String,
    pub children: Vec<ReplyNode>,
}

impl ReplyNode {
    /// Ids of every node in the forest, depth first.
    pub fn collect_ids(nodes: &[ReplyNode], out: &mut Vec<i64>) {
        for node in nodes {
            out.push(node.id);
            ReplyNode::collect_ids(&node.children, out);
        }
    }
}

#[derive(Debug, Error)]
pub enum ReplyTreeError {
    #[error("reply `{id}` references itself as a parent")]
    SelfParent { id: i64 },
    #[error("reply `{child}` references missing parent `{parent}`")]
    MissingParent { child: i64, parent: i64 },
    #[error("reply `{id}` exceeds maximum depth {max_depth}")]
    DepthExceeded { id: i64, max_depth: usize },
    #[error("duplicate reply id `{id}` detected")]
    DuplicateId { id: i64 },
    #[error("reply `{id}` is part of a parent cycle")]
    Cycle { id: i64 },
}

/// Build the reply forest of one comment from its flat rows.
///
/// Siblings keep the order in which the rows were supplied.
pub fn build_reply_tree(records: Vec<ReplyRecord>) -> Result<Vec<ReplyNode>, ReplyTreeError> {
    let mut nodes: HashMap<i64, ReplyNode> = HashMap::with_capacity(records.len());
    let mut children: HashMap<Option<i64>, Vec<i64>> = HashMap::new();
    let mut parents: Vec<(i64, Option<i64>)> = Vec::with_capacity(records.len());

    for record in records {
        if record.parent_reply_id == Some(record.id) {
            return Err(ReplyTreeError::SelfParent { id: record.id });
        }
        if nodes.contains_key(&record.id) {
            return Err(ReplyTreeError::DuplicateId { id: record.id });
        }

        parents.push((record.id, record.parent_reply_id));
        children
            .entry(record.parent_reply_id)
            .or_default()
            .push(record.id);
        nodes.insert(
            record.id,
            ReplyNode {
                id: record.id,
                text: record.text,
                author_id: record.author_id,
                author_name: record.author_name,
                children: Vec::new(),
            },
        );
    }

    for &(child, parent) in &parents {
        if let Some(parent) = parent
            && !nodes.contains_key(&parent)
        {
            return Err(ReplyTreeError::MissingParent { child, parent });
        }
    }

    let mut visited = HashSet::with_capacity(nodes.len());
    let mut roots = Vec::new();
    if let Some(root_ids) = children.get(&None) {
        for &root_id in root_ids {
            roots.push(assemble(root_id, 1, &mut nodes, &children, &mut visited)?);
        }
    }

    // Every parent exists, so anything left over hangs off a loop.
    if let Some(&(id, _)) = parents.iter().find(|(id, _)| !visited.contains(id)) {
        return Err(ReplyTreeError::Cycle { id });
    }

    Ok(roots)
}

fn assemble(
    id: i64,
    depth: usize,
    nodes: &mut HashMap<i64, ReplyNode>,
    children: &HashMap<Option<i64>, Vec<i64>>,
    visited: &mut HashSet<i64>,
) -> Result<ReplyNode, ReplyTreeError> {
    if depth > MAX_REPLY_DEPTH {
        return Err(ReplyTreeError::DepthExceeded {
            id,
            max_depth: MAX_REPLY_DEPTH,
        });
    }
    if !visited.insert(id) {
        return Err(ReplyTreeError::Cycle { id });
    }

    let mut node = nodes.remove(&id).ok_or(ReplyTreeError::Cycle { id })?;

    if let Some(child_ids) = children.get(&Some(id)) {
        for &child_id in child_ids {
            let child = assemble(child_id, depth + 1, nodes, children, visited)?;
            node.children.push(child);
        }
    }

    Ok(node)
}
