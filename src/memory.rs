//! In-process node store.
//!
//! Rows live in insertion order behind a mutex; sibling ties on the order key
//! keep that order. Useful for fixtures and for trees that are rebuilt in
//! memory before being exported elsewhere.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::NestedSetError;
use crate::node::{NodeKey, TreeFields, TreeNode};
use crate::store::{BoundsFilter, NodeOrder, NodeStore};

#[derive(Debug, Default)]
pub struct MemoryNodeStore<Id> {
    nodes: Mutex<Vec<TreeNode<Id>>>,
}

impl<Id: NodeKey> MemoryNodeStore<Id> {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_nodes(nodes: impl IntoIterator<Item = TreeNode<Id>>) -> Self {
        Self {
            nodes: Mutex::new(nodes.into_iter().collect()),
        }
    }

    fn nodes(&self) -> Result<MutexGuard<'_, Vec<TreeNode<Id>>>, NestedSetError> {
        self.nodes
            .lock()
            .map_err(|_| NestedSetError::store("memory store mutex poisoned"))
    }

    /// Append a row; an existing id is rejected.
    pub fn insert(&self, node: TreeNode<Id>) -> Result<(), NestedSetError> {
        let mut nodes = self.nodes()?;
        if nodes.iter().any(|existing| existing.id == node.id) {
            return Err(NestedSetError::store(format!(
                "duplicate node id {:?}",
                node.id
            )));
        }
        nodes.push(node);
        Ok(())
    }

    /// Re-link a row under a new parent. Bounds stay stale until the next rebuild.
    pub fn set_parent(&self, id: &Id, parent: Option<Id>) -> Result<(), NestedSetError> {
        let mut nodes = self.nodes()?;
        let node = nodes
            .iter_mut()
            .find(|node| &node.id == id)
            .ok_or_else(|| NestedSetError::not_found(id))?;
        node.parent = parent;
        Ok(())
    }

    /// Copy of every row in insertion order.
    pub fn snapshot(&self) -> Result<Vec<TreeNode<Id>>, NestedSetError> {
        Ok(self.nodes()?.clone())
    }

    pub fn len(&self) -> Result<usize, NestedSetError> {
        Ok(self.nodes()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, NestedSetError> {
        Ok(self.nodes()?.is_empty())
    }
}

#[async_trait]
impl<Id: NodeKey> NodeStore for MemoryNodeStore<Id> {
    type Row = TreeNode<Id>;

    async fn select_children(
        &self,
        parent: Option<&Id>,
    ) -> Result<Vec<TreeNode<Id>>, NestedSetError> {
        let nodes = self.nodes()?;
        let mut children: Vec<TreeNode<Id>> = nodes
            .iter()
            .filter(|node| node.parent.as_ref() == parent)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    async fn select_by_id(&self, id: &Id) -> Result<Option<TreeNode<Id>>, NestedSetError> {
        let nodes = self.nodes()?;
        Ok(nodes.iter().find(|node| &node.id == id).cloned())
    }

    async fn select_all(
        &self,
        filter: Option<BoundsFilter>,
        order: NodeOrder,
    ) -> Result<Vec<TreeNode<Id>>, NestedSetError> {
        let nodes = self.nodes()?;
        let mut rows: Vec<TreeNode<Id>> = nodes
            .iter()
            .filter(|node| filter.map_or(true, |filter| filter.matches(&node.fields)))
            .cloned()
            .collect();
        match order {
            NodeOrder::LevelThenLeft => {
                rows.sort_by_key(|node| (node.fields.level, node.fields.left))
            }
            NodeOrder::Left => rows.sort_by_key(|node| node.fields.left),
        }
        Ok(rows)
    }

    async fn update_fields(&self, id: &Id, fields: TreeFields) -> Result<(), NestedSetError> {
        let mut nodes = self.nodes()?;
        let node = nodes
            .iter_mut()
            .find(|node| &node.id == id)
            .ok_or_else(|| NestedSetError::not_found(id))?;
        node.fields = fields;
        Ok(())
    }
}
