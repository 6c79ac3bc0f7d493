use std::fmt::Debug;
use std::hash::Hash;

use serde::Serialize;

/// Identifier types usable as node keys.
pub trait NodeKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> NodeKey for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// The three nested-set columns of a node.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize)]
pub struct TreeFields {
    pub left: i32,
    pub right: i32,
    pub level: i32,
}

impl TreeFields {
    /// Values written on insert, before the next rebuild assigns real bounds.
    pub const PLACEHOLDER: TreeFields = TreeFields {
        left: 0,
        right: 0,
        level: 0,
    };

    pub const fn new(left: i32, right: i32, level: i32) -> Self {
        Self { left, right, level }
    }

    /// Strict interval containment: `self` is an ancestor of `other`.
    pub fn encloses(&self, other: &TreeFields) -> bool {
        self.left < other.left && self.right > other.right
    }

    /// Containment that also accepts the node itself.
    pub fn encloses_or_equals(&self, other: &TreeFields) -> bool {
        self.left <= other.left && self.right >= other.right
    }
}

/// Read access to a stored node row.
pub trait TreeRow: Clone + Send + Sync + 'static {
    type Id: NodeKey;

    fn node_id(&self) -> Self::Id;

    /// Parent id, `None` for nodes directly under the root.
    fn parent_id(&self) -> Option<Self::Id>;

    /// Sibling ordering key, also used as the display name.
    fn order_key(&self) -> &str;

    fn tree_fields(&self) -> TreeFields;
}

/// Plain-data node row.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TreeNode<Id> {
    pub id: Id,
    pub parent: Option<Id>,
    pub name: String,
    pub fields: TreeFields,
}

impl<Id> TreeNode<Id> {
    /// A fresh node carrying placeholder tree fields.
    pub fn new(id: Id, parent: Option<Id>, name: impl Into<String>) -> Self {
        Self {
            id,
            parent,
            name: name.into(),
            fields: TreeFields::PLACEHOLDER,
        }
    }
}

impl<Id: NodeKey> TreeRow for TreeNode<Id> {
    type Id = Id;

    fn node_id(&self) -> Id {
        self.id.clone()
    }

    fn parent_id(&self) -> Option<Id> {
        self.parent.clone()
    }

    fn order_key(&self) -> &str {
        &self.name
    }

    fn tree_fields(&self) -> TreeFields {
        self.fields
    }
}
