use async_trait::async_trait;

use crate::error::NestedSetError;
use crate::node::{TreeFields, TreeRow};

/// Interval predicate pushed down to the store.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BoundsFilter {
    /// Rows whose interval contains `fields` (ancestors).
    Enclosing { fields: TreeFields, inclusive: bool },
    /// Rows whose interval lies inside `fields` (descendants).
    Within { fields: TreeFields, inclusive: bool },
}

impl BoundsFilter {
    pub fn matches(&self, candidate: &TreeFields) -> bool {
        match *self {
            BoundsFilter::Enclosing { fields, inclusive } => {
                if inclusive {
                    candidate.encloses_or_equals(&fields)
                } else {
                    candidate.encloses(&fields)
                }
            }
            BoundsFilter::Within { fields, inclusive } => {
                if inclusive {
                    fields.encloses_or_equals(candidate)
                } else {
                    fields.encloses(candidate)
                }
            }
        }
    }
}

/// Result ordering for [`NodeStore::select_all`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NodeOrder {
    /// `(level, left)` ascending: breadth-first, siblings left to right.
    LevelThenLeft,
    /// `left` ascending: preorder.
    Left,
}

/// Persistence the nested-set engine depends on.
///
/// Implementations own the mapping between rows and storage; the engine only
/// reads rows and writes the three tree fields back.
#[async_trait]
pub trait NodeStore: Send + Sync {
    type Row: TreeRow;

    /// Direct children of `parent` in sibling order.
    async fn select_children(
        &self,
        parent: Option<&<Self::Row as TreeRow>::Id>,
    ) -> Result<Vec<Self::Row>, NestedSetError>;

    async fn select_by_id(
        &self,
        id: &<Self::Row as TreeRow>::Id,
    ) -> Result<Option<Self::Row>, NestedSetError>;

    async fn select_all(
        &self,
        filter: Option<BoundsFilter>,
        order: NodeOrder,
    ) -> Result<Vec<Self::Row>, NestedSetError>;

    /// Overwrite the tree fields of one row; a missing row is `NotFound`.
    async fn update_fields(
        &self,
        id: &<Self::Row as TreeRow>::Id,
        fields: TreeFields,
    ) -> Result<(), NestedSetError>;
}
