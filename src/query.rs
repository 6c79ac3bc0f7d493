//! Interval queries over persisted bounds.
//!
//! None of these walk parent references; each is one store query (plus the
//! lookup of the anchor node) answered from `left`/`right`/`level` alone.

use std::collections::HashSet;

use crate::error::NestedSetError;
use crate::node::TreeRow;
use crate::store::{BoundsFilter, NodeOrder, NodeStore};

type IdOf<S> = <<S as NodeStore>::Row as TreeRow>::Id;

async fn require<S: NodeStore>(store: &S, id: &IdOf<S>) -> Result<S::Row, NestedSetError> {
    store
        .select_by_id(id)
        .await?
        .ok_or_else(|| NestedSetError::not_found(id))
}

/// Root-to-leaf chain of ancestors of `id`, ending with `id` itself when
/// `include_self` is set.
pub async fn ancestors<S: NodeStore>(
    store: &S,
    id: &IdOf<S>,
    include_self: bool,
) -> Result<Vec<S::Row>, NestedSetError> {
    let node = require(store, id).await?;
    let filter = BoundsFilter::Enclosing {
        fields: node.tree_fields(),
        inclusive: include_self,
    };
    store.select_all(Some(filter), NodeOrder::LevelThenLeft).await
}

/// Everything strictly below `root`, or every row when `root` is `None`,
/// ordered by `(level, left)`.
pub async fn descendants<S: NodeStore>(
    store: &S,
    root: Option<&IdOf<S>>,
) -> Result<Vec<S::Row>, NestedSetError> {
    let filter = match root {
        Some(id) => {
            let node = require(store, id).await?;
            Some(BoundsFilter::Within {
                fields: node.tree_fields(),
                inclusive: false,
            })
        }
        None => None,
    };
    store.select_all(filter, NodeOrder::LevelThenLeft).await
}

/// Every row in preorder.
pub async fn all_by_left<S: NodeStore>(store: &S) -> Result<Vec<S::Row>, NestedSetError> {
    store.select_all(None, NodeOrder::Left).await
}

/// Rows whose parent id does not exist. A rebuild never reaches them.
pub async fn orphans<S: NodeStore>(store: &S) -> Result<Vec<S::Row>, NestedSetError> {
    let rows = all_by_left(store).await?;
    let ids: HashSet<IdOf<S>> = rows.iter().map(TreeRow::node_id).collect();
    Ok(rows
        .into_iter()
        .filter(|row| row.parent_id().is_some_and(|parent| !ids.contains(&parent)))
        .collect())
}
