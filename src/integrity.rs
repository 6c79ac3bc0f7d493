//! Structural checks over a stored nested set.

use std::collections::{HashMap, HashSet};

use crate::config::OrderStrategy;
use crate::error::NestedSetError;
use crate::node::TreeRow;

/// Verify that `rows` form a correctly numbered whole-tree nested set.
///
/// Checks are local to each parent: children are contiguous and nested
/// directly inside their parent in ascending order key, leaves have width one,
/// levels increase by one per generation starting at 1, and every row is
/// reachable from the root. Together these imply a single preorder numbering
/// per root range. Order keys compare bytewise.
pub fn check_invariants<R: TreeRow>(rows: &[R]) -> Result<(), NestedSetError> {
    check(rows, true)
}

/// [`check_invariants`] without the sibling order-key check.
pub fn check_structure<R: TreeRow>(rows: &[R]) -> Result<(), NestedSetError> {
    check(rows, false)
}

/// Check `rows` as numbered under `order`. A numeric position column decides
/// sibling order on its own, so only the structure is checked.
pub fn check_ordered_by<R: TreeRow>(
    rows: &[R],
    order: &OrderStrategy,
) -> Result<(), NestedSetError> {
    match order {
        OrderStrategy::OrderKey => check_invariants(rows),
        OrderStrategy::NumericColumn { .. } => check_structure(rows),
    }
}

fn check<R: TreeRow>(rows: &[R], ordered: bool) -> Result<(), NestedSetError> {
    let mut by_id: HashMap<R::Id, &R> = HashMap::with_capacity(rows.len());
    for row in rows {
        if by_id.insert(row.node_id(), row).is_some() {
            return Err(violation(row, "appears more than once"));
        }
    }

    let mut children: HashMap<Option<R::Id>, Vec<&R>> = HashMap::new();
    for row in rows {
        let parent = row.parent_id();
        if let Some(parent) = &parent {
            if !by_id.contains_key(parent) {
                let detail = format!("references missing parent {parent:?}");
                return Err(violation(row, detail));
            }
        }
        children.entry(parent).or_default().push(row);
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|row| row.tree_fields().left);
    }

    let roots = children.get(&None).map(Vec::as_slice).unwrap_or(&[]);
    check_siblings(roots, 1, ordered)?;

    let mut reached: HashSet<R::Id> = HashSet::with_capacity(rows.len());
    let mut stack: Vec<&R> = roots.to_vec();
    while let Some(row) = stack.pop() {
        let id = row.node_id();
        if !reached.insert(id.clone()) {
            return Err(violation(row, "is reachable twice"));
        }

        let fields = row.tree_fields();
        if fields.right <= fields.left {
            let detail = format!("has right {} <= left {}", fields.right, fields.left);
            return Err(violation(row, detail));
        }

        let kids = children.get(&Some(id)).map(Vec::as_slice).unwrap_or(&[]);
        match (kids.first(), kids.last()) {
            (Some(first), Some(last)) => {
                if first.tree_fields().left != fields.left + 1 {
                    return Err(violation(*first, "does not start right after its parent"));
                }
                if last.tree_fields().right + 1 != fields.right {
                    return Err(violation(row, "does not end right after its last child"));
                }
                check_siblings(kids, fields.level + 1, ordered)?;
                stack.extend_from_slice(kids);
            }
            _ => {
                if fields.right != fields.left + 1 {
                    return Err(violation(row, "is a leaf wider than one"));
                }
            }
        }
    }

    if let Some(row) = rows.iter().find(|row| !reached.contains(&row.node_id())) {
        return Err(violation(row, "is unreachable from the root"));
    }

    Ok(())
}

fn check_siblings<R: TreeRow>(
    siblings: &[&R],
    level: i32,
    ordered: bool,
) -> Result<(), NestedSetError> {
    for row in siblings {
        if row.tree_fields().level != level {
            return Err(violation(
                *row,
                format!("has level {} instead of {level}", row.tree_fields().level),
            ));
        }
    }
    for pair in siblings.windows(2) {
        if pair[1].tree_fields().left != pair[0].tree_fields().right + 1 {
            return Err(violation(pair[1], "is not adjacent to its previous sibling"));
        }
        if ordered && pair[1].order_key() < pair[0].order_key() {
            return Err(violation(pair[1], "sorts before its previous sibling"));
        }
    }
    Ok(())
}

fn violation<R: TreeRow>(row: &R, detail: impl AsRef<str>) -> NestedSetError {
    NestedSetError::invariant(format!("node {:?} {}", row.node_id(), detail.as_ref()))
}
