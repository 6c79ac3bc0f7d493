//! Recomputation of `left`/`right`/`level` from parent references.
//!
//! A rebuild runs in three steps: [`gather_children`] reads the hierarchy
//! below the starting parent one level at a time, [`plan_rebuild`] numbers
//! it in preorder without touching the store, and [`rebuild`] writes back
//! every row whose fields changed. A whole-tree rebuild also walks the parent
//! chain of every row the gather never reached ([`find_detached_cycle`]), since
//! a node moved under its own descendant is invisible from the root.
//!
//! Numbering starts with the starting parent holding `start_left`. Its first
//! child takes `start_left + 1`, every node's `right` is the cursor after its
//! last descendant, and the next sibling continues at `right + 1`. The value
//! returned for the starting parent is the cursor after its last child, so a
//! whole-tree rebuild from `(None, 0, 0)` over three leaves returns 7.

use std::collections::{HashMap, HashSet};

use crate::error::{HierarchyFault, NestedSetError};
use crate::node::{TreeFields, TreeRow};
use crate::store::{NodeOrder, NodeStore};

/// Children lists keyed by parent, in sibling order.
#[derive(Debug, Clone)]
pub struct ChildIndex<R: TreeRow> {
    children: HashMap<Option<R::Id>, Vec<R>>,
    len: usize,
}

impl<R: TreeRow> Default for ChildIndex<R> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            len: 0,
        }
    }
}

impl<R: TreeRow> ChildIndex<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group an unordered snapshot by parent, ordering siblings by order key.
    /// Ties keep their snapshot order.
    pub fn from_rows(rows: impl IntoIterator<Item = R>) -> Self {
        let mut index = Self::new();
        for row in rows {
            index.len += 1;
            index.children.entry(row.parent_id()).or_default().push(row);
        }
        for siblings in index.children.values_mut() {
            siblings.sort_by(|a, b| a.order_key().cmp(b.order_key()));
        }
        index
    }

    /// Record the children of `parent`, already in sibling order.
    pub fn insert_children(&mut self, parent: Option<R::Id>, rows: Vec<R>) {
        self.len += rows.len();
        self.children.entry(parent).or_default().extend(rows);
    }

    pub fn children(&self, parent: Option<&R::Id>) -> &[R] {
        self.children
            .get(&parent.cloned())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Ids of every row held.
    pub fn ids(&self) -> impl Iterator<Item = R::Id> + '_ {
        self.children.values().flatten().map(TreeRow::node_id)
    }

    /// Number of rows held, across all parents.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// New tree fields for one node, next to the ones it had when read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RebuildAssignment<Id> {
    pub id: Id,
    pub previous: TreeFields,
    pub fields: TreeFields,
}

impl<Id> RebuildAssignment<Id> {
    pub fn is_changed(&self) -> bool {
        self.previous != self.fields
    }
}

/// Output of [`plan_rebuild`]: assignments in preorder and the starting
/// parent's own `right` bound.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RebuildPlan<Id> {
    pub assignments: Vec<RebuildAssignment<Id>>,
    pub right: i32,
}

impl<Id> RebuildPlan<Id> {
    /// Assignments that differ from what is stored.
    pub fn changed(&self) -> impl Iterator<Item = &RebuildAssignment<Id>> {
        self.assignments.iter().filter(|a| a.is_changed())
    }
}

/// Summary of a persisted rebuild.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RebuildOutcome {
    /// Nodes numbered by the traversal.
    pub visited: usize,
    /// Rows whose fields were written.
    pub written: usize,
    /// `right` bound of the starting parent.
    pub right: i32,
}

enum Step<'a, R> {
    Enter(&'a R, usize),
    Exit(usize),
}

/// Number the hierarchy below `start` in preorder.
///
/// Fails with `CyclicOrUnboundedHierarchy` when a node is reached twice or
/// lies more than `max_depth` levels below `start`.
pub fn plan_rebuild<R: TreeRow>(
    index: &ChildIndex<R>,
    start: Option<&R::Id>,
    start_left: i32,
    start_level: i32,
    max_depth: usize,
) -> Result<RebuildPlan<R::Id>, NestedSetError> {
    let mut visited: HashSet<R::Id> = HashSet::with_capacity(index.len() + 1);
    if let Some(start) = start {
        visited.insert(start.clone());
    }

    let mut assignments = Vec::with_capacity(index.len());
    let mut cursor = start_left + 1;
    let mut stack: Vec<Step<'_, R>> = index
        .children(start)
        .iter()
        .rev()
        .map(|row| Step::Enter(row, 1))
        .collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(row, depth) => {
                let id = row.node_id();
                if depth > max_depth {
                    return Err(NestedSetError::hierarchy(
                        &id,
                        HierarchyFault::DepthExceeded { max_depth },
                    ));
                }
                if !visited.insert(id.clone()) {
                    return Err(NestedSetError::hierarchy(&id, HierarchyFault::Cycle));
                }

                let slot = assignments.len();
                assignments.push(RebuildAssignment {
                    id: id.clone(),
                    previous: row.tree_fields(),
                    fields: TreeFields::new(cursor, cursor, start_level + depth as i32),
                });
                cursor += 1;

                stack.push(Step::Exit(slot));
                for child in index.children(Some(&id)).iter().rev() {
                    stack.push(Step::Enter(child, depth + 1));
                }
            }
            Step::Exit(slot) => {
                assignments[slot].fields.right = cursor;
                cursor += 1;
            }
        }
    }

    Ok(RebuildPlan {
        assignments,
        right: cursor,
    })
}

/// Read the hierarchy below `start` breadth-first through `select_children`.
pub async fn gather_children<S: NodeStore>(
    store: &S,
    start: Option<&<S::Row as TreeRow>::Id>,
    max_depth: usize,
) -> Result<ChildIndex<S::Row>, NestedSetError> {
    let mut index = ChildIndex::new();
    let mut visited = HashSet::new();
    if let Some(start) = start {
        visited.insert(start.clone());
    }

    let mut frontier = vec![start.cloned()];
    let mut depth = 0usize;

    while !frontier.is_empty() {
        depth += 1;
        let mut next = Vec::new();

        for parent in frontier {
            let children = store.select_children(parent.as_ref()).await?;
            for child in &children {
                let id = child.node_id();
                if !visited.insert(id.clone()) {
                    return Err(NestedSetError::hierarchy(&id, HierarchyFault::Cycle));
                }
                if depth > max_depth {
                    return Err(NestedSetError::hierarchy(
                        &id,
                        HierarchyFault::DepthExceeded { max_depth },
                    ));
                }
                next.push(Some(id));
            }
            index.insert_children(parent, children);
        }

        tracing::debug!(depth, nodes = next.len(), "gathered tree level");
        frontier = next;
    }

    Ok(index)
}

/// Check the parent chains of rows missing from a whole-tree `index`.
///
/// A chain ending at an absent parent is an orphan and passes. A chain that
/// comes back to a row it already passed is a cycle.
pub fn find_detached_cycle<R: TreeRow>(
    rows: &[R],
    index: &ChildIndex<R>,
) -> Result<(), NestedSetError> {
    let parents: HashMap<R::Id, Option<R::Id>> = rows
        .iter()
        .map(|row| (row.node_id(), row.parent_id()))
        .collect();
    let mut settled: HashSet<R::Id> = index.ids().collect();

    for row in rows {
        let mut chain = HashSet::new();
        let mut current = Some(row.node_id());
        while let Some(id) = current.take() {
            if settled.contains(&id) {
                break;
            }
            if !chain.insert(id.clone()) {
                return Err(NestedSetError::hierarchy(&id, HierarchyFault::Cycle));
            }
            current = parents.get(&id).cloned().flatten();
        }
        settled.extend(chain);
    }

    Ok(())
}

async fn read_hierarchy<S: NodeStore>(
    store: &S,
    start: Option<&<S::Row as TreeRow>::Id>,
    max_depth: usize,
) -> Result<ChildIndex<S::Row>, NestedSetError> {
    let index = gather_children(store, start, max_depth).await?;
    if start.is_none() {
        let rows = store.select_all(None, NodeOrder::Left).await?;
        if rows.len() > index.len() {
            find_detached_cycle(&rows, &index)?;
        }
    }
    Ok(index)
}

/// Recompute and persist the tree fields of everything below `start`.
///
/// The starting parent's own row is not written; its `right` bound is
/// returned in [`RebuildOutcome::right`]. Parent cycles and chains deeper
/// than `max_depth` fail before anything is written. Store failures surface as
/// `RebuildIncomplete`, after which the tree must be rebuilt again before its
/// bounds can be trusted.
pub async fn rebuild<S: NodeStore>(
    store: &S,
    start: Option<&<S::Row as TreeRow>::Id>,
    start_left: i32,
    start_level: i32,
    max_depth: usize,
) -> Result<RebuildOutcome, NestedSetError> {
    let index = match read_hierarchy(store, start, max_depth).await {
        Ok(index) => index,
        Err(err @ NestedSetError::CyclicOrUnboundedHierarchy { .. }) => return Err(err),
        Err(err) => {
            tracing::warn!(error = %err, "rebuild aborted while reading the hierarchy");
            return Err(NestedSetError::incomplete(0, 0, err));
        }
    };

    let plan = plan_rebuild(&index, start, start_left, start_level, max_depth)?;
    let planned = plan.changed().count();
    let mut written = 0;

    for assignment in plan.changed() {
        if let Err(err) = store.update_fields(&assignment.id, assignment.fields).await {
            tracing::warn!(
                node = ?assignment.id,
                written,
                planned,
                error = %err,
                "rebuild aborted while writing tree fields"
            );
            return Err(NestedSetError::incomplete(written, planned, err));
        }
        written += 1;
    }

    tracing::info!(
        visited = plan.assignments.len(),
        written,
        right = plan.right,
        "nested set rebuilt"
    );

    Ok(RebuildOutcome {
        visited: plan.assignments.len(),
        written,
        right: plan.right,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;
    use crate::integrity::check_invariants;
    use crate::node::TreeNode;

    fn node(id: u32, parent: Option<u32>, name: &str) -> TreeNode<u32> {
        TreeNode::new(id, parent, name)
    }

    fn plan_forest(rows: &[TreeNode<u32>]) -> RebuildPlan<u32> {
        plan_rebuild(&ChildIndex::from_rows(rows.to_vec()), None, 0, 0, 64).unwrap()
    }

    fn fields_by_id(plan: &RebuildPlan<u32>) -> HashMap<u32, TreeFields> {
        plan.assignments.iter().map(|a| (a.id, a.fields)).collect()
    }

    fn apply(rows: &mut [TreeNode<u32>], plan: &RebuildPlan<u32>) {
        let fields = fields_by_id(plan);
        for row in rows.iter_mut() {
            if let Some(f) = fields.get(&row.id) {
                row.fields = *f;
            }
        }
    }

    #[test]
    fn three_leaves_under_the_root() {
        // inserted out of order; siblings are numbered by name
        let index = ChildIndex::from_rows(vec![
            node(3, None, "C"),
            node(1, None, "A"),
            node(2, None, "B"),
        ]);
        let plan = plan_rebuild(&index, None, 0, 0, 16).unwrap();

        let fields = fields_by_id(&plan);
        assert_eq!(fields[&1], TreeFields::new(1, 2, 1));
        assert_eq!(fields[&2], TreeFields::new(3, 4, 1));
        assert_eq!(fields[&3], TreeFields::new(5, 6, 1));
        assert_eq!(plan.right, 7);
        let order: Vec<u32> = plan.assignments.iter().map(|a| a.id).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn two_level_chain() {
        let index = ChildIndex::from_rows(vec![node(1, None, "P"), node(2, Some(1), "C")]);
        let plan = plan_rebuild(&index, None, 0, 0, 16).unwrap();

        let fields = fields_by_id(&plan);
        assert_eq!(fields[&1], TreeFields::new(1, 4, 1));
        assert_eq!(fields[&2], TreeFields::new(2, 3, 2));
        assert_eq!(plan.right, 5);
    }

    #[test]
    fn subtree_numbering_starts_after_the_parent() {
        let index = ChildIndex::from_rows(vec![
            node(1, None, "root"),
            node(2, Some(1), "b"),
            node(3, Some(1), "a"),
            node(4, Some(3), "x"),
        ]);
        let plan = plan_rebuild(&index, Some(&1), 10, 1, 16).unwrap();

        let fields = fields_by_id(&plan);
        assert!(!fields.contains_key(&1));
        assert_eq!(fields[&3], TreeFields::new(11, 14, 2));
        assert_eq!(fields[&4], TreeFields::new(12, 13, 3));
        assert_eq!(fields[&2], TreeFields::new(15, 16, 2));
        assert_eq!(plan.right, 17);
    }

    #[test]
    fn empty_tree_returns_the_first_free_bound() {
        let index: ChildIndex<TreeNode<u32>> = ChildIndex::new();
        let plan = plan_rebuild(&index, None, 0, 0, 16).unwrap();
        assert!(plan.assignments.is_empty());
        assert_eq!(plan.right, 1);
    }

    #[test]
    fn cycle_below_the_start_is_rejected() {
        let index = ChildIndex::from_rows(vec![node(1, Some(2), "x"), node(2, Some(1), "y")]);

        let err = plan_rebuild(&index, Some(&1), 0, 0, 16).unwrap_err();
        assert!(matches!(
            err,
            NestedSetError::CyclicOrUnboundedHierarchy {
                fault: HierarchyFault::Cycle,
                ..
            }
        ));

        // unreachable from the root: the plan skips it, the chain walk does not
        let plan = plan_rebuild(&index, None, 0, 0, 16).unwrap();
        assert!(plan.assignments.is_empty());
        let rows = vec![node(1, Some(2), "x"), node(2, Some(1), "y")];
        assert!(find_detached_cycle(&rows, &index).is_err());
    }

    #[test]
    fn node_moved_under_its_grandchild_is_a_detached_cycle() {
        let rows = vec![
            node(1, Some(5), "Europe"),
            node(2, None, "Asia"),
            node(3, Some(1), "France"),
            node(5, Some(3), "Paris"),
            node(6, Some(2), "Japan"),
        ];
        let reachable =
            ChildIndex::from_rows(vec![node(2, None, "Asia"), node(6, Some(2), "Japan")]);

        let err = find_detached_cycle(&rows, &reachable).unwrap_err();
        assert!(matches!(
            err,
            NestedSetError::CyclicOrUnboundedHierarchy {
                fault: HierarchyFault::Cycle,
                ..
            }
        ));
    }

    #[test]
    fn orphan_chains_are_not_cycles() {
        let rows = vec![
            node(1, None, "root"),
            node(2, Some(42), "lost"),
            node(3, Some(2), "below lost"),
        ];
        let reachable = ChildIndex::from_rows(vec![node(1, None, "root")]);
        assert!(find_detached_cycle(&rows, &reachable).is_ok());
    }

    #[test]
    fn depth_bound_is_enforced() {
        let rows = (1..=5).map(|id| node(id, if id == 1 { None } else { Some(id - 1) }, "n"));
        let index = ChildIndex::from_rows(rows);

        assert!(plan_rebuild(&index, None, 0, 0, 5).is_ok());
        let err = plan_rebuild(&index, None, 0, 0, 4).unwrap_err();
        match err {
            NestedSetError::CyclicOrUnboundedHierarchy { id, fault } => {
                assert_eq!(id, "5");
                assert_eq!(fault, HierarchyFault::DepthExceeded { max_depth: 4 });
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn replanning_a_rebuilt_tree_changes_nothing() {
        let mut rows = vec![
            node(1, None, "b"),
            node(2, None, "a"),
            node(3, Some(1), "c"),
            node(4, Some(2), "d"),
        ];
        let first = plan_rebuild(&ChildIndex::from_rows(rows.clone()), None, 0, 0, 16).unwrap();
        assert_eq!(first.changed().count(), 4);
        apply(&mut rows, &first);

        let second = plan_rebuild(&ChildIndex::from_rows(rows.clone()), None, 0, 0, 16).unwrap();
        assert_eq!(second.changed().count(), 0);
        assert_eq!(fields_by_id(&first), fields_by_id(&second));
    }

    fn forest() -> impl Strategy<Value = Vec<TreeNode<u32>>> {
        prop::collection::vec((any::<u32>(), "[a-e]{1,2}"), 0..40).prop_map(|picks| {
            picks
                .into_iter()
                .enumerate()
                .map(|(i, (pick, name))| {
                    let id = i as u32 + 1;
                    // parents always precede children, so no cycles
                    let parent = match pick % (id) {
                        0 => None,
                        p => Some(p),
                    };
                    TreeNode::new(id, parent, name)
                })
                .collect()
        })
    }

    fn is_ancestor(rows: &HashMap<u32, TreeNode<u32>>, ancestor: u32, node: u32) -> bool {
        let mut current = rows[&node].parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = rows[&parent].parent;
        }
        false
    }

    proptest! {
        #[test]
        fn prop_plan_satisfies_invariants(rows in forest()) {
            let mut rows = rows;
            let plan = plan_forest(&rows);
            prop_assert_eq!(plan.assignments.len(), rows.len());
            prop_assert_eq!(plan.right, 2 * rows.len() as i32 + 1);
            apply(&mut rows, &plan);
            prop_assert!(check_invariants(&rows).is_ok());
        }

        #[test]
        fn prop_intervals_match_parent_chains(rows in forest()) {
            let mut rows = rows;
            let plan = plan_forest(&rows);
            apply(&mut rows, &plan);
            let by_id: HashMap<u32, TreeNode<u32>> =
                rows.iter().map(|r| (r.id, r.clone())).collect();

            for a in &rows {
                for b in &rows {
                    prop_assert_eq!(a.fields.encloses(&b.fields), is_ancestor(&by_id, a.id, b.id));
                }
                let depth = rows.iter().filter(|other| other.fields.encloses(&a.fields)).count();
                prop_assert_eq!(a.fields.level as usize, depth + 1);
            }
        }

        #[test]
        fn prop_planning_is_idempotent(rows in forest()) {
            let mut rows = rows;
            let first = plan_forest(&rows);
            apply(&mut rows, &first);
            let second = plan_forest(&rows);
            prop_assert_eq!(second.changed().count(), 0);
            prop_assert_eq!(fields_by_id(&first), fields_by_id(&second));
        }
    }
}
