use std::collections::HashMap;

use serde::Serialize;

use crate::node::TreeRow;

/// One node of a materialized tree.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TreeBranch<Id> {
    pub id: Id,
    pub name: String,
    pub left: i32,
    pub right: i32,
    pub children: Vec<TreeBranch<Id>>,
}

impl<Id> TreeBranch<Id> {
    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}

struct Slot<Id> {
    branch: Option<TreeBranch<Id>>,
    children: Vec<usize>,
}

/// Nest rows ordered by `(level, left)` under their parents.
///
/// Rows whose parent is `top_parent` become the returned top level. Every
/// other row is attached to a parent seen earlier in the input; a row whose
/// parent never appeared is dropped.
pub fn materialize<R: TreeRow>(rows: &[R], top_parent: Option<&R::Id>) -> Vec<TreeBranch<R::Id>> {
    let mut slots: Vec<Slot<R::Id>> = Vec::with_capacity(rows.len());
    let mut lookup: HashMap<R::Id, usize> = HashMap::with_capacity(rows.len());
    let mut top = Vec::new();

    for row in rows {
        let id = row.node_id();
        let parent = row.parent_id();
        let slot = slots.len();

        if parent.as_ref() == top_parent {
            top.push(slot);
        } else if let Some(&owner) = parent.as_ref().and_then(|parent| lookup.get(parent)) {
            slots[owner].children.push(slot);
        } else {
            tracing::debug!(
                node = ?id,
                parent = ?parent,
                "skipping row without a materialized parent"
            );
            continue;
        }

        let fields = row.tree_fields();
        lookup.insert(id.clone(), slot);
        slots.push(Slot {
            branch: Some(TreeBranch {
                id,
                name: row.order_key().to_owned(),
                left: fields.left,
                right: fields.right,
                children: Vec::new(),
            }),
            children: Vec::new(),
        });
    }

    // children always sit at higher slots than their parent, so assembling
    // from the back finds every child already complete
    for slot in (0..slots.len()).rev() {
        let child_slots = std::mem::take(&mut slots[slot].children);
        let children: Vec<TreeBranch<R::Id>> = child_slots
            .into_iter()
            .filter_map(|child| slots[child].branch.take())
            .collect();
        if let Some(branch) = slots[slot].branch.as_mut() {
            branch.children = children;
        }
    }

    top.into_iter()
        .filter_map(|slot| slots[slot].branch.take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{TreeFields, TreeNode};

    fn row(
        id: u32,
        parent: Option<u32>,
        name: &str,
        left: i32,
        right: i32,
        level: i32,
    ) -> TreeNode<u32> {
        TreeNode {
            id,
            parent,
            name: name.to_string(),
            fields: TreeFields::new(left, right, level),
        }
    }

    // (level, left) order of:
    // 1 A (1,8) -> 3 A1 (2,5) -> 5 A1x (3,4)
    //           -> 4 A2 (6,7)
    // 2 B (9,10)
    fn rows() -> Vec<TreeNode<u32>> {
        vec![
            row(1, None, "A", 1, 8, 1),
            row(2, None, "B", 9, 10, 1),
            row(3, Some(1), "A1", 2, 5, 2),
            row(4, Some(1), "A2", 6, 7, 2),
            row(5, Some(3), "A1x", 3, 4, 3),
        ]
    }

    #[test]
    fn nests_the_whole_tree() {
        let tree = materialize(&rows(), None);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "A");
        assert_eq!(tree[1].name, "B");
        assert_eq!(tree[0].descendant_count(), 3);

        let names: Vec<&str> = tree[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A1", "A2"]);
        assert_eq!(tree[0].children[0].children[0].id, 5);
        assert_eq!(tree[0].children[0].children[0].left, 3);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn nests_below_a_top_parent() {
        let below_a: Vec<TreeNode<u32>> = rows()
            .into_iter()
            .filter(|r| r.fields.left > 1 && r.fields.right < 8)
            .collect();
        let tree = materialize(&below_a, Some(&1));

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, 3);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[1].id, 4);
    }

    #[test]
    fn drops_rows_without_a_parent_in_the_input() {
        let mut input = rows();
        input.push(row(6, Some(42), "stray", 0, 0, 0));
        let tree = materialize(&input, None);
        let total: usize = tree.iter().map(|t| 1 + t.descendant_count()).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn serializes_as_nested_json() {
        let tree = materialize(&rows()[1..2], None);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"id": 2, "name": "B", "left": 9, "right": 10, "children": []}])
        );
    }
}
