use serde::Serialize;

use crate::node::TreeRow;

/// One entry of a parent picker.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SelectOption<Id> {
    pub label: String,
    pub value: Id,
    pub disabled: bool,
}

/// Flatten preorder rows into indented options.
///
/// Labels get `level - 1` copies of `indent`. When `current` names a row in
/// `rows`, that row and everything inside its interval are disabled so a node
/// cannot be picked as its own ancestor.
pub fn build_options<R: TreeRow>(
    rows: &[R],
    current: Option<&R::Id>,
    indent: &str,
) -> Vec<SelectOption<R::Id>> {
    let current = current.and_then(|current| {
        rows.iter()
            .find(|row| &row.node_id() == current)
            .map(TreeRow::tree_fields)
    });

    rows.iter()
        .map(|row| {
            let fields = row.tree_fields();
            let depth = usize::try_from(fields.level - 1).unwrap_or(0);
            SelectOption {
                label: format!("{}{}", indent.repeat(depth), row.order_key()),
                value: row.node_id(),
                disabled: current.is_some_and(|current| current.encloses_or_equals(&fields)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{TreeFields, TreeNode};

    fn rows() -> Vec<TreeNode<u32>> {
        fn row(id: u32, parent: Option<u32>, name: &str, bounds: (i32, i32, i32)) -> TreeNode<u32> {
            TreeNode {
                id,
                parent,
                name: name.to_string(),
                fields: TreeFields::new(bounds.0, bounds.1, bounds.2),
            }
        }
        vec![
            row(1, None, "Africa", (1, 6, 1)),
            row(2, Some(1), "Kenya", (2, 5, 2)),
            row(3, Some(2), "Nairobi", (3, 4, 3)),
            row(4, None, "Europe", (7, 8, 1)),
        ]
    }

    #[test]
    fn indents_by_level() {
        let labels: Vec<String> = build_options(&rows(), None, "- ")
            .into_iter()
            .map(|option| option.label)
            .collect();
        assert_eq!(labels, vec!["Africa", "- Kenya", "- - Nairobi", "Europe"]);
    }

    #[test]
    fn disables_the_current_node_and_its_descendants() {
        let options = build_options(&rows(), Some(&2), "- ");
        let disabled: Vec<u32> = options
            .iter()
            .filter(|option| option.disabled)
            .map(|option| option.value)
            .collect();
        assert_eq!(disabled, vec![2, 3]);
    }

    #[test]
    fn unknown_or_missing_current_disables_nothing() {
        assert!(build_options(&rows(), Some(&99), "- ").iter().all(|o| !o.disabled));
        assert!(build_options(&rows(), None, "- ").iter().all(|o| !o.disabled));
    }

    #[test]
    fn placeholder_levels_get_no_prefix() {
        let fresh = vec![TreeNode::new(7u32, None, "New")];
        assert_eq!(build_options(&fresh, None, "- ")[0].label, "New");
    }
}
