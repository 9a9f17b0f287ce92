use crate::record::{Record, parent_id, record_id};
use serde::Serialize;
use std::collections::HashMap;

/// Per-node visibility for one tree view.
///
/// Nodes default to collapsed. One instance exists per rendered sidebar and
/// is rebuilt from the view's query state on every request; nothing here is
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct ExpandState {
    open: HashMap<i64, bool>,
}

impl ExpandState {
    pub fn new() -> Self {
        ExpandState::default()
    }

    /// Build the state from a list of currently-open node ids.
    pub fn from_open_ids(ids: &[i64]) -> Self {
        let mut state = ExpandState::new();
        for &id in ids {
            state.open.insert(id, true);
        }
        state
    }

    /// Flip one node's visibility. Selecting a node for filtering is a
    /// separate, co-occurring effect handled by the caller.
    pub fn toggle(&mut self, id: i64) {
        let entry = self.open.entry(id).or_insert(false);
        *entry = !*entry;
    }

    pub fn is_expanded(&self, id: i64) -> bool {
        self.open.get(&id).copied().unwrap_or(false)
    }
}

/// One visible row of the rendered sidebar: a node plus its nesting level.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TreeRow {
    pub id: i64,
    pub name: String,
    /// Nesting level; roots are 0.
    pub depth: usize,
    pub expanded: bool,
    pub has_children: bool,
}

/// The direct children of `parent` in fetched order.
///
/// This is the literal matching rule the sidebar recursion is built from:
/// the subsequence of records whose `parent_id` equals the given parent
/// identifier (`None` selects the roots). Records without a usable `id` are
/// skipped since they can never be rendered or expanded.
pub fn children_of<'a>(records: &'a [Record], parent: Option<i64>) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| record_id(r).is_some() && parent_id(r) == parent)
        .collect()
}

/// Resolve a display name by linear scan of a flat collection.
///
/// Absent identifiers resolve to an empty label rather than failing; the
/// categories table uses this to show each row's parent by name.
pub fn name_of_in(records: &[Record], id: Option<i64>) -> &str {
    let Some(id) = id else {
        return "";
    };
    records
        .iter()
        .find(|r| record_id(r) == Some(id))
        .and_then(|r| r.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// A category forest derived from a flat parent-pointer collection.
///
/// Built once per render so the sidebar does not re-scan the whole
/// collection at every nesting level. Construction validates the hierarchy:
/// a category that is its own ancestor is a structural error, reported as
/// `Err` instead of ever looping.
#[derive(Debug)]
pub struct CategoryTree {
    /// parent id (None = root) -> direct children in fetched order.
    children: HashMap<Option<i64>, Vec<i64>>,
    names: HashMap<i64, String>,
}

impl CategoryTree {
    /// Index a fetched category collection.
    ///
    /// # Arguments
    /// * `records` - the flat collection; each record carries `id`, `name`
    ///   and an optional `parent_id`
    ///
    /// # Errors
    /// * Returns an error naming the offending category when a parent chain
    ///   revisits a node or exceeds the collection's cardinality
    pub fn build(records: &[Record]) -> Result<CategoryTree, String> {
        let mut children: HashMap<Option<i64>, Vec<i64>> = HashMap::new();
        let mut names: HashMap<i64, String> = HashMap::new();
        let mut parents: HashMap<i64, Option<i64>> = HashMap::new();

        for record in records {
            let Some(id) = record_id(record) else {
                continue;
            };
            let name = record
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            children.entry(parent_id(record)).or_default().push(id);
            names.insert(id, name);
            parents.insert(id, parent_id(record));
        }

        // Walk each parent chain at most `len` steps; a well-formed chain
        // reaches a root (or an orphaned pointer) long before that.
        let bound = parents.len();
        for &start in parents.keys() {
            let mut current = start;
            for _ in 0..bound {
                match parents.get(&current).copied().flatten() {
                    Some(parent) if parent == start => {
                        return Err(format!(
                            "category {start} is its own ancestor; refusing to render the tree"
                        ));
                    }
                    Some(parent) if parents.contains_key(&parent) => current = parent,
                    // Root, or a pointer to a category that was never
                    // fetched (an orphan) - the chain ends either way.
                    _ => break,
                }
            }
        }

        Ok(CategoryTree { children, names })
    }

    /// Direct child ids of `parent`, in fetched order.
    pub fn child_ids(&self, parent: Option<i64>) -> &[i64] {
        self.children
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolve a display name; absent identifiers resolve to an empty label.
    pub fn name_of(&self, id: Option<i64>) -> &str {
        id.and_then(|id| self.names.get(&id))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Flatten the forest into the rows a sidebar actually shows.
    ///
    /// Roots are always visible; a node's children are emitted only while
    /// the node is expanded. Depth-first with an explicit stack, and the
    /// visit count is bounded by the collection size as a backstop - with a
    /// cycle-free build this bound cannot trigger, but a renderer must never
    /// be able to hang.
    pub fn visible(&self, expand: &ExpandState) -> Result<Vec<TreeRow>, String> {
        let mut rows = Vec::new();
        let mut stack: Vec<(i64, usize)> = Vec::new();

        for &root in self.child_ids(None).iter().rev() {
            stack.push((root, 0));
        }

        let bound = self.names.len();
        while let Some((id, depth)) = stack.pop() {
            if rows.len() > bound || depth > bound {
                return Err("category tree exceeds its collection size; aborting render".into());
            }

            let kids = self.child_ids(Some(id));
            let expanded = expand.is_expanded(id);
            rows.push(TreeRow {
                id,
                name: self.name_of(Some(id)).to_string(),
                depth,
                expanded,
                has_children: !kids.is_empty(),
            });

            if expanded {
                for &child in kids.iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cats(values: &[serde_json::Value]) -> Vec<Record> {
        values.iter().map(|v| v.as_object().cloned().unwrap()).collect()
    }

    fn chain() -> Vec<Record> {
        cats(&[
            json!({"id": 1, "name": "A", "parent_id": null}),
            json!({"id": 2, "name": "B", "parent_id": 1}),
            json!({"id": 3, "name": "C", "parent_id": 2}),
        ])
    }

    #[test]
    fn children_match_by_parent_pointer() {
        let records = chain();
        let roots = children_of(&records, None);
        assert_eq!(roots.len(), 1);
        assert_eq!(record_id(roots[0]), Some(1));
        assert_eq!(record_id(children_of(&records, Some(1))[0]), Some(2));
        assert_eq!(record_id(children_of(&records, Some(2))[0]), Some(3));
        assert!(children_of(&records, Some(3)).is_empty());
    }

    #[test]
    fn children_keep_fetched_order() {
        let records = cats(&[
            json!({"id": 1, "name": "root", "parent_id": null}),
            json!({"id": 5, "name": "z-last-name", "parent_id": 1}),
            json!({"id": 2, "name": "a-first-name", "parent_id": 1}),
        ]);
        let kids = children_of(&records, Some(1));
        assert_eq!(record_id(kids[0]), Some(5));
        assert_eq!(record_id(kids[1]), Some(2));
    }

    #[test]
    fn nesting_levels_follow_the_chain() {
        let tree = CategoryTree::build(&chain()).unwrap();
        let expand = ExpandState::from_open_ids(&[1, 2]);
        let rows = tree.visible(&expand).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].id, rows[0].depth), (1, 0));
        assert_eq!((rows[1].id, rows[1].depth), (2, 1));
        assert_eq!((rows[2].id, rows[2].depth), (3, 2));
    }

    #[test]
    fn collapsed_nodes_hide_their_subtree() {
        let tree = CategoryTree::build(&chain()).unwrap();

        // Everything starts collapsed: only the root shows.
        let rows = tree.visible(&ExpandState::new()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 1);
        assert!(rows[0].has_children);
        assert!(!rows[0].expanded);

        // Expanding A reveals B but not the still-collapsed B's child.
        let rows = tree.visible(&ExpandState::from_open_ids(&[1])).unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn toggle_flips_per_node_state() {
        let mut expand = ExpandState::new();
        assert!(!expand.is_expanded(1));
        expand.toggle(1);
        assert!(expand.is_expanded(1));
        expand.toggle(1);
        assert!(!expand.is_expanded(1));
        // Other nodes are untouched.
        assert!(!expand.is_expanded(2));
    }

    #[test]
    fn two_node_cycle_is_a_structural_error() {
        let records = cats(&[
            json!({"id": 1, "name": "A", "parent_id": 2}),
            json!({"id": 2, "name": "B", "parent_id": 1}),
        ]);
        let err = CategoryTree::build(&records).unwrap_err();
        assert!(err.contains("ancestor"), "unexpected error: {err}");
    }

    #[test]
    fn self_parent_is_a_structural_error() {
        let records = cats(&[json!({"id": 1, "name": "A", "parent_id": 1})]);
        assert!(CategoryTree::build(&records).is_err());
    }

    #[test]
    fn orphan_parent_pointer_degrades_to_nothing() {
        let records = cats(&[
            json!({"id": 1, "name": "A", "parent_id": null}),
            json!({"id": 2, "name": "lost", "parent_id": 99}),
        ]);
        let tree = CategoryTree::build(&records).unwrap();
        let rows = tree.visible(&ExpandState::from_open_ids(&[1, 2, 99])).unwrap();
        // The orphan is unreachable from the roots, same as the original
        // filter-based renderer.
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn name_lookup_is_total() {
        let tree = CategoryTree::build(&chain()).unwrap();
        assert_eq!(tree.name_of(Some(2)), "B");
        assert_eq!(tree.name_of(Some(42)), "");
        assert_eq!(tree.name_of(None), "");
    }

    #[test]
    fn flat_scan_name_lookup_matches_the_index() {
        let records = chain();
        assert_eq!(name_of_in(&records, Some(3)), "C");
        assert_eq!(name_of_in(&records, Some(42)), "");
        assert_eq!(name_of_in(&records, None), "");
    }

    #[test]
    fn empty_collection_renders_empty() {
        let tree = CategoryTree::build(&[]).unwrap();
        assert!(tree.visible(&ExpandState::new()).unwrap().is_empty());
    }
}
