//! Pure walks over a [`ConceptNode`] tree.
//!
//! Nothing here fails: malformed or missing structure degrades to `None`,
//! an empty list or zero.

use serde::Serialize;

use crate::model::{Children, ConceptNode, NodeKind};

/// Title used for leaves that do not carry one.
pub const DEFAULT_LEAF_TITLE: &str = "Untitled";

/// Maximum number of hits returned by [`search_leaves`] unless the caller asks otherwise.
pub const SEARCH_RESULT_LIMIT: usize = 10;

/// A leaf reached by [`collect_leaves`], with the key path from the root it was collected from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafEntry {
    pub title: String,
    pub path: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    /// The first `limit` matches, in tree order.
    pub matches: Vec<LeafEntry>,
    /// Number of matching leaves, or of all leaves when the query is blank.
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapStats {
    pub nodes: usize,
    pub leaves: usize,
    pub depth: usize,
}

pub fn is_leaf(node: &ConceptNode) -> bool {
    matches!(node.kind, NodeKind::Leaf { .. })
}

pub fn children_of(node: &ConceptNode) -> Option<&Children> {
    match &node.kind {
        NodeKind::Category { children } => Some(children),
        NodeKind::Leaf { .. } | NodeKind::Empty => None,
    }
}

/// Follow `path` from `root`. `None` means the path no longer exists and the
/// caller should fall back to the root.
pub fn resolve<'a, S: AsRef<str>>(root: &'a ConceptNode, path: &[S]) -> Option<&'a ConceptNode> {
    path.iter()
        .try_fold(root, |node, key| children_of(node)?.get(key.as_ref()))
}

/// Count every node below `node` (the node itself excluded).
pub fn count_nodes(node: &ConceptNode) -> usize {
    children_of(node)
        .map(|children| children.values().map(|child| 1 + count_nodes(child)).sum())
        .unwrap_or(0)
}

pub fn count_leaves(node: &ConceptNode) -> usize {
    match &node.kind {
        NodeKind::Leaf { .. } => 1,
        NodeKind::Category { children } => children.values().map(count_leaves).sum(),
        NodeKind::Empty => 0,
    }
}

/// Depth-first list of every leaf under `node`, children in document order.
pub fn collect_leaves(node: &ConceptNode) -> Vec<LeafEntry> {
    let mut leaves = Vec::new();
    let mut path = Vec::new();
    collect_into(node, &mut path, &mut leaves);
    leaves
}

fn collect_into(node: &ConceptNode, path: &mut Vec<String>, out: &mut Vec<LeafEntry>) {
    match &node.kind {
        NodeKind::Leaf { message } => out.push(LeafEntry {
            title: node
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_LEAF_TITLE.to_string()),
            path: path.clone(),
            message: message.clone(),
        }),
        NodeKind::Category { children } => {
            for (key, child) in children {
                path.push(key.clone());
                collect_into(child, path, out);
                path.pop();
            }
        }
        NodeKind::Empty => {}
    }
}

/// Label shown for a child: its own title, else the key it is stored under.
pub fn display_title<'a>(key: &'a str, node: &'a ConceptNode) -> &'a str {
    node.title.as_deref().unwrap_or(key)
}

/// Case-insensitive substring search over leaf titles.
pub fn search_leaves(root: &ConceptNode, query: &str, limit: usize) -> SearchResults {
    let leaves = collect_leaves(root);
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return SearchResults {
            matches: Vec::new(),
            total: leaves.len(),
        };
    }

    let hits: Vec<LeafEntry> = leaves
        .into_iter()
        .filter(|leaf| leaf.title.to_lowercase().contains(&needle))
        .collect();
    let total = hits.len();
    SearchResults {
        matches: hits.into_iter().take(limit).collect(),
        total,
    }
}

pub fn breadcrumb<S: AsRef<str>>(path: &[S]) -> String {
    std::iter::once("Home")
        .chain(path.iter().map(AsRef::as_ref))
        .collect::<Vec<_>>()
        .join(" > ")
}

pub fn stats<S>(root: &ConceptNode, current_path: &[S]) -> MapStats {
    MapStats {
        nodes: count_nodes(root),
        leaves: count_leaves(root),
        depth: current_path.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> ConceptNode {
        ConceptNode::from_json(&value)
    }

    #[test]
    fn single_leaf_under_root() {
        let root = doc(json!({"children": {"a": {"message": "M"}}}));
        let leaf = resolve(&root, &["a"]).expect("leaf resolves");
        assert!(is_leaf(leaf));
        assert_eq!(leaf.message(), Some("M"));
        assert_eq!(count_nodes(&root), 1);
        assert_eq!(count_leaves(&root), 1);
    }

    #[test]
    fn nested_leaf_collects_default_title_and_full_path() {
        let root = doc(json!({"children": {"a": {"children": {"b": {"message": "M"}}}}}));
        assert_eq!(count_nodes(&root), 2);
        assert_eq!(
            collect_leaves(&root),
            vec![LeafEntry {
                title: DEFAULT_LEAF_TITLE.to_string(),
                path: vec!["a".to_string(), "b".to_string()],
                message: "M".to_string(),
            }]
        );
    }

    #[test]
    fn resolve_without_children_is_none() {
        let root = doc(json!({"title": "bare"}));
        assert_eq!(resolve(&root, &["x"]), None);

        let leaf_root = doc(json!({"message": "hi"}));
        assert_eq!(resolve(&leaf_root, &["x"]), None);
    }

    #[test]
    fn resolve_empty_path_is_root() {
        let root = doc(json!({"children": {"a": {"message": "M"}}}));
        assert_eq!(resolve::<&str>(&root, &[]), Some(&root));
    }

    #[test]
    fn resolve_stops_at_missing_key_at_any_depth() {
        let root = doc(json!({"children": {"a": {"children": {"b": {"message": "M"}}}}}));
        assert_eq!(resolve(&root, &["a", "zz"]), None);
        assert_eq!(resolve(&root, &["zz", "b"]), None);
        assert_eq!(resolve(&root, &["a", "b", "c"]), None);
    }

    #[test]
    fn empty_nodes_count_as_nodes_but_not_leaves() {
        let root = doc(json!({"children": {"e": {}, "l": {"message": "x"}}}));
        assert_eq!(count_nodes(&root), 2);
        assert_eq!(count_leaves(&root), 1);
        assert!(!is_leaf(resolve(&root, &["e"]).unwrap()));
        assert_eq!(children_of(resolve(&root, &["e"]).unwrap()), None);
    }

    #[test]
    fn leaf_root_is_its_own_single_leaf() {
        let root = doc(json!({"title": "Only", "message": "M"}));
        assert_eq!(count_nodes(&root), 0);
        assert_eq!(count_leaves(&root), 1);
        let leaves = collect_leaves(&root);
        assert_eq!(leaves.len(), 1);
        assert!(leaves[0].path.is_empty());
        assert_eq!(leaves[0].title, "Only");
    }

    #[test]
    fn display_title_falls_back_to_key() {
        let titled = ConceptNode::leaf("m").with_title("Compactness");
        let untitled = ConceptNode::leaf("m");
        assert_eq!(display_title("compact", &titled), "Compactness");
        assert_eq!(display_title("compact", &untitled), "compact");
    }

    #[test]
    fn search_is_case_insensitive_and_limited() {
        let children: Vec<(String, ConceptNode)> = (0..15)
            .map(|i| {
                (
                    format!("k{i}"),
                    ConceptNode::leaf(format!("m{i}")).with_title(format!("Open Set {i}")),
                )
            })
            .chain(std::iter::once((
                "other".to_string(),
                ConceptNode::leaf("x").with_title("Closure"),
            )))
            .collect();
        let root = ConceptNode::category(children);

        let results = search_leaves(&root, "open set", SEARCH_RESULT_LIMIT);
        assert_eq!(results.total, 15);
        assert_eq!(results.matches.len(), SEARCH_RESULT_LIMIT);
        assert_eq!(results.matches[0].path, vec!["k0".to_string()]);

        let results = search_leaves(&root, "CLOS", SEARCH_RESULT_LIMIT);
        assert_eq!(results.total, 1);
        assert_eq!(results.matches[0].message, "x");
    }

    #[test]
    fn blank_search_reports_leaf_total() {
        let root = doc(json!({"children": {"a": {"message": "1"}, "b": {"message": "2"}}}));
        let results = search_leaves(&root, "   ", SEARCH_RESULT_LIMIT);
        assert!(results.matches.is_empty());
        assert_eq!(results.total, 2);
    }

    #[test]
    fn breadcrumb_starts_at_home() {
        assert_eq!(breadcrumb::<&str>(&[]), "Home");
        assert_eq!(breadcrumb(&["spaces", "compact"]), "Home > spaces > compact");
    }

    #[test]
    fn stats_report_depth_of_current_path() {
        let root = doc(json!({"children": {"a": {"children": {"b": {"message": "M"}}}}}));
        assert_eq!(
            stats(&root, &["a"]),
            MapStats {
                nodes: 2,
                leaves: 1,
                depth: 1
            }
        );
    }
}
