use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::ProcessMetadata;

/// Nested category outline: up to four category levels, with flow names as
/// terminal entries (no children). Keys keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTree {
    children: Vec<(String, Option<CategoryTree>)>,
}

impl CategoryTree {
    /// Build from metadata rows. A row walks its levels until the first
    /// missing one, then hangs its flow name (if any) at that node. A flow
    /// name repeated at the same node overwrites the earlier entry.
    pub fn build<'a, I>(processes: I) -> Self
    where
        I: IntoIterator<Item = &'a ProcessMetadata>,
    {
        let mut root = CategoryTree::default();
        for process in processes {
            let mut current = &mut root;
            for level in process.path.levels() {
                match level {
                    Some(level) => current = current.branch_mut(level),
                    None => break,
                }
            }
            if let Some(flow_name) = &process.flow_name {
                current.set_leaf(flow_name);
            }
        }
        root
    }

    fn branch_mut(&mut self, key: &str) -> &mut CategoryTree {
        let index = match self.children.iter().position(|(k, _)| k == key) {
            Some(index) => index,
            None => {
                self.children.push((key.to_string(), None));
                self.children.len() - 1
            }
        };
        // A flow name sharing a category label is promoted to a branch
        self.children[index].1.get_or_insert_with(CategoryTree::default)
    }

    fn set_leaf(&mut self, key: &str) {
        match self.children.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = None,
            None => self.children.push((key.to_string(), None)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(k, _)| k.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.children.iter().any(|(k, _)| k == key)
    }

    /// Subtree under `key`; `None` for a missing key or a terminal entry
    pub fn child(&self, key: &str) -> Option<&CategoryTree> {
        self.children
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, node)| node.as_ref())
    }

    /// Node reached by following `path` from the root
    pub fn descend(&self, path: &[&str]) -> Option<&CategoryTree> {
        path.iter().try_fold(self, |node, key| node.child(key))
    }

    /// Number of branch levels below this node
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .filter_map(|(_, node)| node.as_ref())
            .map(|node| 1 + node.depth())
            .max()
            .unwrap_or(0)
    }

    /// Indented `- key` outline, one line per entry
    pub fn outline(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.collect_outline(0, &mut lines);
        lines
    }

    fn collect_outline(&self, indent: usize, lines: &mut Vec<String>) {
        for (key, node) in &self.children {
            lines.push(format!("{}- {}", "  ".repeat(indent), key));
            if let Some(node) = node {
                node.collect_outline(indent + 1, lines);
            }
        }
    }
}

impl Serialize for CategoryTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.children.len()))?;
        for (key, node) in &self.children {
            map.serialize_entry(key, node)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CategoryPath;

    fn process(levels: [Option<&str>; 4], flow: Option<&str>) -> ProcessMetadata {
        ProcessMetadata {
            uuid: "id".to_string(),
            name: None,
            path: CategoryPath::from_levels(levels.map(|l| l.map(str::to_string))),
            flow_name: flow.map(str::to_string),
            unit: None,
            reference_quantity: None,
            geographic_zone: None,
            dataset_type: None,
        }
    }

    fn sample() -> Vec<ProcessMetadata> {
        vec![
            process(
                [Some("Transport"), Some("Routier"), Some("Ambiant"), Some("Flotte EU")],
                Some("Camion FR"),
            ),
            process([Some("Transport"), Some("Ferroviaire"), None, None], Some("Train FR")),
            process([Some("Energie"), None, Some("ignored"), None], Some("Mix FR")),
            process([None, None, None, None], Some("Orphelin")),
            process([Some("Transport"), Some("Ferroviaire"), None, None], None),
        ]
    }

    #[test]
    fn paths_stop_at_first_missing_level() {
        let tree = CategoryTree::build(&sample());
        assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["Transport", "Energie", "Orphelin"]);

        let energie = tree.child("Energie").unwrap();
        assert_eq!(energie.keys().collect::<Vec<_>>(), vec!["Mix FR"]);
        assert!(energie.child("Mix FR").is_none());

        let rail = tree.descend(&["Transport", "Ferroviaire"]).unwrap();
        assert_eq!(rail.keys().collect::<Vec<_>>(), vec!["Train FR"]);

        let fleet = tree
            .descend(&["Transport", "Routier", "Ambiant", "Flotte EU"])
            .unwrap();
        assert!(fleet.contains("Camion FR"));
    }

    #[test]
    fn depth_never_exceeds_four_levels() {
        let tree = CategoryTree::build(&sample());
        assert_eq!(tree.depth(), 4);
    }

    #[test]
    fn duplicate_flow_names_overwrite() {
        let rows = vec![
            process([Some("A"), None, None, None], Some("flux")),
            process([Some("A"), None, None, None], Some("autre")),
            process([Some("A"), None, None, None], Some("flux")),
        ];
        let tree = CategoryTree::build(&rows);
        assert_eq!(tree.child("A").unwrap().keys().collect::<Vec<_>>(), vec!["flux", "autre"]);
    }

    #[test]
    fn flow_leaf_is_promoted_when_a_later_path_needs_it() {
        let rows = vec![
            process([Some("A"), None, None, None], Some("B")),
            process([Some("A"), Some("B"), None, None], Some("x")),
        ];
        let tree = CategoryTree::build(&rows);
        assert_eq!(tree.child("A").unwrap().keys().collect::<Vec<_>>(), vec!["B"]);
        assert!(tree.descend(&["A", "B"]).unwrap().contains("x"));
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn later_flow_leaf_replaces_a_branch_of_the_same_name() {
        let rows = vec![
            process([Some("A"), Some("B"), None, None], Some("x")),
            process([Some("A"), None, None, None], Some("B")),
        ];
        let tree = CategoryTree::build(&rows);
        let a = tree.child("A").unwrap();
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["B"]);
        assert!(a.child("B").is_none());
    }

    #[test]
    fn serializes_as_nested_object_with_null_leaves() {
        let tree = CategoryTree::build(&sample()[..2]);
        let json = serde_json::to_value(&tree).unwrap();
        assert!(json["Transport"]["Ferroviaire"]["Train FR"].is_null());
        assert!(json["Transport"]["Routier"]["Ambiant"]["Flotte EU"].is_object());
    }

    #[test]
    fn outline_indents_by_depth() {
        let tree = CategoryTree::build(&sample()[1..2]);
        assert_eq!(
            tree.outline(),
            vec!["- Transport", "  - Ferroviaire", "    - Train FR"]
        );
    }
}
