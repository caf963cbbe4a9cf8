//! Combining configuration and operational subtrees

use crate::errors::{Result, TxError};
use crate::model::{Children, DataNode};

/// Merge the operational and configuration views of the same subtree
///
/// When only one side is present it is returned unchanged. Otherwise both
/// trees are walked in lock-step: children present on one side only are
/// copied, matching children are merged, and scalar values come from the
/// configuration side. Children keep configuration order followed by
/// state-only children.
///
/// # Errors
///
/// `InconsistentMerge` when matching nodes differ in kind or module.
pub fn merge_config_and_state(
    state: Option<DataNode>,
    config: Option<DataNode>,
) -> Result<Option<DataNode>> {
    match (state, config) {
        (None, None) => Ok(None),
        (Some(state), None) => Ok(Some(state)),
        (None, Some(config)) => Ok(Some(config)),
        (Some(state), Some(config)) => merge_nodes(config, state).map(Some),
    }
}

fn merge_nodes(config: DataNode, state: DataNode) -> Result<DataNode> {
    if config.name().module != state.name().module {
        return Err(TxError::InconsistentMerge {
            reason: format!(
                "node {} and {} belong to different modules",
                config.name(),
                state.name()
            ),
        });
    }
    if config.kind() != state.kind() {
        return Err(TxError::InconsistentMerge {
            reason: format!(
                "node {} is {:?} in config but {:?} in state",
                config.name(),
                config.kind(),
                state.kind()
            ),
        });
    }

    match config {
        DataNode::Leaf { .. } | DataNode::LeafSetEntry { .. } | DataNode::UnkeyedList { .. } => {
            Ok(config)
        }
        mut interior => {
            let config_children = interior.children_mut().map(std::mem::take).unwrap_or_default();
            let state_children = match state {
                DataNode::Container { children, .. }
                | DataNode::MapEntry { children, .. }
                | DataNode::Choice { children, .. }
                | DataNode::List {
                    entries: children, ..
                }
                | DataNode::LeafSet {
                    entries: children, ..
                } => children,
                _ => Children::new(),
            };
            let merged = merge_children(config_children, state_children)?;
            if let Some(children) = interior.children_mut() {
                *children = merged;
            }
            Ok(interior)
        }
    }
}

fn merge_children(config: Children, mut state: Children) -> Result<Children> {
    let mut merged = Children::with_capacity(config.len() + state.len());
    for (arg, config_child) in config {
        let child = match state.shift_remove(&arg) {
            Some(state_child) => merge_nodes(config_child, state_child)?,
            None => config_child,
        };
        merged.insert(arg, child);
    }
    merged.extend(state);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListOrdering, PathArg, QName};

    #[test]
    fn test_single_side_is_returned_unchanged() {
        let node = DataNode::container("top").with_child(DataNode::leaf("a", 1i64));
        assert_eq!(
            merge_config_and_state(Some(node.clone()), None).unwrap(),
            Some(node.clone())
        );
        assert_eq!(
            merge_config_and_state(None, Some(node.clone())).unwrap(),
            Some(node)
        );
        assert_eq!(merge_config_and_state(None, None).unwrap(), None);
    }

    #[test]
    fn test_disjoint_leaves_are_combined() {
        let config = DataNode::container("top").with_child(DataNode::leaf("a", 1i64));
        let state = DataNode::container("top").with_child(DataNode::leaf("b", 2i64));

        let merged = merge_config_and_state(Some(state), Some(config))
            .unwrap()
            .unwrap();

        assert_eq!(
            merged,
            DataNode::container("top")
                .with_child(DataNode::leaf("a", 1i64))
                .with_child(DataNode::leaf("b", 2i64))
        );
    }

    #[test]
    fn test_nested_containers_merge_recursively() {
        let config = DataNode::container("top")
            .with_child(DataNode::container("a").with_child(DataNode::leaf("x", 1i64)));
        let state = DataNode::container("top")
            .with_child(DataNode::container("a").with_child(DataNode::leaf("y", 2i64)));

        let merged = merge_config_and_state(Some(state), Some(config))
            .unwrap()
            .unwrap();

        let a = merged.child(&PathArg::node("a")).unwrap();
        assert_eq!(a.child(&PathArg::node("x")), Some(&DataNode::leaf("x", 1i64)));
        assert_eq!(a.child(&PathArg::node("y")), Some(&DataNode::leaf("y", 2i64)));
    }

    #[test]
    fn test_config_value_wins_for_leaves() {
        let config = DataNode::container("top").with_child(DataNode::leaf("mtu", 1500i64));
        let state = DataNode::container("top").with_child(DataNode::leaf("mtu", 9000i64));

        let merged = merge_config_and_state(Some(state), Some(config))
            .unwrap()
            .unwrap();
        assert_eq!(
            merged.child(&PathArg::node("mtu")),
            Some(&DataNode::leaf("mtu", 1500i64))
        );
    }

    #[test]
    fn test_list_entries_are_merged_by_key() {
        let config = DataNode::list("item", ListOrdering::User).with_child(
            DataNode::map_entry("item", [("name", "a")]).with_child(DataNode::leaf("cfg", true)),
        );
        let state = DataNode::list("item", ListOrdering::User)
            .with_child(
                DataNode::map_entry("item", [("name", "a")])
                    .with_child(DataNode::leaf("counter", 7u64)),
            )
            .with_child(DataNode::map_entry("item", [("name", "b")]));

        let merged = merge_config_and_state(Some(state), Some(config))
            .unwrap()
            .unwrap();

        let entries = merged.children().unwrap();
        assert_eq!(entries.len(), 2);
        let a = merged
            .child(&PathArg::entry("item", [("name", "a")]))
            .unwrap();
        assert!(a.child(&PathArg::node("cfg")).is_some());
        assert!(a.child(&PathArg::node("counter")).is_some());
    }

    #[test]
    fn test_kind_mismatch_is_fatal() {
        let config = DataNode::container("top").with_child(DataNode::leaf("a", 1i64));
        let state = DataNode::container("top").with_child(DataNode::container("a"));

        let err = merge_config_and_state(Some(state), Some(config)).unwrap_err();
        assert!(matches!(err, TxError::InconsistentMerge { .. }));
        assert_eq!(err.code(), "ERR_INTERNAL");
    }

    #[test]
    fn test_module_mismatch_is_fatal() {
        let config = DataNode::container(QName::new("mod-a", "top"));
        let state = DataNode::container(QName::new("mod-b", "top"));

        assert!(merge_config_and_state(Some(state), Some(config)).is_err());
    }
}
