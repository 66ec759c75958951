/*
Tree rendering for terminals.

The editor is not a tree itself (branches, then one condition tree per branch,
then optionally a nested editor per action), so the conversion walks all three
levels into one termtree.
 */
use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::NodeArena;
use crate::domain::editor::RuleEditor;
use crate::domain::node::{NodeData, NodeId};

pub trait RuleTreeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl RuleTreeConvert for RuleEditor {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        let mut tree = Tree::new("RULE".to_string());
        let report = self.validation_report();

        for branch in self.branches() {
            let mut label = branch.kind().label().to_string();
            if report.invalid_branches.contains(&branch.id()) {
                label.push_str(" [invalid]");
            }
            let mut branch_tree = Tree::new(label);

            if let Some(root) = branch.root() {
                branch_tree.push(group_tree(self.nodes(), root, &report.invalid_nodes));
            }

            let value = branch.action().value().trim();
            let mut then_tree = Tree::new(if value.is_empty() {
                "THEN <blank>".to_string()
            } else {
                format!("THEN {value}")
            });
            if let Some(nested) = branch.action().nested() {
                then_tree.push(nested.to_tree_string());
            }
            branch_tree.push(then_tree);
            tree.push(branch_tree);
        }
        tree
    }
}

fn group_tree(arena: &NodeArena, node_idx: NodeId, invalid: &[NodeId]) -> Tree<String> {
    let Some(node) = arena.get(node_idx) else {
        return Tree::new(format!("<missing {node_idx}>"));
    };
    let mut label = node.data.to_string();
    if invalid.contains(&node_idx) {
        label.push_str(" [invalid]");
    }
    let mut tree = Tree::new(label);
    if let NodeData::Group(_) = node.data {
        for &child_idx in &node.children {
            tree.push(group_tree(arena, child_idx, invalid));
        }
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::branch::BranchKind;
    use crate::domain::node::{ConditionData, GroupData, Logic};

    #[test]
    fn given_editor_when_rendering_then_branches_groups_and_leaves_listed() {
        let mut editor = RuleEditor::default();
        let id = editor.add_branch(BranchKind::If).unwrap();
        editor.set_action_value(id, "High").unwrap();
        let root = editor.branch(id).unwrap().root().unwrap();
        editor
            .add_condition(root, ConditionData::new("Amount", ">", "100"))
            .unwrap();
        let or = editor.add_group(root, GroupData::with_logic(Logic::Or)).unwrap();
        editor.toggle_not(or).unwrap();
        editor.add_branch(BranchKind::Else);

        let rendered = editor.to_tree_string().to_string();

        assert!(rendered.starts_with("RULE"));
        assert!(rendered.contains("IF"));
        assert!(rendered.contains("Amount > 100"));
        assert!(rendered.contains("NOT OR"));
        assert!(rendered.contains("THEN High"));
        assert!(rendered.contains("ELSE [invalid]"));
        assert!(rendered.contains("THEN <blank>"));
    }
}
