//! Integration tests for branch sequencing, tree edits and validation.

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;

use rulebuilder::domain::{
    BranchKind, ConditionData, EditorOptions, GroupData, Logic, ModelEvent, RuleEditor,
};
use rulebuilder::util::testing;

fn complete(field: &str, op: &str, value: &str) -> ConditionData {
    ConditionData::new(field, op, value)
}

/// IF branch with one complete condition and action "High".
fn if_editor() -> (RuleEditor, rulebuilder::domain::NodeId) {
    let mut editor = RuleEditor::default();
    let id = editor.add_branch(BranchKind::If).unwrap();
    editor.set_action_value(id, "High").unwrap();
    let root = editor.branch(id).unwrap().root().unwrap();
    editor.add_condition(root, complete("Amount", ">", "100")).unwrap();
    (editor, root)
}

// ============================================================
// Sequencing
// ============================================================

#[test]
fn given_if_and_else_when_adding_elseif_then_refused() {
    testing::init_test_setup();
    let mut editor = RuleEditor::default();

    assert!(editor.add_branch(BranchKind::If).is_some());
    assert!(editor.add_branch(BranchKind::Else).is_some());
    assert!(editor.add_branch(BranchKind::ElseIf).is_none());

    assert_eq!(editor.kinds(), vec![BranchKind::If, BranchKind::Else]);
}

#[rstest]
#[case(&[], BranchKind::If, true)]
#[case(&[], BranchKind::ElseIf, false)]
#[case(&[], BranchKind::Else, false)]
#[case(&[BranchKind::If], BranchKind::If, false)]
#[case(&[BranchKind::If], BranchKind::ElseIf, true)]
#[case(&[BranchKind::If], BranchKind::Else, true)]
#[case(&[BranchKind::If, BranchKind::ElseIf], BranchKind::ElseIf, true)]
#[case(&[BranchKind::If, BranchKind::Else], BranchKind::Else, false)]
#[case(&[BranchKind::If, BranchKind::Else], BranchKind::ElseIf, false)]
fn given_existing_branches_when_can_add_then_sequencing_rule_applies(
    #[case] existing: &[BranchKind],
    #[case] kind: BranchKind,
    #[case] expected: bool,
) {
    let mut editor = RuleEditor::default();
    for &k in existing {
        editor.add_branch(k).unwrap();
    }
    assert_eq!(editor.can_add(kind), expected);
    assert_eq!(editor.add_branch(kind).is_some(), expected);
}

#[test]
fn given_any_add_sequence_when_applied_then_sequence_stays_valid() {
    let kinds = [BranchKind::If, BranchKind::ElseIf, BranchKind::Else];
    // every sequence of length 4 over the three kinds
    for n in 0..81u32 {
        let mut editor = RuleEditor::default();
        let mut rest = n;
        for _ in 0..4 {
            editor.add_branch(kinds[(rest % 3) as usize]);
            rest /= 3;
        }
        assert!(
            BranchKind::sequence_is_valid(&editor.kinds()),
            "invalid sequence {:?}",
            editor.kinds()
        );
    }
}

#[test]
fn given_if_with_followers_when_if_removed_then_all_removed() {
    let mut editor = RuleEditor::default();
    editor.add_branch(BranchKind::If).unwrap();
    editor.add_branch(BranchKind::ElseIf).unwrap();
    let if_id = editor.branches()[0].id();

    editor.remove_branch(if_id);

    assert!(editor.branches().is_empty(), "branches without IF are removed");
}

#[test]
fn given_if_else_when_else_removed_then_if_kept() {
    let mut editor = RuleEditor::default();
    editor.add_branch(BranchKind::If).unwrap();
    let else_id = editor.add_branch(BranchKind::Else).unwrap();
    let nodes_before = editor.node_count();

    assert!(editor.remove_branch(else_id));

    assert_eq!(editor.kinds(), vec![BranchKind::If]);
    assert_eq!(editor.node_count(), nodes_before);
}

#[test]
fn given_elseif_when_removed_then_its_tree_deregistered() {
    let mut editor = RuleEditor::default();
    editor.add_branch(BranchKind::If).unwrap();
    let elseif = editor.add_branch(BranchKind::ElseIf).unwrap();
    let root = editor.branch(elseif).unwrap().root().unwrap();
    let leaf = editor.add_condition(root, complete("Status", "=", "Open")).unwrap();

    editor.remove_branch(elseif);

    assert!(!editor.nodes().contains(root));
    assert!(!editor.nodes().contains(leaf));
    assert_eq!(editor.kinds(), vec![BranchKind::If]);
}

// ============================================================
// Tree edits
// ============================================================

#[test]
fn given_only_root_when_removed_then_fresh_default_root() {
    let (mut editor, root) = if_editor();
    let branch = editor.branches()[0].id();

    assert!(editor.remove_node(root).unwrap());

    let new_root = editor.branch(branch).unwrap().root().unwrap();
    assert_ne!(new_root, root);
    let group = editor.nodes().group(new_root).unwrap();
    assert_eq!(group.logic, Logic::And);
    assert!(!group.negate);
    assert!(editor.nodes().children(new_root).is_empty());
    assert_eq!(editor.node_count(), 1);
}

#[test]
fn given_item_of_other_group_when_remove_item_then_noop() {
    let (mut editor, root) = if_editor();
    let group = editor.add_group(root, GroupData::with_logic(Logic::Or)).unwrap();
    let inner = editor.add_condition(group, complete("Status", "=", "A")).unwrap();

    assert!(!editor.remove_item(root, inner).unwrap());
    assert!(editor.nodes().contains(inner));
    assert_eq!(editor.nodes().parent(inner), Some(group));
}

#[test]
fn given_nested_group_when_removed_then_whole_subtree_deregistered() {
    let (mut editor, root) = if_editor();
    let group = editor.add_group(root, GroupData::default()).unwrap();
    editor.add_condition(group, complete("Status", "=", "A")).unwrap();
    editor.add_condition(group, complete("Status", "=", "B")).unwrap();
    assert_eq!(editor.node_count(), 5);

    assert!(editor.remove_item(root, group).unwrap());

    assert_eq!(editor.node_count(), 2);
    assert_eq!(editor.nodes().children(root).len(), 1);
}

#[test]
fn given_ids_when_nodes_removed_then_never_reused() {
    let (mut editor, root) = if_editor();
    let a = editor.add_condition(root, ConditionData::default()).unwrap();
    editor.remove_item(root, a).unwrap();
    let b = editor.add_condition(root, ConditionData::default()).unwrap();

    assert!(b.get() > a.get());
}

#[test]
fn given_field_options_when_setting_unknown_field_then_refused() {
    let (mut editor, root) = if_editor();
    let leaf = editor.nodes().children(root)[0];

    assert!(!editor.set_field(leaf, "Unknown").unwrap());
    assert!(editor.set_field(leaf, "Status").unwrap());
    assert!(!editor.set_operator(leaf, "~=").unwrap());

    let condition = editor.nodes().condition(leaf).unwrap();
    assert_eq!(condition.field, "Status");
    assert_eq!(condition.operator, ">");
}

#[test]
fn given_empty_options_when_setting_any_field_then_accepted() {
    let mut editor = RuleEditor::new(EditorOptions::new(vec![], vec![]));
    let id = editor.add_branch(BranchKind::If).unwrap();
    let root = editor.branch(id).unwrap().root().unwrap();
    let leaf = editor.add_condition(root, ConditionData::default()).unwrap();

    assert!(editor.set_field(leaf, "Anything").unwrap());
    assert!(editor.set_operator(leaf, "between").unwrap());
}

// ============================================================
// Validation
// ============================================================

#[test]
fn given_complete_rule_when_validating_then_true() {
    let (mut editor, _) = if_editor();
    let else_id = editor.add_branch(BranchKind::Else).unwrap();
    editor.set_action_value(else_id, "Low").unwrap();

    assert!(editor.validate());
}

#[rstest]
#[case("", "=", "5")]
#[case("Amount", "", "5")]
#[case("Amount", "=", "   ")]
fn given_incomplete_leaf_when_validating_then_false(
    #[case] field: &str,
    #[case] op: &str,
    #[case] value: &str,
) {
    let (mut editor, root) = if_editor();
    let leaf = editor.add_condition(root, complete(field, op, value)).unwrap();

    assert!(!editor.validate());
    let report = editor.validation_report();
    assert_eq!(report.invalid_nodes, vec![leaf, root]);
}

#[test]
fn given_blank_action_when_validating_then_false() {
    let (mut editor, _) = if_editor();
    let branch = editor.branches()[0].id();
    editor.set_action_value(branch, "  ").unwrap();

    let report = editor.validation_report();

    assert!(!report.is_valid());
    assert_eq!(report.blank_actions, vec![branch]);
}

#[test]
fn given_empty_root_group_when_validating_then_vacuously_true() {
    let mut editor = RuleEditor::default();
    let id = editor.add_branch(BranchKind::If).unwrap();
    editor.set_action_value(id, "High").unwrap();

    assert!(editor.validate());
}

#[test]
fn given_invalid_nested_rule_when_validating_then_parent_invalid() {
    let (mut editor, _) = if_editor();
    let branch = editor.branches()[0].id();
    editor.add_nested_editor(branch).unwrap();
    let nested = editor.nested_editor_mut(branch).unwrap();
    nested.add_branch(BranchKind::If).unwrap();

    let report = editor.validation_report();

    assert!(!report.is_valid());
    assert_eq!(report.nested.len(), 1);
    assert_eq!(report.nested[0].0, branch);

    editor.remove_nested_editor(branch).unwrap();
    assert!(editor.validate());
}

#[test]
fn given_nested_editor_when_adding_nodes_then_registries_independent() {
    let (mut editor, _) = if_editor();
    let branch = editor.branches()[0].id();
    let outer_count = editor.node_count();
    editor.add_nested_editor(branch).unwrap();

    let nested = editor.nested_editor_mut(branch).unwrap();
    let id = nested.add_branch(BranchKind::If).unwrap();
    let root = nested.branch(id).unwrap().root().unwrap();
    nested.add_condition(root, ConditionData::default()).unwrap();

    assert_eq!(editor.node_count(), outer_count);
    assert_eq!(editor.nested_editor(branch).unwrap().node_count(), 2);
}

// ============================================================
// Notifications
// ============================================================

#[test]
fn given_subscriber_when_editing_then_events_in_mutation_order() {
    let events: Rc<RefCell<Vec<ModelEvent>>> = Rc::default();
    let sink = Rc::clone(&events);
    let mut editor = RuleEditor::default();
    editor.subscribe(move |e: &ModelEvent| sink.borrow_mut().push(e.clone()));

    let branch = editor.add_branch(BranchKind::If).unwrap();
    let root = editor.branch(branch).unwrap().root().unwrap();
    let leaf = editor.add_condition(root, ConditionData::default()).unwrap();
    editor.set_value(leaf, "5").unwrap();
    editor.remove_item(root, leaf).unwrap();

    let events = events.borrow();
    assert!(matches!(events.first(), Some(ModelEvent::BranchAdded { .. })));
    assert!(events.contains(&ModelEvent::NodeAdded { parent: root, node: leaf }));
    assert!(events.contains(&ModelEvent::NodeChanged { node: leaf }));
    assert_eq!(
        events.last(),
        Some(&ModelEvent::NodeRemoved { parent: root, node: leaf })
    );
}
