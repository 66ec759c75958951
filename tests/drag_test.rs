//! Integration tests for drag sessions: projection, commit and forbidden drops.

use rulebuilder::domain::{
    BranchKind, ConditionData, DragHover, DropOutcome, DropRefusal, GroupData, Logic, NodeId,
    Placement, RuleEditor,
};
use rulebuilder::util::testing;

struct Fixture {
    editor: RuleEditor,
    root: NodeId,
    a: NodeId,
    b: NodeId,
    group: NodeId,
    inner: NodeId,
    sub: NodeId,
}

/// root(AND)[a, b, group(OR)[inner, sub(AND)[]]]
fn fixture() -> Fixture {
    let mut editor = RuleEditor::default();
    let id = editor.add_branch(BranchKind::If).unwrap();
    let root = editor.branch(id).unwrap().root().unwrap();
    let a = editor
        .add_condition(root, ConditionData::new("Amount", ">", "1"))
        .unwrap();
    let b = editor
        .add_condition(root, ConditionData::new("Amount", "<", "9"))
        .unwrap();
    let group = editor.add_group(root, GroupData::with_logic(Logic::Or)).unwrap();
    let inner = editor
        .add_condition(group, ConditionData::new("Status", "=", "Open"))
        .unwrap();
    let sub = editor.add_group(group, GroupData::default()).unwrap();
    Fixture {
        editor,
        root,
        a,
        b,
        group,
        inner,
        sub,
    }
}

fn structure(editor: &RuleEditor) -> Vec<(NodeId, Option<NodeId>, Vec<NodeId>)> {
    let root = editor.branches()[0].root().unwrap();
    editor
        .nodes()
        .iter(root)
        .map(|(id, n)| (id, n.parent, n.children.clone()))
        .collect()
}

#[test]
fn given_leaf_when_dropped_on_other_group_then_moved_once_and_count_kept() {
    testing::init_test_setup();
    let mut f = fixture();
    let count = f.editor.node_count();

    let mut session = f.editor.start_drag(f.a).unwrap();
    assert!(f.editor.drag_over(&mut session, f.group, DragHover::Empty));
    let outcome = f.editor.drop_on(session, f.group);

    assert_eq!(
        outcome,
        DropOutcome::Moved {
            node: f.a,
            from: f.root,
            to: f.group,
            index: 2
        }
    );
    assert_eq!(f.editor.nodes().children(f.root), &[f.b, f.group]);
    assert_eq!(f.editor.nodes().children(f.group), &[f.inner, f.sub, f.a]);
    assert_eq!(f.editor.nodes().parent(f.a), Some(f.group));
    assert_eq!(f.editor.node_count(), count);
    assert_eq!(f.editor.dragging(), None);
}

#[test]
fn given_projection_before_item_when_dropped_then_inserted_at_projected_index() {
    let mut f = fixture();

    let mut session = f.editor.start_drag(f.b).unwrap();
    let hover = DragHover::Item {
        item: f.inner,
        placement: Placement::from_pointer(10.0, 8.0, 20.0),
    };
    assert!(f.editor.drag_over(&mut session, f.group, hover));
    // projection does not touch the tree
    assert_eq!(f.editor.nodes().parent(f.b), Some(f.root));

    f.editor.drop_on(session, f.group);

    assert_eq!(f.editor.nodes().children(f.group), &[f.b, f.inner, f.sub]);
}

#[test]
fn given_same_group_when_reordered_after_item_then_order_follows_projection() {
    let mut f = fixture();

    let mut session = f.editor.start_drag(f.a).unwrap();
    let hover = DragHover::Item {
        item: f.b,
        placement: Placement::After,
    };
    assert!(f.editor.drag_over(&mut session, f.root, hover));
    let outcome = f.editor.drop_on(session, f.root);

    assert!(outcome.is_moved());
    assert_eq!(f.editor.nodes().children(f.root), &[f.b, f.a, f.group]);
}

#[test]
fn given_group_when_dropped_on_itself_then_refused_and_unchanged() {
    let mut f = fixture();
    let before = structure(&f.editor);

    let session = f.editor.start_drag(f.group).unwrap();
    let outcome = f.editor.drop_on(session, f.group);

    assert_eq!(
        outcome,
        DropOutcome::Refused(DropRefusal::IntoSelfOrDescendant)
    );
    assert_eq!(structure(&f.editor), before);
    assert_eq!(f.editor.dragging(), None);
}

#[test]
fn given_group_when_dropped_on_descendant_then_refused_and_unchanged() {
    let mut f = fixture();
    let before = structure(&f.editor);

    let mut session = f.editor.start_drag(f.group).unwrap();
    assert!(!f.editor.drag_over(&mut session, f.sub, DragHover::Empty));
    let outcome = f.editor.drop_on(session, f.sub);

    assert_eq!(
        outcome,
        DropOutcome::Refused(DropRefusal::IntoSelfOrDescendant)
    );
    assert_eq!(structure(&f.editor), before);
}

#[test]
fn given_leaf_target_when_dropped_then_refused() {
    let mut f = fixture();

    let session = f.editor.start_drag(f.inner).unwrap();
    let outcome = f.editor.drop_on(session, f.a);

    assert_eq!(outcome, DropOutcome::Refused(DropRefusal::TargetNotAGroup));
    assert_eq!(f.editor.nodes().parent(f.inner), Some(f.group));
}

#[test]
fn given_root_group_when_starting_drag_then_refused() {
    let mut f = fixture();
    assert!(f.editor.start_drag(f.root).is_none());
    assert_eq!(f.editor.dragging(), None);
}

#[test]
fn given_superseded_session_when_dropped_then_stale() {
    let mut f = fixture();

    let first = f.editor.start_drag(f.a).unwrap();
    let second = f.editor.start_drag(f.b).unwrap();
    assert_eq!(f.editor.dragging(), Some(f.b));

    let outcome = f.editor.drop_on(first, f.group);
    assert_eq!(outcome, DropOutcome::Refused(DropRefusal::StaleSession));
    assert_eq!(f.editor.dragging(), Some(f.b));

    f.editor.cancel_drag(second);
    assert_eq!(f.editor.dragging(), None);
    assert_eq!(f.editor.nodes().parent(f.a), Some(f.root));
}

#[test]
fn given_dragged_node_removed_when_dropping_then_stale_and_pointer_cleared() {
    let mut f = fixture();

    let session = f.editor.start_drag(f.inner).unwrap();
    f.editor.remove_item(f.group, f.inner).unwrap();
    assert_eq!(f.editor.dragging(), None);

    let outcome = f.editor.drop_on(session, f.root);
    assert_eq!(outcome, DropOutcome::Refused(DropRefusal::StaleSession));
}

#[test]
fn given_group_when_moved_into_sibling_group_then_subtree_follows() {
    let mut f = fixture();
    let target = f.editor.add_group(f.root, GroupData::default()).unwrap();
    let count = f.editor.node_count();

    let session = f.editor.start_drag(f.group).unwrap();
    assert!(f.editor.drop_on(session, target).is_moved());

    assert_eq!(f.editor.nodes().children(target), &[f.group]);
    assert_eq!(f.editor.nodes().parent(f.sub), Some(f.group));
    assert_eq!(f.editor.nodes().depth(f.root), 4);
    assert_eq!(f.editor.node_count(), count);
}
