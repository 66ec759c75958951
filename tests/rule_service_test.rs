//! Integration tests for RuleService against a real temp directory.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use rulebuilder::application::services::RuleService;
use rulebuilder::application::ApplicationError;
use rulebuilder::config::Settings;
use rulebuilder::domain::{BranchKind, DomainError, EditorOptions};
use rulebuilder::infrastructure::di::ServiceContainer;
use rulebuilder::infrastructure::traits::RealFileSystem;

fn service(pretty: bool) -> RuleService {
    RuleService::new(Arc::new(RealFileSystem), EditorOptions::default(), pretty)
}

#[test]
fn given_new_document_when_checked_then_valid_with_one_root() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rules/discount.json");
    let svc = service(true);

    svc.create(&path, Some("Gold")).unwrap();
    let outcome = svc.check(&path).unwrap();

    assert!(outcome.is_valid());
    assert_eq!(outcome.branches.len(), 1);
    assert_eq!(outcome.branches[0].1, BranchKind::If);
    assert_eq!(outcome.node_count, 1);
}

#[test]
fn given_new_document_without_action_when_checked_then_blank_action_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rule.json");
    let svc = service(true);

    svc.create(&path, None).unwrap();
    let outcome = svc.check(&path).unwrap();

    assert!(!outcome.is_valid());
    assert_eq!(outcome.report.blank_actions.len(), 1);
}

#[test]
fn given_compact_document_when_formatted_then_written_pretty() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rule.json");
    fs::write(
        &path,
        r#"{"expressions":[{"type":"IF","then":"High"}]}"#,
    )
    .unwrap();
    let svc = service(true);

    let printed = svc.format(&path, false).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        r#"{"expressions":[{"type":"IF","then":"High"}]}"#,
        "format without write leaves the file alone"
    );

    svc.format(&path, true).unwrap();
    let written = fs::read_to_string(&path).unwrap();

    assert_eq!(written, format!("{printed}\n"));
    assert!(written.contains("\"branches\""));
    assert!(written.contains("\"kind\": \"IF\""));
}

#[test]
fn given_if_elseif_else_when_removing_if_then_everything_removed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rule.json");
    let svc = service(false);
    svc.create(&path, Some("A")).unwrap();
    svc.add_branch(&path, BranchKind::ElseIf, Some("B")).unwrap();
    svc.add_branch(&path, BranchKind::Else, Some("C")).unwrap();

    assert_eq!(svc.remove_branch(&path, 0).unwrap(), 3);
    assert_eq!(svc.remove_branch(&path, 0).unwrap(), 0);

    let editor = svc.load(&path).unwrap();
    assert!(editor.branches().is_empty());
}

#[test]
fn given_document_when_rendering_tree_then_labels_shown() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rule.json");
    let svc = service(true);
    svc.create(&path, Some("High")).unwrap();
    svc.add_branch(&path, BranchKind::Else, None).unwrap();

    let tree = svc.render_tree(&path).unwrap();

    assert!(tree.contains("THEN High"));
    assert!(tree.contains("ELSE [invalid]"));
}

#[test]
fn given_broken_json_when_loading_then_invalid_document() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rule.json");
    fs::write(&path, "{ not json").unwrap();

    let err = service(true).load(&path).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidDocument(_))
    ));
}

#[test]
fn given_container_with_rules_dir_when_resolving_then_service_uses_it() {
    let temp = TempDir::new().unwrap();
    let settings = Settings {
        rules_dir: temp.path().to_path_buf(),
        ..Settings::default()
    };
    let container = ServiceContainer::new(settings);
    let path = container.settings.resolve(std::path::Path::new("a.json"));

    container.rules.create(&path, Some("X")).unwrap();

    assert!(temp.path().join("a.json").is_file());
}
