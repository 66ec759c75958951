//! Rule document service
//!
//! Loads, checks, edits and writes rule documents through the filesystem boundary.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{
    ActionDoc, BranchDoc, BranchId, BranchKind, EditorOptions, NodeId, RuleEditor,
    RuleTreeConvert, ValidationReport,
};
use crate::infrastructure::traits::FileSystem;

/// Result of checking a rule document.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub report: ValidationReport,
    /// Branches in document order
    pub branches: Vec<(BranchId, BranchKind)>,
    /// Invalid nodes with their rendered form
    pub invalid_nodes: Vec<(NodeId, String)>,
    /// Condition nodes of the top-level editor
    pub node_count: usize,
}

impl CheckOutcome {
    pub fn is_valid(&self) -> bool {
        self.report.is_valid()
    }
}

/// Service for reading and writing rule documents.
pub struct RuleService {
    fs: Arc<dyn FileSystem>,
    options: EditorOptions,
    pretty: bool,
}

impl RuleService {
    /// Create a new rule service.
    pub fn new(fs: Arc<dyn FileSystem>, options: EditorOptions, pretty: bool) -> Self {
        Self {
            fs,
            options,
            pretty,
        }
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// Read a rule document into an editor.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<RuleEditor> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::RuleFileNotFound(path.to_path_buf()));
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read rule file", path)?;
        let editor = RuleEditor::from_json_str(&content, self.options.clone())?;
        debug!(
            "loaded {} branch(es), {} node(s)",
            editor.branches().len(),
            editor.node_count()
        );
        Ok(editor)
    }

    /// Write `editor` to `path`, creating parent directories.
    #[instrument(level = "debug", skip(self, editor))]
    pub fn save(&self, path: &Path, editor: &RuleEditor) -> ApplicationResult<()> {
        let mut json = editor.to_json_string(self.pretty)?;
        json.push('\n');
        self.fs
            .ensure_parent(path)
            .with_path_context("create parent directory", path)?;
        self.fs
            .write(path, &json)
            .with_path_context("write rule file", path)
    }

    /// Validate the document at `path`.
    pub fn check(&self, path: &Path) -> ApplicationResult<CheckOutcome> {
        let editor = self.load(path)?;
        let report = editor.validation_report();
        let invalid_nodes = report
            .invalid_nodes
            .iter()
            .filter_map(|&id| editor.nodes().get(id).map(|n| (id, n.data.to_string())))
            .collect();
        Ok(CheckOutcome {
            branches: editor
                .branches()
                .iter()
                .map(|b| (b.id(), b.kind()))
                .collect(),
            invalid_nodes,
            node_count: editor.node_count(),
            report,
        })
    }

    /// Normalized form of the document; written back when `write` is set.
    pub fn format(&self, path: &Path, write: bool) -> ApplicationResult<String> {
        let editor = self.load(path)?;
        if write {
            self.save(path, &editor)?;
        }
        Ok(editor.to_json_string(self.pretty)?)
    }

    /// Create a document holding a single IF branch.
    pub fn create(&self, path: &Path, action: Option<&str>) -> ApplicationResult<RuleEditor> {
        if self.fs.exists(path) {
            return Err(ApplicationError::RuleFileExists(path.to_path_buf()));
        }
        let mut editor = RuleEditor::new(self.options.clone());
        let mut doc = BranchDoc::new(BranchKind::If);
        doc.action = ActionDoc {
            value: action.unwrap_or_default().to_string(),
            nested: None,
        };
        editor.add_branch_from(&doc);
        self.save(path, &editor)?;
        Ok(editor)
    }

    /// Add a branch to the document. Returns `false` when sequencing refuses it.
    pub fn add_branch(
        &self,
        path: &Path,
        kind: BranchKind,
        action: Option<&str>,
    ) -> ApplicationResult<bool> {
        let mut editor = self.load(path)?;
        let Some(branch) = editor.add_branch(kind) else {
            return Ok(false);
        };
        if let Some(value) = action {
            editor.set_action_value(branch, value)?;
        }
        self.save(path, &editor)?;
        Ok(true)
    }

    /// Remove the branch at `index`. Returns the number of branches removed,
    /// including cascaded ones.
    pub fn remove_branch(&self, path: &Path, index: usize) -> ApplicationResult<usize> {
        let mut editor = self.load(path)?;
        let Some(id) = editor.branches().get(index).map(|b| b.id()) else {
            return Ok(0);
        };
        let before = editor.branches().len();
        editor.remove_branch(id);
        let removed = before - editor.branches().len();
        self.save(path, &editor)?;
        Ok(removed)
    }

    /// Render the document as a tree.
    pub fn render_tree(&self, path: &Path) -> ApplicationResult<String> {
        let editor = self.load(path)?;
        Ok(editor.to_tree_string().to_string())
    }
}
