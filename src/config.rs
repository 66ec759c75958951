//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/rulebuilder/rulebuilder.toml`
//! 3. Local config: `<dir>/.rulebuilder.toml`
//! 4. Environment variables: `RULEBUILDER_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{EditorOptions, FieldOption};

/// Selectable fields and operators offered to condition editors.
///
/// A field entry is either a bare value (`"Amount"`) or `"Label=value"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OptionsConfig {
    pub fields: Vec<String>,
    pub operators: Vec<String>,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        let defaults = EditorOptions::default();
        Self {
            fields: defaults
                .fields
                .iter()
                .map(|f| {
                    if f.label == f.value {
                        f.value.clone()
                    } else {
                        format!("{}={}", f.label, f.value)
                    }
                })
                .collect(),
            operators: defaults.operators,
        }
    }
}

/// Raw options config for intermediate parsing (arrays are Option to detect "not specified").
///
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawOptionsConfig {
    pub fields: Option<Vec<String>>,
    pub operators: Option<Vec<String>>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub rules_dir: Option<PathBuf>,
    pub pretty: Option<bool>,
    pub options: RawOptionsConfig,
}

impl OptionsConfig {
    /// Merge arrays with union semantics and negation support.
    ///
    /// Order of first appearance is kept, since it is the order offered to the user.
    ///
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: Vec<String> = base.to_vec();

        for item in overlay {
            match item.strip_prefix('!') {
                Some(negated) => result.retain(|r| r != negated),
                None => result.push(item.clone()),
            }
        }

        result.into_iter().unique().collect()
    }

    /// Merge overlay config onto self with union semantics.
    pub fn merge(&self, overlay: &RawOptionsConfig) -> Self {
        Self {
            fields: overlay
                .fields
                .as_ref()
                .map(|o| Self::merge_array(&self.fields, o))
                .unwrap_or_else(|| self.fields.clone()),
            operators: overlay
                .operators
                .as_ref()
                .map(|o| Self::merge_array(&self.operators, o))
                .unwrap_or_else(|| self.operators.clone()),
        }
    }

    /// Apply global config onto defaults: specified arrays REPLACE.
    pub fn apply_global(&self, global: &RawOptionsConfig) -> Self {
        Self {
            fields: global.fields.clone().unwrap_or_else(|| self.fields.clone()),
            operators: global
                .operators
                .clone()
                .unwrap_or_else(|| self.operators.clone()),
        }
    }

    pub fn to_editor_options(&self) -> EditorOptions {
        let fields = self
            .fields
            .iter()
            .map(|entry| match entry.split_once('=') {
                Some((label, value)) => FieldOption::new(label.trim(), value.trim()),
                None => FieldOption::from(entry.trim()),
            })
            .collect();
        EditorOptions::new(fields, self.operators.clone())
    }
}

/// Unified configuration for rulebuilder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory relative rule paths resolve against (default: current directory)
    pub rules_dir: PathBuf,
    /// Pretty-print written documents
    pub pretty: bool,
    /// Field and operator choices
    pub options: OptionsConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from("."),
            pretty: true,
            options: OptionsConfig::default(),
        }
    }
}

/// Get the XDG config directory for rulebuilder.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rulebuilder").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("rulebuilder.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".rulebuilder.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Resolve a rule file path against `rules_dir`.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.rules_dir.join(file)
        }
    }

    /// Expand `~`, `$VAR` and `${VAR}` in `rules_dir`.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.rules_dir.to_string_lossy().as_ref());
        self.rules_dir = PathBuf::from(expanded);
    }

    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            rules_dir: overlay
                .rules_dir
                .clone()
                .unwrap_or_else(|| self.rules_dir.clone()),
            pretty: overlay.pretty.unwrap_or(self.pretty),
            options: self.options.merge(&overlay.options),
        }
    }

    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            rules_dir: global
                .rules_dir
                .clone()
                .unwrap_or_else(|| self.rules_dir.clone()),
            pretty: global.pretty.unwrap_or(self.pretty),
            options: self.options.apply_global(&global.options),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Local: UNION with `!item` negation
    /// - Any → Env vars: REPLACE
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), local_dir)
    }

    /// Same as [`Settings::load`] with an explicit global config path.
    pub fn load_from(
        global_path: Option<&Path>,
        local_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_path {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply RULEBUILDER_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("RULEBUILDER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("options.fields")
                    .with_list_parse_key("options.operators")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("rules_dir") {
            settings.rules_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("pretty") {
            settings.pretty = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("options.fields") {
            settings.options.fields = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("options.operators") {
            settings.options.operators = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# rulebuilder configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/rulebuilder/rulebuilder.toml  (defines your baseline)
#   Local:  <dir>/.rulebuilder.toml                 (project-specific additions)
#   Env:    RULEBUILDER_* environment variables       (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global.
#   Use "!item" in local config to REMOVE an inherited item:
#     operators = ["starts_with", "!contains"]

# Directory relative rule paths resolve against
# rules_dir = "."

# Pretty-print written rule documents
# pretty = true

[options]
# Fields offered to conditions; "Label=value" sets a display label
# fields = ["Amount", "Tags.Name", "Status"]

# Comparison operators offered to conditions
# operators = ["=", "!=", ">", "<", "contains"]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
