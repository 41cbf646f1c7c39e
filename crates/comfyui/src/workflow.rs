//! Workflow template loading and patching.
//!
//! Workflows are exported ComfyUI graphs stored as JSON files, one per
//! generation variant. At submission time the graph is patched in two
//! ways:
//!
//! * node inputs whose key matches a patch entry (`width`, `steps`,
//!   `seed`, ...) get their value replaced wherever they appear;
//! * node inputs whose value is a literal `"{placeholder}"` string are
//!   substituted, but only for whitelisted placeholder names, so prompt
//!   text containing braces can never rewrite the graph.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::ComfyError;

/// Placeholder names that may appear as `"{name}"` input values.
const PLACEHOLDER_WHITELIST: &[&str] = &["positive_prompt", "negative_prompt", "init_image"];

/// Loader for workflow template files.
pub struct WorkflowTemplates {
    dir: PathBuf,
}

impl WorkflowTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load a template by file stem, e.g. `t2v` reads `t2v.json`.
    pub async fn load(&self, name: &str) -> Result<Value, ComfyError> {
        let path = self.dir.join(format!("{name}.json"));
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ComfyError::Workflow(format!("cannot read template {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            ComfyError::Workflow(format!("template {} is not valid JSON: {e}", path.display()))
        })
    }
}

/// Values to patch into a loaded workflow graph.
#[derive(Debug, Default)]
pub struct WorkflowPatch {
    /// Replacements by input key, applied to every node carrying the key.
    pub inputs: BTreeMap<String, Value>,
    /// Replacements for `"{name}"` placeholder values.
    pub placeholders: BTreeMap<String, String>,
}

/// Which patch entries were actually applied.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub applied: Vec<String>,
    pub unapplied: Vec<String>,
}

/// Patch a workflow graph in place.
///
/// The graph shape is `{"<node_id>": {"class_type": ..., "inputs":
/// {...}}, ...}`. Entries that matched nothing are reported back so
/// the caller can warn about template drift.
pub fn apply_patch(workflow: &mut Value, patch: &WorkflowPatch) -> PatchReport {
    let mut applied = std::collections::BTreeSet::new();

    if let Some(nodes) = workflow.as_object_mut() {
        for node in nodes.values_mut() {
            let Some(inputs) = node.get_mut("inputs").and_then(Value::as_object_mut) else {
                continue;
            };
            for (key, value) in inputs.iter_mut() {
                if let Some(replacement) = patch.inputs.get(key) {
                    *value = replacement.clone();
                    applied.insert(key.clone());
                    continue;
                }
                if let Some(name) = placeholder_name(value) {
                    if let Some(replacement) = patch.placeholders.get(&name) {
                        *value = Value::String(replacement.clone());
                        applied.insert(name);
                    }
                }
            }
        }
    }

    let mut report = PatchReport::default();
    for key in patch.inputs.keys().chain(patch.placeholders.keys()) {
        if applied.contains(key) {
            report.applied.push(key.clone());
        } else {
            report.unapplied.push(key.clone());
        }
    }
    report
}

/// Extract the placeholder name from a `"{name}"` value, whitelist
/// checked.
fn placeholder_name(value: &Value) -> Option<String> {
    let text = value.as_str()?;
    let inner = text.strip_prefix('{')?.strip_suffix('}')?;
    PLACEHOLDER_WHITELIST
        .contains(&inner)
        .then(|| inner.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
