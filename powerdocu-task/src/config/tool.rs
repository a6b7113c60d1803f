//! Task inputs forwarded to PowerDocu.

use crate::errors::TaskError;
use crate::host::{LogLevel, TaskHost};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to document and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOptions {
    /// File or folder with the flows and apps to document.
    pub items_to_document: PathBuf,
    /// Where documentation is written.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Produce Markdown output.
    #[serde(default, rename = "markDown")]
    pub markdown: bool,
    /// Produce Word output.
    #[serde(default)]
    pub word: bool,
    /// Only document changes from default values.
    #[serde(default)]
    pub changes_only: bool,
    /// Document default values.
    #[serde(default)]
    pub default_values: bool,
    /// Sort flows by name.
    #[serde(default)]
    pub sort_flows_by_name: bool,
    /// Word template to use.
    #[serde(default)]
    pub word_template: Option<PathBuf>,
}

impl ToolOptions {
    /// Creates options documenting `items_to_document` with every flag off.
    pub fn new(items_to_document: impl Into<PathBuf>) -> Self {
        Self {
            items_to_document: items_to_document.into(),
            ..Self::default()
        }
    }

    /// Fails when the required input is missing or names no existing path.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.items_to_document.as_os_str().is_empty() {
            return Err(TaskError::config("input 'itemsToDocument' is required"));
        }
        if !self.items_to_document.exists() {
            return Err(TaskError::config(format!(
                "input 'itemsToDocument' not found: {}",
                self.items_to_document.display()
            )));
        }
        Ok(())
    }

    /// Arguments passed to `PowerDocu.CLI.exe`.
    ///
    /// Boolean flags are appended only when set; path options only when
    /// non-empty.
    #[must_use]
    pub fn tool_arguments(&self) -> Vec<String> {
        let mut args = vec!["-p".to_string(), self.items_to_document.display().to_string()];

        if let Some(output) = non_empty(self.output_path.as_ref()) {
            args.push("-o".to_string());
            args.push(output);
        }

        let flags = [
            (self.markdown, "-m"),
            (self.word, "-w"),
            (self.changes_only, "-c"),
            (self.default_values, "-d"),
            (self.sort_flows_by_name, "-s"),
        ];
        args.extend(flags.iter().filter(|(set, _)| *set).map(|(_, flag)| (*flag).to_string()));

        if let Some(template) = non_empty(self.word_template.as_ref()) {
            args.push("-t".to_string());
            args.push(template);
        }

        args
    }

    /// Echoes every input to the host before the tool starts.
    pub fn log_inputs(&self, host: &dyn TaskHost) {
        let display = |p: Option<&PathBuf>| non_empty(p).unwrap_or_default();
        let lines = [
            format!("itemsToDocument={}", self.items_to_document.display()),
            format!("outputPath={}", display(self.output_path.as_ref())),
            format!("markDown={}", self.markdown),
            format!("word={}", self.word),
            format!("changesOnly={}", self.changes_only),
            format!("defaultValues={}", self.default_values),
            format!("sortFlowsByName={}", self.sort_flows_by_name),
            format!("wordTemplate={}", display(self.word_template.as_ref())),
        ];
        for line in &lines {
            host.log(LogLevel::Command, line);
        }
    }
}

fn non_empty(path: Option<&PathBuf>) -> Option<String> {
    path.filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.display().to_string())
}
