//! Report extraction
//!
//! Turns the raw report JSON into cleaned [`Section`]s and collects the
//! corpus ids that need DOIs.

use crate::error::{CiteError, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

/// Max table rows shown in the preview
const TABLE_PREVIEW_ROWS: usize = 5;

/// `<Paper corpusId="..." paperTitle="(Author, Year)" isShortName></Paper>`
static PAPER_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<Paper[^>]*paperTitle="([^"]+)"[^>]*></Paper>"#).unwrap()
});

static ANY_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Report document as written by the report generator
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReport {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub sections: Vec<RawSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSection {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub table: Option<Table>,
    #[serde(default)]
    pub citations: Vec<RawCitation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCitation {
    /// Either a JSON string or a number in the wild
    #[serde(rename = "corpusId", default)]
    pub corpus_id: Option<Value>,
    /// Display label, e.g. "(Smith et al., 2021)"
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub paper: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub columns: Vec<Value>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub id: Option<Value>,
    /// Usually a string, but numbers and other JSON values show up too
    #[serde(rename = "displayValue", default)]
    pub display_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Citation {
    pub corpus_id: String,
    pub display: String,
    pub paper: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub text: String,
    pub table: Option<Table>,
    pub citations: Vec<Citation>,
}

impl RawReport {
    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or("No query found")
    }
}

/// Read and parse a report file
pub fn load_report(path: &Path) -> Result<RawReport> {
    if !path.exists() {
        return Err(CiteError::ReportNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| CiteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CiteError::ReportParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace inline `<Paper>` citations with their label, drop any other
/// markup and normalize whitespace.
pub fn clean_text(text: &str) -> String {
    let text = PAPER_TAG_REGEX.replace_all(text, "$1");
    let text = ANY_TAG_REGEX.replace_all(&text, "");
    let text = WHITESPACE_REGEX.replace_all(&text, " ");
    text.trim().to_string()
}

fn corpus_id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn label_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Text for a table cell: strings unquoted, null as `N/A`, anything else as JSON
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl RawCitation {
    /// Citations without both a corpus id and a display label are dropped
    fn normalize(&self) -> Option<Citation> {
        let corpus_id = self.corpus_id.as_ref().and_then(corpus_id_string)?;
        let display = self.id.as_ref().and_then(label_string)?;
        Some(Citation {
            corpus_id,
            display,
            paper: self
                .paper
                .clone()
                .unwrap_or_else(|| Value::Object(Default::default())),
        })
    }
}

pub fn extract_sections(report: &RawReport) -> Vec<Section> {
    report
        .sections
        .iter()
        .map(|raw| Section {
            title: raw
                .title
                .clone()
                .unwrap_or_else(|| "Untitled Section".to_string()),
            text: clean_text(raw.text.as_deref().unwrap_or("")),
            table: raw.table.clone(),
            citations: raw.citations.iter().filter_map(RawCitation::normalize).collect(),
        })
        .collect()
}

/// All corpus ids cited anywhere in the report, deduplicated
pub fn unique_corpus_ids(sections: &[Section]) -> BTreeSet<String> {
    sections
        .iter()
        .flat_map(|s| s.citations.iter())
        .map(|c| c.corpus_id.clone())
        .collect()
}

/// Short text preview of a section table
pub fn format_table(table: &Table) -> Vec<String> {
    let mut lines = Vec::new();

    let title = table.title.as_deref().unwrap_or("Table");
    if !title.is_empty() {
        lines.push(format!("TABLE: {}", title));
        lines.push(String::new());
    }

    if table.columns.is_empty() || table.rows.is_empty() {
        lines.push("(Table data structure not fully populated)".to_string());
        return lines;
    }

    lines.push("Table Contents:".to_string());
    for row in table.rows.iter().take(TABLE_PREVIEW_ROWS) {
        lines.push(format!("  • {}", cell_text(row.display_value.as_ref())));
    }

    if table.rows.len() > TABLE_PREVIEW_ROWS {
        lines.push(format!(
            "  ... and {} more rows",
            table.rows.len() - TABLE_PREVIEW_ROWS
        ));
    }

    lines
}
