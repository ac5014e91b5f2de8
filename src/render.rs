//! Two-column text report
//!
//! Left: query and section bodies, justified. Right: the alphabetical
//! reference list with DOI links.

use crate::cache::DoiCache;
use crate::layout::{pad_right, wrap_text};
use crate::report::{format_table, Section};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub display_name: String,
    pub doi: Option<String>,
}

impl Reference {
    pub fn line(&self) -> String {
        match &self.doi {
            Some(doi) => format!("{} -> https://doi.org/{}", self.display_name, doi),
            None => format!("{} -> NO DOI FOUND", self.display_name),
        }
    }
}

/// Column geometry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub left_width: usize,
    pub right_width: usize,
    pub delimiter: String,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            left_width: 95,
            right_width: 80,
            delimiter: " | ".to_string(),
        }
    }
}

/// One reference per display name, first occurrence wins, sorted by name.
pub fn collect_references(sections: &[Section], cache: &DoiCache) -> Vec<Reference> {
    let mut seen = HashSet::new();
    let mut refs: Vec<Reference> = sections
        .iter()
        .flat_map(|s| s.citations.iter())
        .filter(|c| seen.insert(c.display.as_str()))
        .map(|c| Reference {
            display_name: c.display.clone(),
            doi: cache.doi(&c.corpus_id).map(str::to_string),
        })
        .collect();
    refs.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    refs
}

pub fn left_column(query: &str, sections: &[Section], width: usize) -> Vec<String> {
    let double = "=".repeat(width);
    let single = "-".repeat(width);
    // Leave one column of slack before the delimiter
    let text_width = width.saturating_sub(1);

    let mut lines = vec![double.clone(), "RESEARCH QUERY".to_string(), double.clone()];
    lines.extend(wrap_text(query, text_width, false));
    lines.push(double.clone());

    for section in sections {
        lines.push(single.clone());
        lines.push(format!("SECTION: {}", section.title));
        lines.push(single.clone());
        lines.push(String::new());

        if !section.text.is_empty() {
            lines.extend(wrap_text(&section.text, text_width, true));
            lines.push(String::new());
        }

        if let Some(table) = &section.table {
            lines.push(String::new());
            lines.extend(format_table(table));
            lines.push(String::new());
        }
    }

    lines.push(double);
    lines
}

pub fn right_column(references: &[Reference], width: usize) -> Vec<String> {
    let rule = "=".repeat(width);
    let mut lines = vec![
        rule.clone(),
        String::new(),
        rule.clone(),
        String::new(),
        rule.clone(),
        "REFERENCES (Alphabetical)".to_string(),
        rule.clone(),
    ];
    lines.extend(references.iter().map(Reference::line));
    lines.push(rule);
    lines
}

/// Zip the columns line by line. The left column is padded to `left_width`
/// (longer lines overflow, nothing is cut); the right column is written as
/// is. The shorter column is filled with empty lines.
pub fn combine_columns(left: &[String], right: &[String], left_width: usize, delimiter: &str) -> String {
    let rows = left.len().max(right.len());
    let mut out = String::new();
    for i in 0..rows {
        let l = left.get(i).map(String::as_str).unwrap_or("");
        let r = right.get(i).map(String::as_str).unwrap_or("");
        out.push_str(&pad_right(l, left_width));
        out.push_str(delimiter);
        out.push_str(r);
        out.push('\n');
    }
    out
}

/// Full report text, ready to be written to disk
pub fn render_report(query: &str, sections: &[Section], cache: &DoiCache, layout: &ColumnLayout) -> String {
    let references = collect_references(sections, cache);
    let left = left_column(query, sections, layout.left_width);
    let right = right_column(&references, layout.right_width);
    combine_columns(&left, &right, layout.left_width, &layout.delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Citation, Table, TableRow};
    use serde_json::Value;

    fn citation(id: &str, display: &str) -> Citation {
        Citation {
            corpus_id: id.to_string(),
            display: display.to_string(),
            paper: Value::Null,
        }
    }

    fn section(title: &str, text: &str, citations: Vec<Citation>) -> Section {
        Section {
            title: title.to_string(),
            text: text.to_string(),
            table: None,
            citations,
        }
    }

    #[test]
    fn test_reference_lines() {
        let found = Reference { display_name: "(A, 2020)".into(), doi: Some("10.1/x".into()) };
        let missing = Reference { display_name: "(B, 2021)".into(), doi: None };
        assert_eq!(found.line(), "(A, 2020) -> https://doi.org/10.1/x");
        assert_eq!(missing.line(), "(B, 2021) -> NO DOI FOUND");
    }

    #[test]
    fn test_collect_references_sorted_and_first_seen() {
        let mut cache = DoiCache::new("unused.json");
        cache.insert("1", Some("10.1/first".to_string()));
        cache.insert("2", Some("10.1/second".to_string()));
        cache.insert("3", None);

        let sections = vec![
            section("One", "", vec![citation("3", "(Zed, 2001)"), citation("1", "(Same, 2020)")]),
            section("Two", "", vec![citation("2", "(Same, 2020)"), citation("3", "(Zed, 2001)")]),
        ];

        let refs = collect_references(&sections, &cache);
        assert_eq!(
            refs,
            vec![
                Reference { display_name: "(Same, 2020)".into(), doi: Some("10.1/first".into()) },
                Reference { display_name: "(Zed, 2001)".into(), doi: None },
            ]
        );
    }

    #[test]
    fn test_sort_is_case_sensitive() {
        let cache = DoiCache::new("unused.json");
        let sections = vec![section("S", "", vec![citation("1", "(b)"), citation("2", "(B)")])];
        let names: Vec<_> = collect_references(&sections, &cache)
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        assert_eq!(names, vec!["(B)", "(b)"]);
    }

    #[test]
    fn test_left_column_structure() {
        let mut s = section("Background", "short body", vec![]);
        s.table = Some(Table {
            title: Some("T".into()),
            columns: vec![Value::Null],
            rows: vec![TableRow { id: None, display_value: Some(Value::from("r")) }],
        });
        let lines = left_column("the query", &[s], 20);

        assert_eq!(lines[0], "=".repeat(20));
        assert_eq!(lines[1], "RESEARCH QUERY");
        assert_eq!(lines[3], "the query");
        assert_eq!(lines[4], "=".repeat(20));
        assert_eq!(lines[5], "-".repeat(20));
        assert_eq!(lines[6], "SECTION: Background");
        assert_eq!(lines[8], "");
        // Last line of a section body stays unjustified
        assert_eq!(lines[9], "short body");
        assert_eq!(lines[10], "");
        assert_eq!(lines[11], "");
        assert_eq!(lines[12], "TABLE: T");
        assert_eq!(lines.last().unwrap(), &"=".repeat(20));
    }

    #[test]
    fn test_left_column_skips_empty_text() {
        let lines = left_column("q", &[section("Empty", "", vec![])], 10);
        // header(3) + query(1) + rule(1) + section header(4) + closing rule(1)
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn test_combine_columns_pads_shorter_side() {
        let left = vec!["ab".to_string()];
        let right = vec!["x".to_string(), "y".to_string()];
        assert_eq!(combine_columns(&left, &right, 4, " | "), "ab   | x\n     | y\n");
    }

    #[test]
    fn test_combine_columns_keeps_long_left() {
        let left = vec!["abcdefgh".to_string()];
        assert_eq!(combine_columns(&left, &[], 4, " | "), "abcdefgh | \n");
    }

    #[test]
    fn test_long_words_and_titles_survive_rendering() {
        let url = format!("https://example.org/{}", "a".repeat(120));
        let title = format!("A very long section title {}", "t".repeat(100));
        let mut s = section(&title, &format!("see {} for details", url), vec![]);
        s.table = Some(Table {
            title: None,
            columns: vec![Value::Null],
            rows: vec![TableRow { id: None, display_value: Some(Value::String("v".repeat(110))) }],
        });

        let out = render_report("q", &[s], &DoiCache::new("unused.json"), &ColumnLayout::default());
        assert!(out.contains(&url));
        assert!(out.contains(&format!("SECTION: {}", title)));
        assert!(out.contains(&"v".repeat(110)));
    }

    #[test]
    fn test_render_report_line_count_and_widths() {
        let mut cache = DoiCache::new("unused.json");
        cache.insert("1", Some("10.1/x".to_string()));
        let text = "word ".repeat(100);
        let sections = vec![section("S", text.trim(), vec![citation("1", "(A, 2020)")])];

        let out = render_report("q", &sections, &cache, &ColumnLayout::default());
        for line in out.lines() {
            assert_eq!(&line[95..98], " | ", "bad row {:?}", line);
        }
        assert!(out.contains(" | (A, 2020) -> https://doi.org/10.1/x\n"));
    }
}
