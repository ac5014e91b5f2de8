//! Persistent DOI cache
//!
//! The cache file is a flat JSON object `{corpus_id: doi | null}`. A `null`
//! value means the id was looked up and no DOI exists; ids that were never
//! looked up are simply absent.

use crate::error::{CiteError, Result};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const DOI_URL_PREFIX: &str = "https://doi.org/";
const NO_DOI_MARKER: &str = "NO DOI FOUND";

/// `(Author, Year) -> doi`
static LEGACY_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\([^)]+\))\s*->\s*(.+)$").unwrap());

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoiCache {
    entries: BTreeMap<String, Option<String>>,
    path: PathBuf,
}

impl DoiCache {
    /// Empty cache that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            entries: BTreeMap::new(),
            path: path.into(),
        }
    }

    /// Load the cache from `path`. A missing file is an empty cache; so is
    /// one that fails to parse, which then gets overwritten on the next save.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut cache = Self::new(path.clone());

        if !path.exists() {
            debug!("No DOI cache at {}, starting empty", path.display());
            return cache;
        }

        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<BTreeMap<String, Option<String>>>(&content)
                    .map_err(|e| e.to_string())
            });

        match parsed {
            Ok(entries) => {
                info!("Loaded {} cached DOI lookups from {}", entries.len(), path.display());
                cache.entries = entries;
            }
            Err(e) => {
                warn!("Could not read cache file {} ({}), starting fresh", path.display(), e);
            }
        }
        cache
    }

    /// Replace the cache file with the full current contents.
    ///
    /// The JSON goes to a temp file in the same directory first and is then
    /// renamed over the cache file, so the old file stays whole until the
    /// new one is complete.
    pub fn save(&self) -> Result<()> {
        let write_err = |source: std::io::Error| CiteError::Write {
            path: self.path.clone(),
            source,
        };

        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| write_err(std::io::Error::other(e)))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!("Saved {} entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, corpus_id: &str) -> bool {
        self.entries.contains_key(corpus_id)
    }

    /// DOI for a cached id. `None` both for "not cached" and "no DOI";
    /// use [`DoiCache::contains`] to tell them apart.
    pub fn doi(&self, corpus_id: &str) -> Option<&str> {
        self.entries.get(corpus_id).and_then(|d| d.as_deref())
    }

    pub fn insert(&mut self, corpus_id: impl Into<String>, doi: Option<String>) {
        self.entries.insert(corpus_id.into(), doi);
    }

    /// Insert only if the id is not cached yet. Returns whether it was inserted.
    pub fn fill_gap(&mut self, corpus_id: &str, doi: Option<String>) -> bool {
        if self.entries.contains_key(corpus_id) {
            return false;
        }
        self.entries.insert(corpus_id.to_string(), doi);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse one legacy line into `(display_label, doi)`.
///
/// Accepts bare `(Label) -> doi` lines and rows of a previously rendered
/// two-column report, where the reference sits after the last `" | "`.
pub fn parse_legacy_line(line: &str) -> Option<(String, Option<String>)> {
    let line = line.rsplit(" | ").next().unwrap_or(line).trim();
    if !line.contains("->") {
        return None;
    }

    let caps = LEGACY_LINE_REGEX.captures(line)?;
    let label = caps.get(1)?.as_str().trim().to_string();
    let value = caps.get(2)?.as_str().trim();

    let doi = if value == NO_DOI_MARKER {
        None
    } else {
        let doi = value.strip_prefix(DOI_URL_PREFIX).unwrap_or(value);
        Some(doi.to_string())
    };
    Some((label, doi))
}

/// Read a legacy `(Label) -> doi` file. A missing or unreadable file gives
/// an empty map; the import is optional.
pub fn load_legacy_map(path: &Path) -> HashMap<String, Option<String>> {
    let mut map = HashMap::new();
    if !path.exists() {
        return map;
    }

    info!("Found existing citation file: {}", path.display());
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Could not read legacy file {} ({}), skipping import", path.display(), e);
            return map;
        }
    };

    for (label, doi) in content.lines().filter_map(parse_legacy_line) {
        map.insert(label, doi);
    }

    info!("Loaded {} citations from {}", map.len(), path.display());
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_keeps_null_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doi_cache.json");

        let mut cache = DoiCache::new(&path);
        cache.insert("1", Some("10.1/x".to_string()));
        cache.insert("2", None);
        cache.save().unwrap();

        let loaded = DoiCache::load(&path);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.doi("1"), Some("10.1/x"));
        assert!(loaded.contains("2"));
        assert_eq!(loaded.doi("2"), None);
        assert!(!loaded.contains("3"));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"2\": null"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = DoiCache::load(dir.path().join("nope.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_malformed_file_is_empty_and_rebuilt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doi_cache.json");
        fs::write(&path, "{ this is not json").unwrap();

        let mut cache = DoiCache::load(&path);
        assert!(cache.is_empty());

        cache.insert("7", Some("10.7/z".to_string()));
        cache.save().unwrap();
        assert_eq!(DoiCache::load(&path).doi("7"), Some("10.7/z"));
    }

    #[test]
    fn test_save_replaces_file_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doi_cache.json");
        fs::write(&path, r#"{"old": "10.9/old", "gone": null}"#).unwrap();

        let mut cache = DoiCache::load(&path);
        cache.insert("new", Some("10.1/new".to_string()));
        cache.save().unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("doi_cache.json")]);

        let reloaded = DoiCache::load(&path);
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.doi("new"), Some("10.1/new"));
        assert_eq!(reloaded.doi("old"), Some("10.9/old"));
    }

    #[test]
    fn test_failed_save_cleans_up_temp_file() {
        let dir = TempDir::new().unwrap();
        let other = dir.path().join("doi_cache.json");
        fs::write(&other, r#"{"1": "10.1/x"}"#).unwrap();

        // A directory at the target makes the final rename fail
        let blocked = dir.path().join("blocked.json");
        fs::create_dir(&blocked).unwrap();
        let mut cache = DoiCache::new(&blocked);
        cache.insert("2", None);
        assert!(matches!(cache.save(), Err(CiteError::Write { .. })));

        assert!(blocked.is_dir());
        assert_eq!(fs::read_to_string(&other).unwrap(), r#"{"1": "10.1/x"}"#);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_fill_gap_never_overwrites() {
        let mut cache = DoiCache::new("unused.json");
        cache.insert("5", Some("10.1/a".to_string()));
        cache.insert("6", None);

        assert!(!cache.fill_gap("5", Some("10.1/b".to_string())));
        assert!(!cache.fill_gap("6", Some("10.1/c".to_string())));
        assert!(cache.fill_gap("8", Some("10.1/d".to_string())));

        assert_eq!(cache.doi("5"), Some("10.1/a"));
        assert_eq!(cache.doi("6"), None);
        assert_eq!(cache.doi("8"), Some("10.1/d"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_parse_legacy_line_plain() {
        assert_eq!(
            parse_legacy_line("(Smith et al., 2021) -> 10.1000/xyz"),
            Some(("(Smith et al., 2021)".to_string(), Some("10.1000/xyz".to_string())))
        );
    }

    #[test]
    fn test_parse_legacy_line_rendered_row() {
        let row = format!("{:<95} | (Lee, 2019) -> https://doi.org/10.5/abc", "some body text");
        assert_eq!(
            parse_legacy_line(&row),
            Some(("(Lee, 2019)".to_string(), Some("10.5/abc".to_string())))
        );
        assert_eq!(
            parse_legacy_line("(Kim, 2018) -> NO DOI FOUND"),
            Some(("(Kim, 2018)".to_string(), None))
        );
    }

    #[test]
    fn test_parse_legacy_line_rejects_noise() {
        assert_eq!(parse_legacy_line(""), None);
        assert_eq!(parse_legacy_line("REFERENCES (Alphabetical)"), None);
        assert_eq!(parse_legacy_line("Smith -> 10.1/x"), None);
    }

    #[test]
    fn test_load_legacy_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trialreport.txt");
        fs::write(&path, "(A, 2020) -> 10.1/a\n\njunk line\n(B, 2021) -> NO DOI FOUND\n").unwrap();

        let map = load_legacy_map(&path);
        assert_eq!(map.len(), 2);
        assert_eq!(map["(A, 2020)"], Some("10.1/a".to_string()));
        assert_eq!(map["(B, 2021)"], None);

        assert!(load_legacy_map(&dir.path().join("missing.txt")).is_empty());
    }

    #[test]
    fn test_unreadable_legacy_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        // Exists, but reading a directory fails
        assert!(load_legacy_map(dir.path()).is_empty());
    }
}
