//! Translation key rewriting
//!
//! Theme section schemas sometimes reference `t:sections.*` translation keys
//! that the storefront's locale files do not define, so the theme editor
//! shows the raw key. This module replaces quoted keys with literal English
//! text. It is a plain find/replace: only `"key"` and `'key'` are touched,
//! and a file is rewritten only when its content changes.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const BUILTIN_MAPPING_JSON: &str = include_str!("../resources/translations.json");

/// Default directory holding theme sections
pub const DEFAULT_SECTIONS_DIR: &str = "./sections";

/// Default template file extension
pub const DEFAULT_EXTENSION: &str = "liquid";

/// Translation key to replacement text
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct TranslationMap {
    entries: BTreeMap<String, String>,
}

static BUILTIN: OnceLock<TranslationMap> = OnceLock::new();

/// Result of rewriting one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub content: String,
    pub replacements: usize,
    changed: bool,
}

impl Rewrite {
    /// Whether the rewritten text differs from the input. A mapping whose
    /// text equals its key still counts replacements but changes nothing.
    pub fn changed(&self) -> bool {
        self.changed
    }
}

impl TranslationMap {
    /// The storefront's built-in mapping (parsed on first access)
    pub fn builtin() -> &'static Self {
        BUILTIN.get_or_init(|| {
            Self::from_json(BUILTIN_MAPPING_JSON)
                .unwrap_or_else(|e| panic!("Failed to parse embedded translation JSON: {:#}", e))
        })
    }

    /// Parse a JSON object of `"key": "text"` pairs
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Translation mapping must be a JSON object of strings")
    }

    /// Load a mapping file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mapping {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid mapping {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Replace every double- or single-quoted key with its quoted text
    pub fn rewrite(&self, content: &str) -> Rewrite {
        let mut current = content.to_string();
        let mut replacements = 0;

        for (key, value) in &self.entries {
            for quote in ['"', '\''] {
                let needle = format!("{quote}{key}{quote}");
                let count = current.matches(&needle).count();
                if count > 0 {
                    current = current.replace(&needle, &format!("{quote}{value}{quote}"));
                    replacements += count;
                }
            }
        }

        Rewrite {
            changed: current != content,
            content: current,
            replacements,
        }
    }
}

/// Outcome of processing a directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixReport {
    pub scanned: usize,
    /// Files whose content changed (or would change, in a dry run)
    pub fixed: Vec<PathBuf>,
}

/// Files directly inside `dir` with the given extension, sorted
pub fn section_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Sections directory not found: {}", dir.display());
    }

    let extension = extension.trim_start_matches('.');
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }

    if files.is_empty() {
        bail!("No .{} files found in {}", extension, dir.display());
    }

    files.sort();
    Ok(files)
}

/// Rewrite one file in place; returns whether it changed
pub fn fix_file(path: &Path, map: &TranslationMap, dry_run: bool) -> Result<bool> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let rewrite = map.rewrite(&content);
    if !rewrite.changed() {
        tracing::debug!("No changes needed in {}", path.display());
        return Ok(false);
    }

    tracing::info!(
        "{} translation keys in {}",
        rewrite.replacements,
        path.display()
    );

    if !dry_run {
        std::fs::write(path, rewrite.content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(true)
}

/// Rewrite every matching file in `dir`
///
/// `on_file` is called with each path and whether it changed.
pub fn fix_directory<F>(
    dir: &Path,
    extension: &str,
    map: &TranslationMap,
    dry_run: bool,
    mut on_file: F,
) -> Result<FixReport>
where
    F: FnMut(&Path, bool),
{
    let files = section_files(dir, extension)?;
    let mut report = FixReport::default();

    for path in files {
        let changed = fix_file(&path, map, dry_run)?;
        on_file(&path, changed);
        report.scanned += 1;
        if changed {
            report.fixed.push(path);
        }
    }

    Ok(report)
}
