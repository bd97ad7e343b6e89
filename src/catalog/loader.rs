//! Catalog parsing and validation

use super::registry::get_body_template;
use crate::ensure::{ResourceKind, ResourceSpec};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// A validated catalog: handles are non-empty and unique, titles non-empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub kind: ResourceKind,
    pub resources: Vec<ResourceSpec>,
}

/// On-disk syntax of a catalog file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Json,
    Yaml,
}

impl CatalogFormat {
    /// Guess from the file extension; anything but `.yaml`/`.yml` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    handle: String,
    title: String,
    #[serde(default)]
    body: Option<String>,
    /// Name of an embedded body template, instead of an inline body
    #[serde(default)]
    body_template: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(flatten)]
    kind: ResourceKind,
    #[serde(default)]
    resources: Vec<CatalogEntry>,
}

impl CatalogEntry {
    fn into_spec(self) -> Result<ResourceSpec> {
        let body = match (self.body, self.body_template) {
            (Some(_), Some(_)) => bail!(
                "Resource '{}' sets both body and body_template",
                self.handle
            ),
            (Some(body), None) => body,
            (None, Some(name)) => get_body_template(&name)
                .with_context(|| {
                    format!("Resource '{}' uses unknown body_template '{}'", self.handle, name)
                })?
                .to_string(),
            (None, None) => String::new(),
        };

        Ok(ResourceSpec {
            handle: self.handle,
            title: self.title,
            body,
        })
    }
}

/// Parse and validate a catalog document
pub fn parse_catalog(content: &str, format: CatalogFormat) -> Result<Catalog> {
    let raw: RawCatalog = match format {
        CatalogFormat::Json => serde_json::from_str(content).context("Invalid JSON catalog")?,
        CatalogFormat::Yaml => serde_yaml::from_str(content).context("Invalid YAML catalog")?,
    };

    let resources = raw
        .resources
        .into_iter()
        .map(CatalogEntry::into_spec)
        .collect::<Result<Vec<_>>>()?;

    let catalog = Catalog {
        kind: raw.kind,
        resources,
    };
    catalog.validate()?;
    Ok(catalog)
}

/// Load a catalog file, choosing the syntax by extension
pub fn load_catalog_file(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    parse_catalog(&content, CatalogFormat::from_path(path))
        .with_context(|| format!("Failed to load catalog {}", path.display()))
}

impl Catalog {
    /// Reject catalogs whose duplicate handles would later masquerade as
    /// "already exists"
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for (index, spec) in self.resources.iter().enumerate() {
            if spec.handle.trim().is_empty() {
                bail!("Resource #{} has an empty handle", index + 1);
            }
            if spec.title.trim().is_empty() {
                bail!("Resource '{}' has an empty title", spec.handle);
            }
            if !seen.insert(spec.handle.as_str()) {
                bail!("Duplicate handle '{}' in catalog", spec.handle);
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
