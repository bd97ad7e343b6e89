//! Built-in catalogs and body templates
//!
//! The storefront's own catalogs are embedded JSON files, compiled into the
//! binary so `sfops collections` works without any extra files.

use super::loader::{parse_catalog, Catalog, CatalogFormat};
use std::sync::OnceLock;

const COLLECTIONS_JSON: &str = include_str!("../resources/collections.json");
const PAGES_JSON: &str = include_str!("../resources/pages.json");

/// Embedded HTML bodies, referenced from catalogs by `body_template`
const BODY_TEMPLATES: &[(&str, &str)] = &[(
    "range-calculator",
    include_str!("../resources/range-calculator.html"),
)];

/// Which built-in catalog to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCatalog {
    /// Product collections that storefront links point at
    Collections,
    /// The e-bike range calculator page
    Pages,
}

static COLLECTIONS: OnceLock<Catalog> = OnceLock::new();
static PAGES: OnceLock<Catalog> = OnceLock::new();

fn parse_embedded(content: &str) -> Catalog {
    parse_catalog(content, CatalogFormat::Json)
        .unwrap_or_else(|e| panic!("Failed to parse embedded catalog JSON: {:#}", e))
}

/// Get a built-in catalog (parsed from embedded JSON on first access)
pub fn builtin_catalog(which: BuiltinCatalog) -> &'static Catalog {
    match which {
        BuiltinCatalog::Collections => COLLECTIONS.get_or_init(|| parse_embedded(COLLECTIONS_JSON)),
        BuiltinCatalog::Pages => PAGES.get_or_init(|| parse_embedded(PAGES_JSON)),
    }
}

/// Look up an embedded body template by name
pub fn get_body_template(name: &str) -> Option<&'static str> {
    BODY_TEMPLATES
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, body)| *body)
}
