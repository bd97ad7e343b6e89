//! Resource catalogs
//!
//! A catalog is one [`ResourceKind`](crate::ensure::ResourceKind) plus the
//! ordered list of resources to ensure. Built-in catalogs are compiled into
//! the binary from `src/resources/`; others can be loaded from JSON or YAML
//! files with the same shape:
//!
//! ```json
//! {
//!   "kind": "collection",
//!   "published": true,
//!   "sort_order": "best-selling",
//!   "resources": [
//!     {"handle": "lights", "title": "Lights", "body": "<p>Bicycle lights.</p>"}
//!   ]
//! }
//! ```
//!
//! - [`registry`] - Built-in catalogs and embedded body templates
//! - [`loader`] - Parsing and validation

pub mod loader;
pub mod registry;

pub use loader::{load_catalog_file, parse_catalog, Catalog, CatalogFormat};
pub use registry::{builtin_catalog, get_body_template, BuiltinCatalog};
