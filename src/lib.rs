//! Maintenance operations for a Shopify storefront.
//!
//! - [`ensure`] - Idempotently create collections and pages through the Admin API
//! - [`catalog`] - The resources to create, built in or loaded from a file
//! - [`translations`] - Replace `t:sections.*` keys in theme section files
//! - [`shopify`] - Admin API HTTP plumbing
//! - [`config`] - Settings resolution (flags, environment, config file)

pub mod catalog;
pub mod config;
pub mod ensure;
pub mod shopify;
pub mod translations;
