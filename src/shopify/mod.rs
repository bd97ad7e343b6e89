//! Shopify Admin API interaction module
//!
//! This module provides the HTTP plumbing for talking to the Shopify Admin
//! REST API with a static access token.
//!
//! # Module Structure
//!
//! - [`client`] - Admin API client bound to one store and API version
//! - [`http`] - HTTP utilities: raw responses, rate-limit headers, log sanitising
//!
//! # Example
//!
//! ```ignore
//! use storefront_ops::shopify::client::AdminClient;
//!
//! async fn example(settings: &ShopSettings) -> anyhow::Result<()> {
//!     let client = AdminClient::new(settings)?;
//!     let url = client.admin_url("pages.json")?;
//!     let response = client.create(&url, &payload).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
