//! Shopify Admin Client
//!
//! Main client for the Admin REST API, combining the resolved store
//! settings and HTTP functionality.

use super::http::{RawResponse, ShopifyHttpClient};
use crate::config::ShopSettings;
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

/// Admin API client bound to a single store
#[derive(Clone)]
pub struct AdminClient {
    pub http: ShopifyHttpClient,
    pub store: String,
    pub api_version: String,
    access_token: String,
    origin: Url,
}

impl AdminClient {
    /// Create a new Admin API client from resolved settings
    pub fn new(settings: &ShopSettings) -> Result<Self> {
        let origin = match &settings.base_url {
            Some(base) => base.clone(),
            None => format!("https://{}", settings.store),
        };
        let origin = Url::parse(&origin)
            .with_context(|| format!("Invalid store origin: {}", origin))?;

        let http = ShopifyHttpClient::new(settings.timeout)?;

        Ok(Self {
            http,
            store: settings.store.clone(),
            api_version: settings.api_version.clone(),
            access_token: settings.access_token.clone(),
            origin,
        })
    }

    /// Build an Admin API URL, e.g. `admin_url("pages.json")`
    pub fn admin_url(&self, path: &str) -> Result<Url> {
        let path = format!("admin/api/{}/{}", self.api_version, path);
        self.origin
            .join(&path)
            .with_context(|| format!("Failed to build Admin API URL for {}", path))
    }

    /// POST a create payload to an Admin API endpoint
    pub async fn create(
        &self,
        url: &Url,
        payload: &Value,
    ) -> std::result::Result<RawResponse, reqwest::Error> {
        self.http
            .post_json(url.as_str(), &self.access_token, payload)
            .await
    }

    /// Storefront URL for a path such as `/pages/range-calculator`
    pub fn storefront_url(&self, path: &str) -> String {
        format!("https://{}{}", self.store, path)
    }
}
