//! HTTP utilities for Shopify Admin REST API calls

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Header carrying the Admin API access token
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Header reporting REST leaky-bucket usage as `used/limit`
pub const CALL_LIMIT_HEADER: &str = "x-shopify-shop-api-call-limit";

/// Longest server-requested pause we will honour
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut cut = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Leaky-bucket usage reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallLimit {
    pub used: u32,
    pub limit: u32,
}

impl CallLimit {
    /// Parse a `used/limit` header value such as `32/40`
    pub fn parse(value: &str) -> Option<Self> {
        let (used, limit) = value.trim().split_once('/')?;
        Some(Self {
            used: used.trim().parse().ok()?,
            limit: limit.trim().parse().ok()?,
        })
    }

    /// Requests still available before the server starts rejecting
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }
}

/// A response that reached us, whatever its status
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
    pub call_limit: Option<CallLimit>,
    pub retry_after: Option<Duration>,
}

impl RawResponse {
    fn from_parts(status: StatusCode, headers: &HeaderMap, body: String) -> Self {
        let call_limit = headers
            .get(CALL_LIMIT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(CallLimit::parse);

        // Shopify sends fractional seconds ("2.0")
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .and_then(|secs| {
                if secs > MAX_RETRY_AFTER.as_secs_f64() {
                    Some(MAX_RETRY_AFTER)
                } else {
                    Duration::try_from_secs_f64(secs).ok()
                }
            });

        Self {
            status,
            body,
            call_limit,
            retry_after,
        }
    }
}

/// HTTP client wrapper for Admin API calls
#[derive(Clone)]
pub struct ShopifyHttpClient {
    client: Client,
}

impl ShopifyHttpClient {
    /// Create a new HTTP client with an explicit request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("storefront-ops/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a POST request carrying a JSON body
    ///
    /// Only transport failures are errors; every status code is returned
    /// to the caller for classification.
    pub async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &Value,
    ) -> std::result::Result<RawResponse, reqwest::Error> {
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header(ACCESS_TOKEN_HEADER, token)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::debug!("API error: {} - {}", status, sanitize_for_log(&text));
        }

        Ok(RawResponse::from_parts(status, &headers, text))
    }
}

/// Short hint for well-known failure statuses
pub fn status_hint(status: StatusCode) -> Option<&'static str> {
    match status.as_u16() {
        401 => Some("Authentication failed. Check the Admin API access token."),
        403 => Some("Permission denied. The app is missing the required access scope."),
        404 => Some("Endpoint not found. Check the store domain and API version."),
        429 => Some("Rate limit exceeded. Increase the delay between requests."),
        500..=599 => Some("Shopify is temporarily unavailable. Please try again."),
        _ => None,
    }
}
