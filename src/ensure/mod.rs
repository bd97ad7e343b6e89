//! Idempotent resource ensurer
//!
//! Creates remote resources identified by a unique handle. A resource whose
//! handle is already taken is reported as [`OperationOutcome::AlreadyExists`]
//! rather than as a failure, so a catalog can be re-applied safely after a
//! partial run.
//!
//! # Architecture
//!
//! - [`classify`] - Maps an Admin API response to an [`OperationOutcome`]
//! - [`throttle`] - Paces successive create requests
//! - [`batch`] - Runs a whole catalog and tallies outcomes

pub mod batch;
pub mod classify;
pub mod throttle;

use crate::shopify::client::AdminClient;
use crate::shopify::http::CallLimit;
use anyhow::Result;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

pub use batch::{run_batch, BatchReport, Summary};
pub use throttle::{Throttle, ThrottleConfig};

/// One resource to ensure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Unique slug, used as the idempotency key
    pub handle: String,
    pub title: String,
    /// HTML body
    pub body: String,
}

impl ResourceSpec {
    pub fn new(handle: &str, title: &str, body: &str) -> Self {
        Self {
            handle: handle.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

fn default_published() -> bool {
    true
}

/// Category of remote object, with its kind-specific payload flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceKind {
    Collection {
        #[serde(default = "default_published")]
        published: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort_order: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template_suffix: Option<String>,
    },
    Page {
        #[serde(default = "default_published")]
        published: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template_suffix: Option<String>,
    },
}

impl ResourceKind {
    /// JSON envelope key in requests and responses
    pub fn envelope(&self) -> &'static str {
        match self {
            Self::Collection { .. } => "collection",
            Self::Page { .. } => "page",
        }
    }

    /// Admin API endpoint, relative to `admin/api/{version}/`
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Collection { .. } => "collections.json",
            Self::Page { .. } => "pages.json",
        }
    }

    /// Storefront path of a resource of this kind
    pub fn storefront_path(&self, handle: &str) -> String {
        match self {
            Self::Collection { .. } => format!("/collections/{}", handle),
            Self::Page { .. } => format!("/pages/{}", handle),
        }
    }

    /// Build the create request body for `spec`
    pub fn payload(&self, spec: &ResourceSpec) -> Value {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!(spec.title));
        fields.insert("handle".to_string(), json!(spec.handle));
        fields.insert("body_html".to_string(), json!(spec.body));

        let (published, sort_order, template_suffix) = match self {
            Self::Collection {
                published,
                sort_order,
                template_suffix,
            } => (*published, sort_order.as_deref(), template_suffix.as_deref()),
            Self::Page {
                published,
                template_suffix,
            } => (*published, None, template_suffix.as_deref()),
        };

        fields.insert("published".to_string(), json!(published));
        if let Some(sort_order) = sort_order {
            fields.insert("sort_order".to_string(), json!(sort_order));
        }
        if let Some(suffix) = template_suffix {
            fields.insert("template_suffix".to_string(), json!(suffix));
        }

        let mut envelope = Map::new();
        envelope.insert(self.envelope().to_string(), Value::Object(fields));
        Value::Object(envelope)
    }
}

/// Identity echoed back by the server for a newly created resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedResource {
    pub id: Option<u64>,
    pub title: String,
    pub handle: String,
}

/// Why an ensure attempt failed
///
/// A handle conflict is not an error: it becomes
/// [`OperationOutcome::AlreadyExists`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnsureError {
    /// No response was obtained (DNS, connect, timeout, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// 422 for a reason other than the handle being taken
    #[error("validation failed ({status}): {body}")]
    Validation { status: StatusCode, body: String },

    /// 429 from the server
    #[error("rate limited ({status}): {body}")]
    RateLimited {
        status: StatusCode,
        body: String,
        retry_after: Option<Duration>,
    },

    #[error("HTTP {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
}

impl EnsureError {
    /// Build a transport error, keeping the whole source chain
    pub fn transport(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Transport(message)
    }

    /// HTTP status, when a response was received
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(_) => None,
            Self::Validation { status, .. }
            | Self::RateLimited { status, .. }
            | Self::UnexpectedStatus { status, .. } => Some(*status),
        }
    }

    /// Raw response body, when a response was received
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Transport(_) => None,
            Self::Validation { body, .. }
            | Self::RateLimited { body, .. }
            | Self::UnexpectedStatus { body, .. } => Some(body),
        }
    }
}

/// Terminal result of ensuring one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Created(CreatedResource),
    AlreadyExists,
    Failed(EnsureError),
}

impl OperationOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Rate-limit information the server attached to a response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateFeedback {
    pub retry_after: Option<Duration>,
    pub call_limit: Option<CallLimit>,
}

/// Outcome of one attempt plus the server's rate-limit feedback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub outcome: OperationOutcome,
    pub feedback: RateFeedback,
}

/// Something that can ensure a resource exists remotely
#[allow(async_fn_in_trait)]
pub trait Ensure {
    /// Issue exactly one create request for `spec` and classify the result
    async fn attempt(&self, spec: &ResourceSpec) -> Attempt;

    async fn ensure(&self, spec: &ResourceSpec) -> OperationOutcome {
        self.attempt(spec).await.outcome
    }
}

/// Ensurer for one resource kind against the Admin API
pub struct ResourceEnsurer {
    client: AdminClient,
    kind: ResourceKind,
    url: Url,
}

impl ResourceEnsurer {
    pub fn new(client: AdminClient, kind: ResourceKind) -> Result<Self> {
        let url = client.admin_url(kind.endpoint())?;
        Ok(Self { client, kind, url })
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn client(&self) -> &AdminClient {
        &self.client
    }
}

impl Ensure for ResourceEnsurer {
    async fn attempt(&self, spec: &ResourceSpec) -> Attempt {
        tracing::debug!(
            "Ensuring {} '{}' ({})",
            self.kind.envelope(),
            spec.handle,
            spec.title
        );

        let payload = self.kind.payload(spec);
        let (outcome, feedback) = match self.client.create(&self.url, &payload).await {
            Ok(response) => (
                classify::classify(&self.kind, spec, &response),
                RateFeedback {
                    retry_after: response.retry_after,
                    call_limit: response.call_limit,
                },
            ),
            Err(err) => (
                OperationOutcome::Failed(EnsureError::transport(&err)),
                RateFeedback::default(),
            ),
        };

        match &outcome {
            OperationOutcome::Created(created) => {
                tracing::info!("Created {} '{}'", self.kind.envelope(), created.handle)
            }
            OperationOutcome::AlreadyExists => {
                tracing::warn!("{} '{}' already exists", self.kind.envelope(), spec.handle)
            }
            OperationOutcome::Failed(err) => tracing::error!(
                "Failed to create {} '{}': {}",
                self.kind.envelope(),
                spec.handle,
                crate::shopify::http::sanitize_for_log(&err.to_string())
            ),
        }

        Attempt { outcome, feedback }
    }
}
