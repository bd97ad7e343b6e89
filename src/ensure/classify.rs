//! Response classification
//!
//! Maps an Admin API create response to an [`OperationOutcome`]. Shopify
//! reports validation failures as `422` with an `errors` payload that is one
//! of:
//!
//! - an object of field name to messages: `{"errors": {"handle": ["has already been taken"]}}`
//! - a list of full messages: `{"errors": ["Handle has already been taken"]}`
//! - a single message: `{"errors": "Handle has already been taken"}`

use super::{CreatedResource, EnsureError, OperationOutcome, ResourceKind, ResourceSpec};
use crate::shopify::http::RawResponse;
use reqwest::StatusCode;
use serde_json::Value;

/// Full message Shopify uses when a handle is not unique
pub const HANDLE_TAKEN: &str = "Handle has already been taken";

/// Classify a create response for `spec`
pub fn classify(
    kind: &ResourceKind,
    spec: &ResourceSpec,
    response: &RawResponse,
) -> OperationOutcome {
    let status = response.status;

    if status.is_success() {
        return OperationOutcome::Created(parse_created(kind, spec, &response.body));
    }

    match status {
        StatusCode::UNPROCESSABLE_ENTITY if is_handle_conflict(&response.body) => {
            OperationOutcome::AlreadyExists
        }
        StatusCode::UNPROCESSABLE_ENTITY => OperationOutcome::Failed(EnsureError::Validation {
            status,
            body: response.body.clone(),
        }),
        StatusCode::TOO_MANY_REQUESTS => OperationOutcome::Failed(EnsureError::RateLimited {
            status,
            body: response.body.clone(),
            retry_after: response.retry_after,
        }),
        _ => OperationOutcome::Failed(EnsureError::UnexpectedStatus {
            status,
            body: response.body.clone(),
        }),
    }
}

/// Whether a 422 body reports the handle as already taken
pub fn is_handle_conflict(body: &str) -> bool {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            let errors = value.get("errors").unwrap_or(&value);
            let needle = HANDLE_TAKEN.to_ascii_lowercase();
            full_messages(errors)
                .iter()
                .any(|message| message.to_ascii_lowercase().contains(&needle))
        }
        Err(_) => body.contains(HANDLE_TAKEN),
    }
}

/// Flatten an `errors` payload into full, human-readable messages
pub fn full_messages(errors: &Value) -> Vec<String> {
    match errors {
        Value::String(message) => vec![message.clone()],
        Value::Array(items) => items.iter().flat_map(full_messages).collect(),
        Value::Object(fields) => fields
            .iter()
            .flat_map(|(field, messages)| {
                full_messages(messages)
                    .into_iter()
                    .map(move |message| field_message(field, &message))
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `("handle", "has already been taken")` -> `"Handle has already been taken"`
fn field_message(field: &str, message: &str) -> String {
    if field == "base" {
        return message.to_string();
    }

    let humanized = field.replace('_', " ");
    let mut chars = humanized.chars();
    let name = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => return message.to_string(),
    };
    format!("{} {}", name, message)
}

/// Read the echoed identity, falling back to the spec's own values
fn parse_created(kind: &ResourceKind, spec: &ResourceSpec, body: &str) -> CreatedResource {
    let echoed = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get(kind.envelope()).cloned());

    let field = |name: &str| {
        echoed
            .as_ref()
            .and_then(|entity| entity.get(name))
            .and_then(|v| v.as_str())
            .map(String::from)
    };

    CreatedResource {
        id: echoed
            .as_ref()
            .and_then(|entity| entity.get("id"))
            .and_then(|v| v.as_u64()),
        title: field("title").unwrap_or_else(|| spec.title.clone()),
        handle: field("handle").unwrap_or_else(|| spec.handle.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kind() -> ResourceKind {
        ResourceKind::Collection {
            published: true,
            sort_order: Some("best-selling".to_string()),
            template_suffix: None,
        }
    }

    fn spec() -> ResourceSpec {
        ResourceSpec::new("racks", "Racks", "<p>Bike racks.</p>")
    }

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
            call_limit: None,
            retry_after: None,
        }
    }

    #[test]
    fn test_201_is_created_with_echoed_identity() {
        let body = json!({
            "collection": {"id": 841564295, "title": "Racks", "handle": "racks-1"}
        })
        .to_string();

        let outcome = classify(&kind(), &spec(), &response(201, &body));
        assert_eq!(
            outcome,
            OperationOutcome::Created(CreatedResource {
                id: Some(841564295),
                title: "Racks".to_string(),
                handle: "racks-1".to_string(),
            })
        );
    }

    #[test]
    fn test_created_without_echo_falls_back_to_spec() {
        let outcome = classify(&kind(), &spec(), &response(201, ""));
        let OperationOutcome::Created(created) = outcome else {
            panic!("expected Created");
        };
        assert_eq!(created.handle, "racks");
        assert_eq!(created.id, None);
    }

    #[test]
    fn test_422_field_errors_conflict() {
        let body = json!({"errors": {"handle": ["has already been taken"]}}).to_string();
        assert_eq!(
            classify(&kind(), &spec(), &response(422, &body)),
            OperationOutcome::AlreadyExists
        );
    }

    #[test]
    fn test_422_full_message_conflict() {
        let body = json!({"errors": ["Handle has already been taken"]}).to_string();
        assert!(classify(&kind(), &spec(), &response(422, &body)).is_already_exists());

        let body = json!({"errors": "Handle has already been taken"}).to_string();
        assert!(classify(&kind(), &spec(), &response(422, &body)).is_already_exists());
    }

    #[test]
    fn test_422_other_validation_preserves_payload() {
        let body = r#"{"errors":{"title":["can't be blank"]}}"#;
        assert_eq!(
            classify(&kind(), &spec(), &response(422, body)),
            OperationOutcome::Failed(EnsureError::Validation {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: body.to_string(),
            })
        );
    }

    #[test]
    fn test_422_non_json_falls_back_to_literal_match() {
        let conflict = response(422, "Handle has already been taken");
        assert!(classify(&kind(), &spec(), &conflict).is_already_exists());

        let other = response(422, "<html>oops</html>");
        assert!(classify(&kind(), &spec(), &other).is_failed());
    }

    #[test]
    fn test_conflict_message_on_other_status_is_not_already_exists() {
        let body = json!({"errors": ["Handle has already been taken"]}).to_string();
        assert!(classify(&kind(), &spec(), &response(400, &body)).is_failed());
    }

    #[test]
    fn test_429_is_rate_limited() {
        let mut raw = response(429, r#"{"errors":"Exceeded 2 calls per second"}"#);
        raw.retry_after = Some(std::time::Duration::from_secs(2));

        let OperationOutcome::Failed(EnsureError::RateLimited { retry_after, .. }) =
            classify(&kind(), &spec(), &raw)
        else {
            panic!("expected RateLimited");
        };
        assert_eq!(retry_after, Some(std::time::Duration::from_secs(2)));
    }

    #[test]
    fn test_other_status_is_unexpected() {
        let outcome = classify(&kind(), &spec(), &response(500, "Internal Server Error"));
        assert_eq!(
            outcome,
            OperationOutcome::Failed(EnsureError::UnexpectedStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "Internal Server Error".to_string(),
            })
        );
    }

    #[test]
    fn test_full_messages_humanizes_fields() {
        let errors = json!({"base": ["Something broke"], "template_suffix": ["is invalid"]});
        let mut messages = full_messages(&errors);
        messages.sort();
        assert_eq!(messages, vec!["Something broke", "Template suffix is invalid"]);
    }
}
