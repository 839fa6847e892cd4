//! Databricks REST clients.
//!
//! Both clients resolve credentials when they are called, not when they are
//! built, so a process with incomplete configuration still starts and reports
//! what is missing through the health endpoint.

pub mod auth;
pub mod files;
pub mod statements;

use serde_json::Value;

pub use auth::{bearer_token, AuthError};
pub use files::VolumeFileStore;
pub use statements::DatabricksExecutor;

/// Most specific error message in a Databricks error body.
///
/// Error payloads nest causes under `error`, `details` or `cause`; the deepest
/// `message` wins. OAuth errors use `error_description` instead.
pub fn innermost_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    deepest_message(&value)
}

fn deepest_message(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(deepest_message),
        Value::Object(object) => {
            let nested = ["error", "details", "cause"]
                .iter()
                .filter_map(|key| object.get(*key))
                .find_map(deepest_message);
            nested
                .or_else(|| text_field(object.get("message")))
                .or_else(|| text_field(object.get("error_description")))
        }
        _ => None,
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

/// Message for a failed HTTP call: the innermost remote message when the body
/// has one, else the status code.
pub(crate) fn failure_message(status: u16, body: &str) -> String {
    innermost_message(body).unwrap_or_else(|| format!("request failed with HTTP {status}"))
}
