//! The boundary with the Sailthru API.
//!
//! The sync engine only talks to Sailthru through [`SailthruApi`], so tests
//! can substitute an in-memory implementation.

mod client;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use client::*;

/// Errors returned by the Sailthru API client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// A file sent along with an API call.
#[derive(Clone, Debug)]
pub struct Attachment {
    /// The form field name.
    pub field: &'static str,

    /// The name of the file as reported to the service.
    pub file_name: String,

    /// The file's contents.
    pub bytes: Vec<u8>,
}

/// A name returned when listing templates or includes.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct ItemSummary {
    pub name: String,
}

/// An authenticated Sailthru API client.
///
/// Only [`api_get`](SailthruApi::api_get), [`api_post`](SailthruApi::api_post)
/// and [`api_post_file`](SailthruApi::api_post_file) need to be implemented.
/// The template helpers are built on top of them the same way the service
/// exposes them.
pub trait SailthruApi {
    /// GET a resource.
    async fn api_get(&self, resource: &str, params: Map<String, Value>) -> ApiResult<Value>;

    /// POST to a resource.
    async fn api_post(&self, resource: &str, options: Map<String, Value>) -> ApiResult<Value>;

    /// POST to a resource with a file attached.
    async fn api_post_file(
        &self,
        resource: &str,
        options: Map<String, Value>,
        attachment: Attachment,
    ) -> ApiResult<Value>;

    /// Get all templates in the account.
    async fn get_templates(&self) -> ApiResult<Value> {
        self.api_get("template", Map::new()).await
    }

    /// Create or update the template called `name`.
    async fn save_template(&self, name: &str, mut options: Map<String, Value>) -> ApiResult<Value> {
        options.insert("template".into(), name.into());
        self.api_post("template", options).await
    }
}

/// Creates API clients from credentials.
pub trait Connector {
    type Client: SailthruApi;

    /// Create a client authenticated with the given key and secret.
    fn connect(&self, key: &str, secret: &str) -> Self::Client;
}

/// Extracts the named list of items (`templates`, `includes`) from a response.
///
/// A missing list is treated as empty.
pub fn item_list(response: &Value, field: &str) -> ApiResult<Vec<ItemSummary>> {
    match response.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(items) => Vec::<ItemSummary>::deserialize(items)
            .map_err(|error| ApiError::InvalidResponse(format!("bad {field} list: {error}"))),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn list_keeps_remote_order() {
        let response = json!({
            "templates": [
                { "name": "Zed", "template_id": 3 },
                { "name": "Alpha", "template_id": 1 },
            ]
        });

        let names: Vec<_> = item_list(&response, "templates")
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, ["Zed", "Alpha"]);
    }

    #[test]
    fn empty_list() {
        assert!(item_list(&json!({ "includes": [] }), "includes").unwrap().is_empty());
        assert!(item_list(&json!({}), "includes").unwrap().is_empty());
    }

    #[test]
    fn malformed_list() {
        let error = item_list(&json!({ "includes": [{ "id": 1 }] }), "includes").unwrap_err();
        assert!(matches!(error, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn api_error_display() {
        let error = ApiError::Api {
            status: 400,
            code: Some(14),
            message: "Unknown template".into(),
        };
        assert_eq!(error.to_string(), "API error 400: Unknown template");
    }
}
