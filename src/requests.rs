
use anyhow::{Context, Result};
use lambda_http::{Body, Request, RequestExt};
use serde::de::DeserializeOwned;

/// A non-empty query string parameter.
pub fn query_param<'a>(event: &'a Request, key: &str) -> Option<&'a str> {
    event.query_string_parameters_ref()
        .and_then(|params| params.first(key))
        .filter(|value| !value.is_empty())
}

/// Decodes a JSON request body. API Gateway may hand the body over as text
/// or as base64-decoded bytes.
pub fn json_body<T: DeserializeOwned>(event: &Request) -> Result<T> {
    let body = match event.body() {
        Body::Text(text) => serde_json::from_str(text),
        Body::Binary(bytes) => serde_json::from_slice(bytes),
        Body::Empty => serde_json::from_str("{}"),
    };
    body.context("invalid JSON body")
}
