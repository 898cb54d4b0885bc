
use lambda_http::{Body, Error, Response};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::cors::CorsHeaders;
use crate::slack_client::SlackApiError;

/// Builds JSON responses that always carry the endpoint's CORS headers.
pub struct Responder {
    cors: CorsHeaders,
}

impl Responder {
    pub fn new(cors: CorsHeaders) -> Self {
        Self {
            cors,
        }
    }

    pub fn json<T: Serialize>(&self, status: u16, body: &T) -> Result<Response<Body>, Error> {
        let body = serde_json::to_string(body)?;
        let response = self.cors.apply(Response::builder())
            .status(status)
            .header("content-type", "application/json")
            .body(body.into())
            .map_err(Box::new)?;
        Ok(response)
    }

    pub fn ok<T: Serialize>(&self, body: &T) -> Result<Response<Body>, Error> {
        self.json(200, body)
    }

    pub fn preflight(&self) -> Result<Response<Body>, Error> {
        let response = self.cors.apply(Response::builder())
            .status(200)
            .body(Body::Empty)
            .map_err(Box::new)?;
        Ok(response)
    }

    pub fn method_not_allowed(&self) -> Result<Response<Body>, Error> {
        self.json(405, &json!({ "ok": false, "error": "Method not allowed" }))
    }

    pub fn bad_request(&self, message: &str) -> Result<Response<Body>, Error> {
        self.json(400, &json!({ "ok": false, "error": message }))
    }

    pub fn not_found(&self) -> Result<Response<Body>, Error> {
        self.json(404, &json!({ "ok": false, "error": "Not found" }))
    }

    /// Maps a handler failure to the 500 envelope. Upstream `ok: false`
    /// answers keep Slack's error code in `details`.
    pub fn failure(&self, route: &str, failure: anyhow::Error) -> Result<Response<Body>, Error> {
        match failure.downcast_ref::<SlackApiError>() {
            Some(slack_error) => {
                error!("{} slack api error {:?}", route, slack_error);
                self.json(500, &json!({
                    "ok": false,
                    "error": "Slack API error",
                    "details": slack_error.code,
                }))
            }
            None => {
                error!("{} backend error {:?}", route, failure);
                self.json(500, &json!({
                    "ok": false,
                    "error": "backend_error",
                    "details": format!("{:#}", failure),
                }))
            }
        }
    }
}
