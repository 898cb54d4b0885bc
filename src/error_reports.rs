
use std::sync::Arc;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use lambda_http::http::Method;
use lambda_http::{Body, Error, Request, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::cors::{CorsHeaders, CorsRule, MethodGate};
use crate::requests::json_body;
use crate::responses::Responder;
use crate::runtime_context::RuntimeContext;

/// What the frontend sends when it hits an unexpected error.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ErrorReport {
    #[serde(default)]
    error: Value,
    #[serde(default)]
    context: Value,
    user_agent: Option<String>,
    timestamp: Option<String>,
    url: Option<String>,
}

/// `/api/errorReport`: logs frontend errors and mirrors them to Slack when an
/// error channel is configured.
pub struct ErrorReportHandler {
    runtime_context: Arc<RuntimeContext>,
}

impl ErrorReportHandler {
    pub fn new(runtime_context: &Arc<RuntimeContext>) -> Arc<Self> {
        let runtime_context = Arc::clone(runtime_context);
        let handler = Self {
            runtime_context,
        };
        Arc::new(handler)
    }

    pub async fn handle_error_report(&self, event: Request) -> Result<Response<Body>, Error> {
        let allowed_origins = &self.runtime_context.config().allowed_origins;
        let responder = Responder::new(CorsHeaders::for_request(allowed_origins, &event, CorsRule::REPORT));
        match MethodGate::check(event.method(), &Method::POST) {
            MethodGate::Preflight => return responder.preflight(),
            MethodGate::NotAllowed => return responder.method_not_allowed(),
            MethodGate::Allowed => {}
        }
        let report: ErrorReport = match json_body(&event) {
            Ok(report) => report,
            Err(error) => return responder.failure("/api/errorReport", error),
        };
        self.record(report).await;
        responder.ok(&json!({ "ok": true, "logged": true }))
    }

    async fn record(&self, report: ErrorReport) {
        let timestamp = report.timestamp.clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        error!(
            timestamp = %timestamp,
            url = ?report.url,
            user_agent = ?report.user_agent,
            error = %report.error,
            context = %report.context,
            "frontend error report"
        );
        let Some(channel) = &self.runtime_context.config().error_channel_id else {
            return;
        };
        let message = slack_error_message(channel, &report, &timestamp);
        // forwarding failures never fail the request
        match self.runtime_context.slack().post_message(&message).await {
            Ok(_) => info!("error report forwarded to {}", channel),
            Err(error) => error!("failed to forward error report to slack {:?}", error),
        }
    }
}

// https://api.slack.com/reference/block-kit/blocks
fn slack_error_message(channel: &str, report: &ErrorReport, timestamp: &str) -> Value {
    let url = report.url.as_deref().unwrap_or("Unknown");
    json!({
        "channel": channel,
        "text": "Frontend Error Report",
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": "🚨 Frontend Error Report", "emoji": true },
            },
            {
                "type": "section",
                "fields": [
                    { "type": "mrkdwn", "text": format!("*URL:*\n{url}") },
                    { "type": "mrkdwn", "text": format!("*Time:*\n{timestamp}") },
                ],
            },
            {
                "type": "section",
                "text": { "type": "mrkdwn", "text": format!("*Error:*\n```{}```", pretty(&report.error)) },
            },
            {
                "type": "section",
                "text": { "type": "mrkdwn", "text": format!("*Context:*\n```{}```", pretty(&report.context)) },
            },
        ],
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
