
use std::sync::Arc;

use anyhow::{Context, Result};
use cores::enrichment::{enrich_thread, ThreadMessage};
use lambda_http::http::Method;
use lambda_http::{Body, Error, Request, Response};
use serde_json::Value;
use tracing::info;

use crate::cors::{CorsHeaders, CorsRule, MethodGate};
use crate::requests::query_param;
use crate::responses::Responder;
use crate::runtime_context::RuntimeContext;
use crate::slack_client::SlackProfiles;

/// `/api/threadReplies`: a thread's messages, each with its author's profile.
pub struct ThreadRequestHandler {
    runtime_context: Arc<RuntimeContext>,
}

impl ThreadRequestHandler {
    pub fn new(runtime_context: &Arc<RuntimeContext>) -> Arc<Self> {
        let runtime_context = Arc::clone(runtime_context);
        let handler = Self {
            runtime_context,
        };
        Arc::new(handler)
    }

    pub async fn handle_thread_replies(&self, event: Request) -> Result<Response<Body>, Error> {
        let allowed_origins = &self.runtime_context.config().allowed_origins;
        let responder = Responder::new(CorsHeaders::for_request(allowed_origins, &event, CorsRule::READ));
        match MethodGate::check(event.method(), &Method::GET) {
            MethodGate::Preflight => return responder.preflight(),
            MethodGate::NotAllowed => return responder.method_not_allowed(),
            MethodGate::Allowed => {}
        }
        let (Some(channel), Some(ts)) = (query_param(&event, "channel"), query_param(&event, "ts")) else {
            return responder.bad_request("Missing channel or ts parameter");
        };
        match self.thread_replies(channel, ts).await {
            Ok(body) => responder.ok(&body),
            Err(error) => responder.failure("/api/threadReplies", error),
        }
    }

    /// The upstream body is relayed as-is except for `messages`.
    async fn thread_replies(&self, channel: &str, ts: &str) -> Result<Value> {
        let slack = self.runtime_context.slack();
        let mut body = slack.conversations_replies(channel, ts).await?;
        let Some(messages) = body.get_mut("messages") else {
            info!("threadReplies {} {} has no messages", channel, ts);
            return Ok(body);
        };
        let thread: Vec<ThreadMessage> = serde_json::from_value(messages.take())
            .context("unexpected conversations.replies messages")?;
        info!("threadReplies {} {} has {} messages", channel, ts, thread.len());
        let enriched = enrich_thread(thread, &SlackProfiles::new(slack)).await;
        *messages = serde_json::to_value(enriched)?;
        Ok(body)
    }
}
