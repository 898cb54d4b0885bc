
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use lambda_http::http::Method;
use lambda_http::{Body, Request, RequestExt, Response};
use serde_json::{json, Value};

use crate::runtime_config::RuntimeConfig;
use crate::runtime_context::RuntimeContext;
use crate::slack_client::{SlackApi, SlackApiError, SlackMember};

/// In-memory stand-in for the Slack Web API.
#[derive(Default)]
pub struct FakeSlack {
    members: Vec<SlackMember>,
    replies: Option<Value>,
    list_error: Option<String>,
    info_failures: Vec<String>,
    post_error: bool,
    info_calls: Mutex<Vec<String>>,
    posted: Mutex<Vec<Value>>,
}

impl FakeSlack {
    pub fn with_member(mut self, member: Value) -> Self {
        let member = serde_json::from_value(member).expect("valid member");
        self.members.push(member);
        self
    }

    pub fn with_replies(mut self, replies: Value) -> Self {
        self.replies = Some(replies);
        self
    }

    pub fn with_list_error(mut self, code: &str) -> Self {
        self.list_error = Some(code.to_string());
        self
    }

    pub fn with_info_failure(mut self, user_id: &str) -> Self {
        self.info_failures.push(user_id.to_string());
        self
    }

    pub fn with_post_error(mut self) -> Self {
        self.post_error = true;
        self
    }

    pub fn info_calls(&self) -> Vec<String> {
        self.info_calls.lock().unwrap().clone()
    }

    pub fn posted(&self) -> Vec<Value> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SlackApi for FakeSlack {
    async fn users_list(&self) -> Result<Vec<SlackMember>> {
        if let Some(code) = &self.list_error {
            return Err(SlackApiError { method: "users.list".into(), code: code.clone() }.into());
        }
        Ok(self.members.clone())
    }

    async fn users_info(&self, user_id: &str) -> Result<SlackMember> {
        self.info_calls.lock().unwrap().push(user_id.to_string());
        if self.info_failures.iter().any(|id| id == user_id) {
            bail!("connection reset");
        }
        match self.members.iter().find(|member| member.id == user_id) {
            Some(member) => Ok(member.clone()),
            None => Err(SlackApiError { method: "users.info".into(), code: "user_not_found".into() }.into()),
        }
    }

    async fn conversations_replies(&self, _channel: &str, _ts: &str) -> Result<Value> {
        match &self.replies {
            Some(replies) => Ok(replies.clone()),
            None => Err(SlackApiError { method: "conversations.replies".into(), code: "thread_not_found".into() }.into()),
        }
    }

    async fn post_message(&self, message: &Value) -> Result<Value> {
        self.posted.lock().unwrap().push(message.clone());
        if self.post_error {
            bail!("slack unavailable");
        }
        Ok(json!({ "ok": true, "channel": message["channel"], "ts": "1700000000.000200" }))
    }
}

pub fn test_config() -> RuntimeConfig {
    RuntimeConfig::from_lookup(|key| match key {
        "SLACK_BOT_TOKEN" => Some("xoxb-test".to_string()),
        "ALLOWED_ORIGINS" => Some("https://app.example,http://localhost:3000".to_string()),
        _ => None,
    }).expect("test config")
}

pub fn test_context(slack: FakeSlack) -> (Arc<RuntimeContext>, Arc<FakeSlack>) {
    test_context_with(test_config(), slack)
}

pub fn test_context_with(config: RuntimeConfig, slack: FakeSlack) -> (Arc<RuntimeContext>, Arc<FakeSlack>) {
    let slack = Arc::new(slack);
    let context = RuntimeContext::with_slack(config, slack.clone());
    (context, slack)
}

pub fn request(method: Method, path: &str) -> Request {
    lambda_http::http::Request::builder()
        .method(method)
        .uri(path)
        .header("origin", "http://localhost:3000")
        .body(Body::Empty)
        .expect("valid request")
}

pub fn request_with_query(method: Method, path: &str, query: &[(&str, &str)]) -> Request {
    let query: HashMap<String, String> = query.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    request(method, path).with_query_string_parameters(query)
}

pub fn request_with_body(method: Method, path: &str, body: &str) -> Request {
    lambda_http::http::Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::Text(body.to_string()))
        .expect("valid request")
}

pub fn body_json(response: &Response<Body>) -> Value {
    match response.body() {
        Body::Text(text) => serde_json::from_str(text).expect("json body"),
        Body::Binary(bytes) => serde_json::from_slice(bytes).expect("json body"),
        Body::Empty => Value::Null,
    }
}
