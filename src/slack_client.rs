
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use cores::directory::{Candidate, UserProfile};
use cores::enrichment::ProfileSource;
use reqwest::{self, Client};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::runtime_config::RuntimeConfig;

const USERS_LIST_PAGE_SIZE: &str = "200";

/// Slack answered with `ok: false`.
#[derive(Debug, thiserror::Error)]
#[error("slack {method} failed: {code}")]
pub struct SlackApiError {
    pub method: String,
    pub code: String,
}

// https://api.slack.com/types/user
#[derive(Deserialize, Clone, Debug, Default)]
pub struct SlackMember {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub profile: SlackMemberProfile,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct SlackMemberProfile {
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub image_48: Option<String>,
}

impl SlackMember {
    /// Deleted accounts and bots never show up in the directory.
    pub fn is_active_person(&self) -> bool {
        !self.deleted && !self.is_bot
    }

    pub fn real_name(&self) -> &str {
        self.profile.real_name.as_deref().unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        self.profile.display_name.as_deref().unwrap_or_default()
    }

    pub fn image(&self) -> &str {
        self.profile.image_48.as_deref().unwrap_or_default()
    }

    pub fn candidate(&self) -> Candidate {
        Candidate::new(&self.id, self.real_name(), self.display_name(), &self.name)
    }

    pub fn user_profile(&self) -> UserProfile {
        UserProfile {
            display_name: self.display_name().to_string(),
            real_name: self.real_name().to_string(),
            image: self.image().to_string(),
        }
    }
}

#[derive(Deserialize)]
struct UsersListResponseBody {
    members: Vec<SlackMember>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct UsersInfoResponseBody {
    user: SlackMember,
}

/// The Slack Web API methods the relay forwards to.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Every member of the workspace, across all pages.
    async fn users_list(&self) -> Result<Vec<SlackMember>>;
    async fn users_info(&self, user_id: &str) -> Result<SlackMember>;
    /// The raw `conversations.replies` body.
    async fn conversations_replies(&self, channel: &str, ts: &str) -> Result<Value>;
    async fn post_message(&self, message: &Value) -> Result<Value>;
}

pub struct SlackClient {
    client: Client,
    api_base: String,
    bot_token: String,
}

impl SlackClient {
    pub fn new(config: &RuntimeConfig) -> Arc<Self> {
        let client = reqwest::Client::new();
        let this = Self {
            client,
            api_base: config.slack_api_base.clone(),
            bot_token: config.slack_bot_token.clone(),
        };
        Arc::new(this)
    }

    fn url(&self, method: &str) -> String {
        [self.api_base.as_str(), method].join("/")
    }

    async fn get(&self, method: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self.client.get(self.url(method))
            .header("Authorization", ["Bearer", &self.bot_token].join(" "))
            .query(query)
            .send()
            .await?;
        let text = response.text().await?;
        debug!("slack {} response {:?}", method, text);
        parse_slack_response(method, &text)
    }

    async fn post(&self, method: &str, body: &Value) -> Result<Value> {
        let response = self.client.post(self.url(method))
            .header("Content-type", "application/json; charset=utf-8")
            .header("Authorization", ["Bearer", &self.bot_token].join(" "))
            .json(body)
            .send()
            .await?;
        let text = response.text().await?;
        debug!("slack {} response {:?}", method, text);
        parse_slack_response(method, &text)
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    // https://api.slack.com/methods/users.list
    async fn users_list(&self) -> Result<Vec<SlackMember>> {
        let mut members = Vec::new();
        let mut cursor = String::new();
        loop {
            let value = {
                let mut query = vec![("limit", USERS_LIST_PAGE_SIZE)];
                if !cursor.is_empty() {
                    query.push(("cursor", cursor.as_str()));
                }
                self.get("users.list", &query).await?
            };
            let page: UsersListResponseBody = serde_json::from_value(value)?;
            members.extend(page.members);
            cursor = page.response_metadata
                .map(|metadata| metadata.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                break;
            }
        }
        info!("slack users.list returned {} members", members.len());
        Ok(members)
    }

    // https://api.slack.com/methods/users.info
    async fn users_info(&self, user_id: &str) -> Result<SlackMember> {
        let value = self.get("users.info", &[("user", user_id)]).await?;
        let body: UsersInfoResponseBody = serde_json::from_value(value)?;
        Ok(body.user)
    }

    // https://api.slack.com/methods/conversations.replies
    async fn conversations_replies(&self, channel: &str, ts: &str) -> Result<Value> {
        self.get("conversations.replies", &[("channel", channel), ("ts", ts)]).await
    }

    // https://api.slack.com/methods/chat.postMessage
    async fn post_message(&self, message: &Value) -> Result<Value> {
        self.post("chat.postMessage", message).await
    }
}

fn parse_slack_response(method: &str, text: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(text)?;
    if value["ok"].as_bool() != Some(true) {
        let code = value["error"].as_str().unwrap_or("unknown_error");
        return Err(SlackApiError {
            method: method.to_string(),
            code: code.to_string(),
        }.into());
    }
    Ok(value)
}

/// Profile lookups backed by `users.info`.
pub struct SlackProfiles<'a> {
    api: &'a dyn SlackApi,
}

impl<'a> SlackProfiles<'a> {
    pub fn new(api: &'a dyn SlackApi) -> Self {
        Self {
            api,
        }
    }
}

#[async_trait]
impl<'a> ProfileSource for SlackProfiles<'a> {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let member = self.api.users_info(user_id).await?;
        if member.is_bot {
            return Ok(None);
        }
        Ok(Some(member.user_profile()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSlack;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answers one connection per canned body and hands back each raw request.
    async fn serve(bodies: Vec<Value>) -> (RuntimeConfig, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut requests = Vec::new();
            for body in bodies {
                let (mut stream, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut stream).await);
                let body = body.to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body,
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
            requests
        });
        let base = format!("http://{addr}/api");
        let config = RuntimeConfig::from_lookup(|key| match key {
            "SLACK_BOT_TOKEN" => Some("xoxb-test".to_string()),
            "SLACK_API_BASE" => Some(base.clone()),
            _ => None,
        }).unwrap();
        (config, server)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut raw = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_len = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-request");
            raw.extend_from_slice(&chunk[..n]);
            if let Some(i) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break i + 4;
            }
        };
        let head = String::from_utf8_lossy(&raw[..head_len]).to_lowercase();
        let content_length = head.lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|value| value.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        while raw.len() < head_len + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-body");
            raw.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8(raw).unwrap()
    }

    #[test]
    fn ok_false_is_slack_api_error() {
        let error = parse_slack_response("users.list", r#"{"ok":false,"error":"invalid_auth"}"#)
            .unwrap_err();
        let slack_error = error.downcast_ref::<SlackApiError>().unwrap();
        assert_eq!(slack_error.method, "users.list");
        assert_eq!(slack_error.code, "invalid_auth");
    }

    #[test]
    fn missing_ok_is_an_error() {
        let error = parse_slack_response("users.info", "{}").unwrap_err();
        assert_eq!(error.downcast_ref::<SlackApiError>().unwrap().code, "unknown_error");
        assert!(parse_slack_response("users.info", "<html>").is_err());
    }

    #[test]
    fn member_fields_default_when_missing() {
        let member: SlackMember = serde_json::from_value(json!({
            "id": "U1",
            "name": "alice",
            "profile": { "real_name": "Alice Smith" },
        })).unwrap();
        assert!(member.is_active_person());
        let candidate = member.candidate();
        assert_eq!(candidate, Candidate::new("U1", "Alice Smith", "", "alice"));
        assert_eq!(member.user_profile(), UserProfile {
            display_name: String::new(),
            real_name: "Alice Smith".to_string(),
            image: String::new(),
        });
    }

    #[tokio::test]
    async fn users_list_follows_cursor_across_pages() {
        let (config, server) = serve(vec![
            json!({
                "ok": true,
                "members": [{ "id": "U1", "name": "alice" }],
                "response_metadata": { "next_cursor": "dXNlcjpVMg==" },
            }),
            json!({
                "ok": true,
                "members": [{ "id": "U2", "name": "bob" }],
                "response_metadata": { "next_cursor": "" },
            }),
        ]).await;
        let members = SlackClient::new(&config).users_list().await.unwrap();
        let ids: Vec<&str> = members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["U1", "U2"]);

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("GET /api/users.list?limit=200 "), "{}", requests[0]);
        assert!(requests[1].starts_with("GET /api/users.list?limit=200&cursor=dXNlcjpVMg%3D%3D "), "{}", requests[1]);
        for request in &requests {
            assert!(request.to_lowercase().contains("authorization: bearer xoxb-test\r\n"), "{request}");
        }
    }

    #[tokio::test]
    async fn post_message_sends_json_with_bearer_token() {
        let (config, server) = serve(vec![json!({ "ok": true, "ts": "1.2" })]).await;
        let message = json!({ "channel": "C0ERR", "text": "boom" });
        let response = SlackClient::new(&config).post_message(&message).await.unwrap();
        assert_eq!(response["ts"], "1.2");

        let requests = server.await.unwrap();
        let (head, body) = requests[0].split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("POST /api/chat.postMessage "), "{head}");
        let head = head.to_lowercase();
        assert!(head.contains("authorization: bearer xoxb-test\r\n"), "{head}");
        assert!(head.contains("content-type: application/json"), "{head}");
        assert_eq!(serde_json::from_str::<Value>(body).unwrap(), message);
    }

    #[tokio::test]
    async fn slack_error_on_later_page_fails_the_listing() {
        let (config, server) = serve(vec![
            json!({
                "ok": true,
                "members": [{ "id": "U1" }],
                "response_metadata": { "next_cursor": "next" },
            }),
            json!({ "ok": false, "error": "ratelimited" }),
        ]).await;
        let error = SlackClient::new(&config).users_list().await.unwrap_err();
        assert_eq!(error.downcast_ref::<SlackApiError>().unwrap().code, "ratelimited");
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn profiles_skip_bots() {
        let slack = FakeSlack::default()
            .with_member(json!({ "id": "U1", "name": "alice", "profile": { "display_name": "ally", "image_48": "a.png" } }))
            .with_member(json!({ "id": "B1", "name": "deploybot", "is_bot": true }));
        let profiles = SlackProfiles::new(&slack);
        let profile = profiles.fetch_profile("U1").await.unwrap().unwrap();
        assert_eq!(profile.display_name, "ally");
        assert_eq!(profile.image, "a.png");
        assert_eq!(profiles.fetch_profile("B1").await.unwrap(), None);
        assert!(profiles.fetch_profile("U404").await.is_err());
    }
}
