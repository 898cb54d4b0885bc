
use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::directory::UserProfile;

/// Looks up a user's profile by id.
///
/// `Ok(None)` means the user exists but has no profile worth showing (bots).
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
}

/// A message from a thread. Only the author id is interpreted, every other
/// field is passed through untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ThreadMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EnrichedMessage {
    #[serde(flatten)]
    pub message: ThreadMessage,
    pub user_profile: Option<UserProfile>,
}

/// Attaches the author's profile to every message, keeping input order.
///
/// Each distinct user id is looked up once and all lookups run concurrently.
/// A lookup that fails only blanks the profile of that user's messages.
pub async fn enrich_thread(messages: Vec<ThreadMessage>, source: &dyn ProfileSource) -> Vec<EnrichedMessage> {
    let user_ids: Vec<&str> = {
        let mut seen = HashSet::new();
        messages.iter()
            .filter_map(|message| message.user.as_deref())
            .filter(|user_id| seen.insert(*user_id))
            .collect()
    };
    let lookups = user_ids.into_iter()
        .map(|user_id| async move {
            let profile = match source.fetch_profile(user_id).await {
                Ok(profile) => profile,
                Err(error) => {
                    warn!("profile lookup failed for {}: {:?}", user_id, error);
                    None
                }
            };
            (user_id.to_string(), profile)
        });
    let profiles: HashMap<String, Option<UserProfile>> = join_all(lookups).await
        .into_iter()
        .collect();
    messages.into_iter()
        .map(|message| {
            let user_profile = message.user.as_ref()
                .and_then(|user_id| profiles.get(user_id))
                .cloned()
                .flatten();
            EnrichedMessage {
                message,
                user_profile,
            }
        })
        .collect()
}
