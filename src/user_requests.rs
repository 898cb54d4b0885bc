
use std::sync::Arc;

use anyhow::Result;
use cores::directory::Candidate;
use cores::resolver::resolve;
use lambda_http::http::Method;
use lambda_http::{Body, Error, Request, Response};
use serde::Serialize;
use tracing::info;

use crate::cors::{CorsHeaders, CorsRule, MethodGate};
use crate::requests::query_param;
use crate::responses::Responder;
use crate::runtime_context::RuntimeContext;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct FindUserResponseBody {
    ok: bool,
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    closest_match: Option<String>,
    score: f64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct DirectoryUser {
    id: String,
    name: String,
    real_name: String,
    display_name: String,
    image: String,
}

#[derive(Serialize, Debug)]
struct UsersListResponseBody {
    ok: bool,
    users: Vec<DirectoryUser>,
}

/// `/api/findUser` and `/api/usersList`.
pub struct UserRequestHandler {
    runtime_context: Arc<RuntimeContext>,
}

impl UserRequestHandler {
    pub fn new(runtime_context: &Arc<RuntimeContext>) -> Arc<Self> {
        let runtime_context = Arc::clone(runtime_context);
        let handler = Self {
            runtime_context,
        };
        Arc::new(handler)
    }

    fn responder(&self, event: &Request, rule: CorsRule) -> Responder {
        let allowed_origins = &self.runtime_context.config().allowed_origins;
        Responder::new(CorsHeaders::for_request(allowed_origins, event, rule))
    }

    pub async fn handle_find_user(&self, event: Request) -> Result<Response<Body>, Error> {
        let responder = self.responder(&event, CorsRule::READ);
        match MethodGate::check(event.method(), &Method::GET) {
            MethodGate::Preflight => return responder.preflight(),
            MethodGate::NotAllowed => return responder.method_not_allowed(),
            MethodGate::Allowed => {}
        }
        let Some(name) = query_param(&event, "name") else {
            return responder.bad_request("Missing name parameter");
        };
        match self.find_user(name).await {
            Ok(body) => responder.ok(&body),
            Err(error) => responder.failure("/api/findUser", error),
        }
    }

    pub async fn handle_users_list(&self, event: Request) -> Result<Response<Body>, Error> {
        let responder = self.responder(&event, CorsRule::READ_ONLY);
        match MethodGate::check(event.method(), &Method::GET) {
            MethodGate::Preflight => return responder.preflight(),
            MethodGate::NotAllowed => return responder.method_not_allowed(),
            MethodGate::Allowed => {}
        }
        match self.users_list().await {
            Ok(body) => responder.ok(&body),
            Err(error) => responder.failure("/api/usersList", error),
        }
    }

    async fn find_user(&self, name: &str) -> Result<FindUserResponseBody> {
        let members = self.runtime_context.slack().users_list().await?;
        let candidates: Vec<Candidate> = members.iter()
            .filter(|member| member.is_active_person())
            .map(|member| member.candidate())
            .collect();
        let policy = &self.runtime_context.config().match_policy;
        let result = resolve(name, &candidates, policy);
        info!("findUser {:?} best score {:.1} over {} candidates", name, result.score, candidates.len());
        let body = if result.is_match() {
            FindUserResponseBody {
                ok: true,
                user_id: result.candidate_id,
                display_name: result.display_name,
                closest_match: None,
                score: result.score,
            }
        } else {
            FindUserResponseBody {
                ok: true,
                user_id: None,
                display_name: None,
                closest_match: result.display_name,
                score: result.score,
            }
        };
        Ok(body)
    }

    async fn users_list(&self) -> Result<UsersListResponseBody> {
        let members = self.runtime_context.slack().users_list().await?;
        let users = members.iter()
            .filter(|member| member.is_active_person())
            .map(|member| DirectoryUser {
                id: member.id.clone(),
                name: member.name.clone(),
                real_name: member.real_name().to_string(),
                display_name: member.display_name().to_string(),
                image: member.image().to_string(),
            })
            .collect();
        Ok(UsersListResponseBody {
            ok: true,
            users,
        })
    }
}
