
use lambda_http::http::{HeaderMap, HeaderValue, Method};
use lambda_http::http::response::Builder;
use lambda_http::Request;

pub const MAX_AGE_SECONDS: &str = "86400";

/// Per-endpoint CORS settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorsRule {
    pub allow_methods: &'static str,
    pub allow_headers: &'static str,
}

impl CorsRule {
    pub const READ: CorsRule = CorsRule {
        allow_methods: "GET, POST, OPTIONS",
        allow_headers: "Content-Type, Authorization",
    };
    pub const READ_ONLY: CorsRule = CorsRule {
        allow_methods: "GET, OPTIONS",
        allow_headers: "Content-Type, Authorization",
    };
    pub const REPORT: CorsRule = CorsRule {
        allow_methods: "POST, OPTIONS",
        allow_headers: "Content-Type",
    };
}

/// Response headers for a request coming from `origin`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorsHeaders {
    pub allow_origin: String,
    pub rule: CorsRule,
}

impl CorsHeaders {
    /// Echoes an allowed origin, otherwise answers with the first allowed one.
    pub fn new(allowed_origins: &[String], origin: Option<&str>, rule: CorsRule) -> Self {
        let allow_origin = origin
            .and_then(|origin| allowed_origins.iter().find(|allowed| allowed.as_str() == origin))
            .or_else(|| allowed_origins.first())
            .cloned()
            .unwrap_or_else(|| "*".to_string());
        Self {
            allow_origin,
            rule,
        }
    }

    pub fn for_request(allowed_origins: &[String], request: &Request, rule: CorsRule) -> Self {
        Self::new(allowed_origins, request_origin(request.headers()), rule)
    }

    pub fn apply(&self, builder: Builder) -> Builder {
        builder
            .header("Access-Control-Allow-Origin", self.allow_origin.as_str())
            .header("Access-Control-Allow-Methods", self.rule.allow_methods)
            .header("Access-Control-Allow-Headers", self.rule.allow_headers)
            .header("Access-Control-Max-Age", MAX_AGE_SECONDS)
    }
}

fn request_origin(headers: &HeaderMap<HeaderValue>) -> Option<&str> {
    headers.get("origin")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// How an endpoint should treat a method before doing any work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodGate {
    Preflight,
    Allowed,
    NotAllowed,
}

impl MethodGate {
    pub fn check(method: &Method, allowed: &Method) -> Self {
        if method == Method::OPTIONS {
            MethodGate::Preflight
        } else if method == allowed {
            MethodGate::Allowed
        } else {
            MethodGate::NotAllowed
        }
    }
}
