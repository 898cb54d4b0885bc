use std::sync::Arc;

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use tracing::Level;

mod cors;
mod error_reports;
mod requests;
mod responses;
mod runtime_config;
mod runtime_context;
mod slack_client;
mod thread_requests;
mod user_requests;
#[cfg(test)]
mod test_support;

use cors::{CorsHeaders, CorsRule};
use error_reports::ErrorReportHandler;
use responses::Responder;
use runtime_config::RuntimeConfig;
use runtime_context::RuntimeContext;
use thread_requests::ThreadRequestHandler;
use user_requests::UserRequestHandler;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    FindUser,
    UsersList,
    ThreadReplies,
    ErrorReport,
    NotFound,
}

impl Route {
    fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/api/findUser" => Route::FindUser,
            "/api/usersList" => Route::UsersList,
            "/api/threadReplies" => Route::ThreadReplies,
            "/api/errorReport" => Route::ErrorReport,
            _ => Route::NotFound,
        }
    }
}

// https://github.com/awslabs/aws-lambda-rust-runtime/tree/main/examples
async fn function_handler(event: Request, context: &Arc<RuntimeContext>) -> Result<Response<Body>, Error> {
    let path = event.raw_http_path();
    let path = if path.is_empty() { event.uri().path().to_string() } else { path.to_string() };
    tracing::info!("{} {}", event.method(), path);
    match Route::from_path(&path) {
        Route::FindUser => {
            let handler = UserRequestHandler::new(context);
            handler.handle_find_user(event).await
        },
        Route::UsersList => {
            let handler = UserRequestHandler::new(context);
            handler.handle_users_list(event).await
        },
        Route::ThreadReplies => {
            let handler = ThreadRequestHandler::new(context);
            handler.handle_thread_replies(event).await
        },
        Route::ErrorReport => {
            let handler = ErrorReportHandler::new(context);
            handler.handle_error_report(event).await
        },
        Route::NotFound => {
            handle_not_found(event, context).await
        }
    }
}

async fn handle_not_found(event: Request, context: &Arc<RuntimeContext>) -> Result<Response<Body>, Error> {
    let allowed_origins = &context.config().allowed_origins;
    let responder = Responder::new(CorsHeaders::for_request(allowed_origins, &event, CorsRule::READ));
    responder.not_found()
}

/// Logs a configuration failure so it reaches CloudWatch before the cold start aborts.
fn checked_config(config: anyhow::Result<RuntimeConfig>) -> Result<RuntimeConfig, Error> {
    config.map_err(|error| {
        tracing::error!("invalid configuration {:?}", error);
        error.into()
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = RuntimeConfig::from_env();
    let log_level = config.as_ref().map_or(Level::INFO, |config| config.log_level);
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();
    let config = checked_config(config)?;
    let runtime_context = RuntimeContext::new(config);
    let func = |event| async {
        function_handler(event, &runtime_context).await
    };
    run(service_fn(func)).await
}
