use anyhow::Result;
use rmcp::{
    ServiceExt,
    transport::{
        stdio,
        streamable_http_server::{
            session::local::LocalSessionManager,
            tower::{StreamableHttpServerConfig, StreamableHttpService},
        },
    },
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// Axum HTTP server for remote MCP
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::{
    Router,
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
};

use mun_assistant::build_client;
use mun_assistant::config::{Config, TransportKind};
use mun_assistant::service::MunAssistantService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing to stderr for MCP compatibility
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    // A missing API key stops startup here
    let config = Arc::new(Config::load()?);
    let client = build_client(&config)?;

    let service = MunAssistantService::new(Arc::clone(&config), client);

    match config.transport.kind {
        TransportKind::Http => {
            let bind = config.transport.bind_addr()?;
            let path = config.transport.path.clone();
            let bearer_token = config.transport.bearer_token.clone();

            // Every MCP session gets its own views
            let session_manager: LocalSessionManager = Default::default();
            let http_service: StreamableHttpService<MunAssistantService, _> =
                StreamableHttpService::new(
                    move || Ok(service.new_session()),
                    Arc::new(session_manager),
                    StreamableHttpServerConfig {
                        stateful_mode: true,
                        sse_keep_alive: Some(Duration::from_secs(15)),
                    },
                );

            let mut router = Router::new().nest_service(path.as_str(), http_service);
            if let Some(expected) = bearer_token.clone() {
                router = router.layer(middleware::from_fn_with_state(
                    Arc::new(expected),
                    require_bearer,
                ));
            }

            let router = router.route("/health", axum::routing::get(|| async { "ok" }));

            let listener = tokio::net::TcpListener::bind(bind).await?;
            tracing::info!(
                %bind,
                path = %path,
                auth = %bearer_token.as_deref().map(|_| "bearer").unwrap_or("none"),
                "Starting Streamable HTTP MCP server"
            );

            axum::serve(listener, router).await?;
            Ok(())
        }
        TransportKind::Stdio => {
            tracing::info!("main: Service created, starting server on stdio transport");
            let server = service.serve(stdio()).await?;
            server.waiting().await?;
            tracing::info!("main: Server connection closed");
            Ok(())
        }
    }
}

async fn require_bearer(
    State(expected): State<Arc<String>>,
    req: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    if req.uri().path().eq("/health") {
        return next.run(req).await;
    }
    let headers: &HeaderMap = req.headers();
    let header_ok = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", expected.as_str()));
    // Clients that cannot set headers may pass access_token or token in the query
    let query_ok = req.uri().query().is_some_and(|q| {
        q.split('&').filter_map(|pair| pair.split_once('=')).any(|(k, v)| {
            (k == "access_token" || k == "token") && v == expected.as_str()
        })
    });
    if !(header_ok || query_ok) {
        tracing::warn!(path = %req.uri().path(), "Rejected unauthenticated request");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(req).await
}
