//! Server setup
//!
//! Router assembly for the full SockJS URL surface and the server runner.

use crate::handlers::{
    eventsource, htmlfile, iframe, info, jsonp, not_found, text_response, websocket, xhr,
};
use crate::session::SessionRegistry;
use crate::Handler;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::routing::{any, get, post};
use axum::{middleware, Router};
use sockjs_common::config::{AppConfig, SockJsConfig};
use sockjs_common::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared state behind every handler
#[derive(Clone)]
pub struct ServerState {
    /// Protocol options for this router
    options: Arc<SockJsConfig>,
    /// All live sessions
    registry: Arc<SessionRegistry>,
    /// The application handler, spawned once per connection
    handler: Handler,
}

impl ServerState {
    /// Create server state with a fresh session registry
    pub fn new(options: SockJsConfig, handler: Handler) -> Self {
        let registry = SessionRegistry::new(options.heartbeat_delay(), options.disconnect_delay());
        Self {
            options: Arc::new(options),
            registry,
            handler,
        }
    }

    /// Get the protocol options
    pub fn options(&self) -> &SockJsConfig {
        &self.options
    }

    /// Get the session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Get a clone of the application handler
    pub fn handler(&self) -> Handler {
        self.handler.clone()
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish()
    }
}

/// Create the SockJS router mounted under `base_url`
pub fn create_router(base_url: &str) -> Router<ServerState> {
    let session_routes = Router::new()
        .route(
            "/websocket",
            any(websocket::framed)
                .layer(middleware::map_request(websocket::normalize_upgrade_request)),
        )
        .route("/xhr", post(xhr::polling).options(xhr::options_post))
        .route("/xhr_streaming", post(xhr::streaming).options(xhr::options_post))
        .route("/xhr_send", post(xhr::send).options(xhr::options_post))
        .route(
            "/eventsource",
            get(eventsource::streaming).options(eventsource::options_get),
        )
        .route("/jsonp", get(jsonp::polling).options(eventsource::options_get))
        .route("/jsonp_send", post(jsonp::send).options(xhr::options_post))
        .route("/htmlfile", get(htmlfile::streaming));

    let base = Router::new()
        .route("/", get(greeting))
        .route("/info", get(info::info).options(info::options))
        .route("/iframe.html", get(iframe::iframe))
        .route("/websocket", get(websocket::raw))
        .nest("/{server_id}/{session_id}", session_routes)
        // Versioned iframe names (`iframe-1.2.3.min.html`) cannot be a
        // route pattern, so they land in the fallback.
        .fallback(base_fallback);

    Router::new().nest(base_url, base)
}

/// Greeting served at the router root
async fn greeting() -> Response {
    text_response(StatusCode::OK, "Welcome to SockJS!\n")
}

/// Catch single-segment `iframe-*.html` requests; everything else is 404.
async fn base_fallback(
    State(state): State<ServerState>,
    method: Method,
    req_headers: HeaderMap,
    uri: Uri,
) -> Response {
    if method == Method::GET {
        let base = state.options().base_url.trim_end_matches('/').to_string();
        if let Some(rest) = uri.path().strip_prefix(&base) {
            let name = rest.trim_start_matches('/');
            if !name.contains('/') && is_iframe_name(name) {
                return iframe::iframe(State(state), req_headers).await;
            }
        }
    }
    not_found()
}

fn is_iframe_name(name: &str) -> bool {
    name.strip_prefix("iframe")
        .and_then(|rest| rest.strip_suffix(".html"))
        .is_some_and(|version| version.is_empty() || version.starts_with('-'))
}

/// Build the complete application
pub fn create_app(state: ServerState) -> Router {
    let base_url = state.options().base_url.trim_end_matches('/').to_string();
    create_router(&base_url)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server on `addr` until it fails
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("SockJS server listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run a complete server from configuration
pub async fn run(config: AppConfig, handler: Handler) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .server
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Bad listen address: {e}")))?;

    let state = ServerState::new(config.sockjs, handler);
    let app = create_app(state);
    run_server(app, addr).await
}
