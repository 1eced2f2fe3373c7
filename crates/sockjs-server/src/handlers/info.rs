//! Info endpoint
//!
//! Clients probe `{base}/info` before picking a carrier: does the server
//! speak WebSocket, does the load balancer need cookies, and a random
//! entropy value so concurrent tabs spread across session ids.

use super::headers;
use crate::server::ServerState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct InfoPayload {
    websocket: bool,
    cookie_needed: bool,
    origins: Vec<String>,
    entropy: u32,
}

impl InfoPayload {
    fn new(websocket: bool, cookie_needed: bool) -> Self {
        let mut bytes = [0u8; 4];
        OsRng.fill_bytes(&mut bytes);
        Self {
            websocket,
            cookie_needed,
            origins: vec!["*:*".to_string()],
            entropy: u32::from_le_bytes(bytes),
        }
    }
}

/// `GET {base}/info`
pub(crate) async fn info(State(state): State<ServerState>, req_headers: HeaderMap) -> Response {
    let options = state.options();
    let payload = InfoPayload::new(options.websocket_enabled, options.cookie_needed);
    let body = match serde_json::to_vec(&payload) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Info payload failed to serialize");
            return super::text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        }
    };

    let mut response = Response::new(Body::from(body));
    let h = response.headers_mut();
    h.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=UTF-8"),
    );
    headers::no_cache(h);
    headers::cors(h, &req_headers);
    response
}

/// `OPTIONS {base}/info`
pub(crate) async fn options(req_headers: HeaderMap) -> Response {
    headers::preflight(&req_headers, "GET")
}
