//! EventSource carrier

use super::carrier::serve_carrier;
use super::{headers, not_found, valid_session_path};
use crate::server::ServerState;
use crate::transport::CarrierPolicy;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;

/// `GET .../eventsource` — SSE streaming carrier
pub(crate) async fn streaming(
    State(state): State<ServerState>,
    Path((server_id, session_id)): Path<(String, String)>,
    req_headers: HeaderMap,
) -> Response {
    if !valid_session_path(&server_id, &session_id) {
        return not_found();
    }
    serve_carrier(state, session_id, CarrierPolicy::eventsource(), req_headers).await
}

/// `OPTIONS` preflight for the GET-verb endpoints
pub(crate) async fn options_get(req_headers: HeaderMap) -> Response {
    headers::preflight(&req_headers, "GET")
}
