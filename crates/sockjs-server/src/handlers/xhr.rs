//! XHR carriers
//!
//! XHR polling, XHR streaming, and the XHR send path.

use super::carrier::serve_carrier;
use super::{headers, not_found, valid_session_path};
use crate::server::ServerState;
use crate::transport::CarrierPolicy;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use sockjs_common::{AppError, AppResult};
use sockjs_proto::parse_payload;

/// `POST .../xhr` — polling carrier
pub(crate) async fn polling(
    State(state): State<ServerState>,
    Path((server_id, session_id)): Path<(String, String)>,
    req_headers: HeaderMap,
) -> Response {
    if !valid_session_path(&server_id, &session_id) {
        return not_found();
    }
    serve_carrier(state, session_id, CarrierPolicy::xhr_polling(), req_headers).await
}

/// `POST .../xhr_streaming` — streaming carrier
pub(crate) async fn streaming(
    State(state): State<ServerState>,
    Path((server_id, session_id)): Path<(String, String)>,
    req_headers: HeaderMap,
) -> Response {
    if !valid_session_path(&server_id, &session_id) {
        return not_found();
    }
    serve_carrier(state, session_id, CarrierPolicy::xhr_streaming(), req_headers).await
}

/// `OPTIONS` preflight for the POST-verb endpoints
pub(crate) async fn options_post(req_headers: HeaderMap) -> Response {
    headers::preflight(&req_headers, "POST")
}

/// `POST .../xhr_send` — inject client messages into the session
pub(crate) async fn send(
    State(state): State<ServerState>,
    Path((server_id, session_id)): Path<(String, String)>,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !valid_session_path(&server_id, &session_id) {
        return not_found();
    }
    let Some(session) = state.registry().get(&session_id) else {
        return not_found();
    };

    match accept_payload(&session, &body) {
        Ok(()) => send_response(StatusCode::NO_CONTENT, Body::empty(), &req_headers, &state),
        Err(e) => send_response(
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Body::from(e.to_string()),
            &req_headers,
            &state,
        ),
    }
}

/// Decode and enqueue one send payload. The error's display string goes on
/// the wire.
pub(crate) fn accept_payload(session: &crate::session::Session, body: &[u8]) -> AppResult<()> {
    if body.is_empty() {
        return Err(AppError::EmptyPayload);
    }
    let msgs = parse_payload(body).map_err(|_| AppError::BrokenJson)?;
    session.push_inbound(msgs).map_err(|_| AppError::QueueFull)
}

fn send_response(
    status: StatusCode,
    body: Body,
    req_headers: &HeaderMap,
    state: &ServerState,
) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    let h = response.headers_mut();
    h.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=UTF-8"),
    );
    headers::no_cache(h);
    headers::cors(h, req_headers);
    headers::session_cookie(h, req_headers, state.options().cookie_needed);
    response
}
