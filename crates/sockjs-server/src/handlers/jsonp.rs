//! JSONP carrier
//!
//! Polling via a script tag: each response is one `callback("frame");`
//! invocation. The send path accepts either a form-encoded `d` field or a
//! raw `text/plain` body.

use super::carrier::serve_carrier;
use super::xhr::accept_payload;
use super::{headers, not_found, text_response, valid_session_path};
use crate::server::ServerState;
use crate::transport::CarrierPolicy;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use serde::Deserialize;
use sockjs_common::AppError;

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackQuery {
    #[serde(default)]
    pub(crate) c: String,
}

#[derive(Debug, Deserialize)]
struct SendForm {
    #[serde(default)]
    d: String,
}

/// `GET .../jsonp` — JSONP polling carrier
pub(crate) async fn polling(
    State(state): State<ServerState>,
    Path((server_id, session_id)): Path<(String, String)>,
    Query(query): Query<CallbackQuery>,
    req_headers: HeaderMap,
) -> Response {
    if !valid_session_path(&server_id, &session_id) {
        return not_found();
    }
    if query.c.is_empty() {
        return text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#""callback" parameter required"#,
        );
    }
    serve_carrier(state, session_id, CarrierPolicy::jsonp(&query.c), req_headers).await
}

/// `POST .../jsonp_send` — like xhr_send, body shape depends on content type
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

    let payload = match extract_send_content(&req_headers, &body) {
        Ok(payload) => payload,
        Err(e) => return send_error(&e, &req_headers, &state),
    };
    if payload.is_empty() {
        return send_error(&AppError::EmptyPayload, &req_headers, &state);
    }
    if let Err(e) = accept_payload(&session, payload.as_bytes()) {
        return send_error(&e, &req_headers, &state);
    }

    let mut response = Response::new(Body::from("ok"));
    let h = response.headers_mut();
    h.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=UTF-8"),
    );
    headers::no_cache(h);
    headers::cors(h, &req_headers);
    headers::session_cookie(h, &req_headers, state.options().cookie_needed);
    response
}

/// Pull the payload out of a jsonp_send body.
fn extract_send_content(req_headers: &HeaderMap, body: &[u8]) -> Result<String, AppError> {
    let content_type = req_headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();

    match content_type.as_str() {
        "application/x-www-form-urlencoded" => {
            let form: SendForm = serde_urlencoded::from_bytes(body)
                .map_err(|_| AppError::BadRequest("Could not parse query".to_string()))?;
            Ok(form.d)
        }
        "text/plain" => Ok(String::from_utf8_lossy(body).into_owned()),
        _ => Err(AppError::BadRequest("Unrecognized content type".to_string())),
    }
}

fn send_error(err: &AppError, req_headers: &HeaderMap, state: &ServerState) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = text_response(status, &err.to_string());
    let h = response.headers_mut();
    headers::no_cache(h);
    headers::cors(h, req_headers);
    headers::session_cookie(h, req_headers, state.options().cookie_needed);
    response
}
