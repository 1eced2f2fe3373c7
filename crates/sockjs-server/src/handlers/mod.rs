//! HTTP handlers
//!
//! One module per carrier plus the shared carrier shape, the header
//! utilities, and the static endpoints (info, iframe).

pub(crate) mod carrier;
pub(crate) mod eventsource;
pub(crate) mod headers;
pub(crate) mod htmlfile;
pub(crate) mod iframe;
pub(crate) mod info;
pub(crate) mod jsonp;
pub(crate) mod websocket;
pub(crate) mod xhr;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

/// Server id / session id segments may not contain `.` and may not be empty.
pub(crate) fn valid_session_path(server_id: &str, session_id: &str) -> bool {
    let ok = |segment: &str| !segment.is_empty() && !segment.contains('.');
    ok(server_id) && ok(session_id)
}

/// Plain-text response with the given status.
pub(crate) fn text_response(status: StatusCode, body: &str) -> Response {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=UTF-8"),
    );
    response
}

pub(crate) fn not_found() -> Response {
    text_response(StatusCode::NOT_FOUND, "Not Found")
}
