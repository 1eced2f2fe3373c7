//! HTMLFile carrier
//!
//! Streaming via `<script>` blocks evaluated inside a hidden iframe; the
//! client names the parent callback in the `c` query parameter.

use super::carrier::serve_carrier;
use super::{not_found, text_response, valid_session_path};
use crate::server::ServerState;
use crate::transport::CarrierPolicy;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackQuery {
    #[serde(default)]
    pub(crate) c: String,
}

/// `GET .../htmlfile` — HTML streaming carrier
pub(crate) async fn streaming(
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
    serve_carrier(
        state,
        session_id,
        CarrierPolicy::htmlfile(&query.c),
        req_headers,
    )
    .await
}
