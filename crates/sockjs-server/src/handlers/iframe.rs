//! Iframe endpoint
//!
//! The hidden iframe page SockJS clients use for cross-domain transports.
//! Served cache-forever with an MD5 ETag so reloads collapse into 304s.

use super::headers;
use crate::server::ServerState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use md5::{Digest, Md5};

const IFRAME_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta http-equiv="X-UA-Compatible" content="IE=edge" />
  <meta http-equiv="Content-Type" content="text/html; charset=UTF-8" />
  <script>
    document.domain = document.domain;
    _sockjs_onload = function(){SockJS.bootstrap_iframe();};
  </script>
  <script src="SOCKJS_URL"></script>
</head>
<body>
  <h2>Don't panic!</h2>
  <p>This is a SockJS hidden iframe. It's used for cross domain magic.</p>
</body>
</html>"#;

fn iframe_document(sockjs_url: &str) -> String {
    IFRAME_TEMPLATE.replace("SOCKJS_URL", sockjs_url)
}

fn etag_for(document: &str) -> String {
    let digest = Md5::digest(document.as_bytes());
    format!("\"{}\"", hex::encode(digest))
}

/// `GET {base}/iframe[-ver].html`
pub(crate) async fn iframe(State(state): State<ServerState>, req_headers: HeaderMap) -> Response {
    let document = iframe_document(&state.options().sockjs_url);
    let etag = etag_for(&document);

    let matches = req_headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);
    if matches {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        return response;
    }

    let mut response = Response::new(Body::from(document));
    let h = response.headers_mut();
    h.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=UTF-8"),
    );
    headers::cache_forever(h);
    if let Ok(value) = HeaderValue::from_str(&etag) {
        h.insert(header::ETAG, value);
    }
    response
}
