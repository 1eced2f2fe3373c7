//! WebSocket carriers
//!
//! Two flavors. The raw endpoint hands the application an unframed socket:
//! no open/heartbeat/close frames, messages pass through untouched. The
//! framed per-session endpoint speaks the same frame protocol as the HTTP
//! carriers, one WebSocket text message per frame, driven through a real
//! session so heartbeats and close semantics match.

use super::{not_found, text_response};
use crate::server::ServerState;
use crate::session::{AttachOutcome, Conn, Session};
use crate::transport::{CarrierPolicy, Receiver};
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use sockjs_proto::parse_payload;
use std::convert::Infallible;
use std::sync::Weak;
use tokio::sync::mpsc;

/// `GET {base}/websocket` — raw WebSocket, no SockJS framing
pub(crate) async fn raw(State(state): State<ServerState>, ws: WebSocketUpgrade) -> Response {
    if !state.options().websocket_enabled {
        return not_found();
    }
    let handler = state.handler();
    ws.on_upgrade(move |socket| handler(Conn::from_raw_socket(socket)))
}

/// Rewrites quirky upgrade requests before extraction: hybi-13 clients that
/// put the origin in `Sec-WebSocket-Origin`, and proxies that send
/// `Connection: keep-alive, Upgrade`.
pub(crate) async fn normalize_upgrade_request(mut request: Request) -> Request {
    let headers = request.headers_mut();

    let is_v13 = headers
        .get("Sec-WebSocket-Version")
        .is_some_and(|v| v.as_bytes() == b"13");
    if is_v13 && !headers.contains_key(header::ORIGIN) {
        if let Some(origin) = headers.get("Sec-WebSocket-Origin").cloned() {
            headers.insert(header::ORIGIN, origin);
        }
    }

    if let Some(connection) = headers.get(header::CONNECTION).and_then(|v| v.to_str().ok()) {
        let tokens: Vec<String> = connection
            .split(',')
            .map(|t| t.trim().to_ascii_lowercase())
            .collect();
        if tokens == ["keep-alive", "upgrade"] {
            headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
        }
    }

    request
}

/// `{base}/{server}/{session}/websocket` — framed WebSocket carrier
pub(crate) async fn framed(
    State(state): State<ServerState>,
    Path((_server_id, session_id)): Path<(String, String)>,
    method: Method,
    req_headers: HeaderMap,
    ws: Result<WebSocketUpgrade, axum::extract::ws::rejection::WebSocketUpgradeRejection>,
) -> Response {
    if !state.options().websocket_enabled {
        return not_found();
    }
    if method != Method::GET {
        // Bare 405: status line, Allow, nothing else.
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET"));
        return response;
    }
    if !header_equals_ignore_case(&req_headers, header::UPGRADE, "websocket") {
        return text_response(StatusCode::BAD_REQUEST, r#"Can "Upgrade" only to "WebSocket"."#);
    }
    if !header_equals_ignore_case(&req_headers, header::CONNECTION, "upgrade") {
        return text_response(StatusCode::BAD_REQUEST, r#""Connection" must be "Upgrade"."#);
    }
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };
    ws.on_upgrade(move |socket| framed_session(state, session_id, socket))
}

fn header_equals_ignore_case(headers: &HeaderMap, name: header::HeaderName, expected: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case(expected))
}

/// Drive one framed WebSocket connection through the session machinery.
async fn framed_session(state: ServerState, session_id: String, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Result<Bytes, Infallible>>(64);

    // Forwarder: frame bytes out of the receiver channel, one text message
    // each. Ends when the receiver is dropped, then closes the socket.
    let forward = tokio::spawn(async move {
        while let Some(Ok(chunk)) = rx.recv().await {
            let text = String::from_utf8_lossy(&chunk).into_owned();
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
        let _ = sink.close().await;
    });

    // WebSocket sessions live and die with their socket; the registry never
    // sees them.
    let session = Session::new(
        session_id,
        Weak::new(),
        state.options().heartbeat_delay(),
        state.options().disconnect_delay(),
    );
    let policy = CarrierPolicy::websocket();
    let receiver = Receiver::new(tx, policy.wrap.clone(), policy.max_bytes);

    let outcome = session.attach_receiver(policy.kind, receiver).await;
    if !matches!(outcome, AttachOutcome::AttachedFresh(_)) {
        session.close().await;
        return;
    }

    let handler = state.handler();
    tokio::spawn(handler(Conn::from_session(session.clone())));

    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => match parse_payload(text.as_bytes()) {
                    Ok(msgs) => {
                        if session.push_inbound(msgs).is_err() {
                            tracing::debug!(session_id = %session.id(), "Inbound queue full on WebSocket");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(session_id = %session.id(), error = %e, "Bad WebSocket payload");
                        break;
                    }
                },
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Binary(_))) => break,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(session_id = %session.id(), error = %e, "WebSocket receive failed");
                    break;
                }
            },
            _ = session.wait_closed() => break,
        }
    }

    session.close().await;
    let _ = forward.await;
}
