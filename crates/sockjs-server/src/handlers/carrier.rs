//! Common carrier shape
//!
//! Every HTTP carrier request goes through the same steps: build a
//! channel-backed streaming response, write the carrier's prelude, run the
//! attach decision against the session, and then either return after the
//! first frame (polling) or hold the response open until the client
//! disconnects, the byte cap trips, or the session closes.
//!
//! The channel-backed body is the axum equivalent of hijacking the
//! connection: the server never buffers whole responses, each chunk is
//! flushed as written, and the client going away surfaces as the channel
//! closing.

use super::headers;
use crate::server::ServerState;
use crate::session::{AttachOutcome, Conn, Session};
use crate::transport::{CarrierPolicy, Receiver, Transport};
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;
use bytes::Bytes;
use sockjs_proto::{CloseReason, Frame};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Why a held receiver stopped holding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldEnd {
    /// The client dropped the connection while the session was still open
    ClientGone,
    /// The receiver closed itself after exceeding the carrier byte cap
    Volunteer,
    /// The session was closed underneath the receiver
    SessionClosed,
}

/// Serve one carrier request: 200 + carrier headers + a streaming body fed
/// by the session.
pub(crate) async fn serve_carrier(
    state: ServerState,
    session_id: String,
    policy: CarrierPolicy,
    req_headers: HeaderMap,
) -> Response {
    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(32);
    let receiver = Receiver::new(tx.clone(), policy.wrap.clone(), policy.max_bytes);

    let mut response = Response::new(Body::from_stream(ReceiverStream::new(rx)));
    let h = response.headers_mut();
    h.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(policy.content_type),
    );
    headers::no_cache(h);
    headers::cors(h, &req_headers);
    headers::echo_allow_headers(h, &req_headers);
    headers::session_cookie(h, &req_headers, state.options().cookie_needed);

    tokio::spawn(drive_carrier(state, session_id, policy, receiver, tx));
    response
}

/// The per-request task that owns the downstream side of the response.
async fn drive_carrier(
    state: ServerState,
    session_id: String,
    policy: CarrierPolicy,
    receiver: Arc<Receiver>,
    tx: mpsc::Sender<Result<Bytes, Infallible>>,
) {
    if let Some(prelude) = policy.prelude() {
        if tx.send(Ok(prelude)).await.is_err() {
            return;
        }
    }

    let (session, _created) = state.registry().get_or_create(&session_id);
    match session.attach_receiver(policy.kind, receiver.clone()).await {
        AttachOutcome::Closed => {
            let frame = Frame::close(CloseReason::GoAway).encode();
            let _ = receiver.send_frame(&frame).await;
        }
        AttachOutcome::WrongKind => {
            tracing::debug!(session_id = %session_id, carrier = %policy.kind, "Carrier kind mismatch");
            let frame = Frame::close(CloseReason::OtherCarrier).encode();
            let _ = receiver.send_frame(&frame).await;
        }
        AttachOutcome::Occupied => {
            tracing::debug!(session_id = %session_id, "Receiver slot occupied");
            let frame = Frame::close(CloseReason::AnotherConnection).encode();
            let _ = receiver.send_frame(&frame).await;
        }
        AttachOutcome::AttachedFresh(transport) => {
            let conn = Conn::from_session(session.clone());
            let handler = state.handler();
            tokio::spawn(handler(conn));

            if policy.streaming {
                hold(&state, &session, &transport, &receiver, &tx).await;
            } else {
                // Polling: the open frame is the whole response.
                transport.detach(&receiver).await;
                receiver.close();
                session.receiver_detached();
            }
        }
        AttachOutcome::Attached(transport) => {
            hold(&state, &session, &transport, &receiver, &tx).await;
        }
    }
}

/// Keep the response open until something ends it, then detach and settle
/// the session's fate.
async fn hold(
    state: &ServerState,
    session: &Arc<Session>,
    transport: &Arc<Transport>,
    receiver: &Arc<Receiver>,
    tx: &mpsc::Sender<Result<Bytes, Infallible>>,
) {
    let end = tokio::select! {
        _ = tx.closed() => HoldEnd::ClientGone,
        _ = receiver.wait_closed() => {
            if session.is_closed() {
                HoldEnd::SessionClosed
            } else if receiver.volunteered() {
                HoldEnd::Volunteer
            } else {
                HoldEnd::ClientGone
            }
        }
        _ = session.wait_closed() => HoldEnd::SessionClosed,
    };

    transport.detach(receiver).await;
    receiver.close();

    match end {
        HoldEnd::ClientGone if !session.is_closed() => {
            // An unsolicited disconnect kills the session outright; the
            // client did not volunteer to reconnect.
            tracing::debug!(session_id = %session.id(), "Client dropped attached receiver");
            state.registry().remove(session.id(), session);
            session.close().await;
        }
        HoldEnd::Volunteer => session.receiver_detached(),
        HoldEnd::ClientGone | HoldEnd::SessionClosed => {}
    }
}
