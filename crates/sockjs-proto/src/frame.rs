//! SockJS frames
//!
//! The unit of protocol between server and client. Carriers wrap the
//! encoded bytes further (newline, SSE `data:`, `<script>` block, JSONP
//! callback); this module only produces the inner frame.

use crate::close_codes::CloseReason;
use crate::escape::escape_message;

/// One server-to-client frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Session opened (`o`)
    Open,
    /// Keep-alive (`h`)
    Heartbeat,
    /// Session closing (`c[code,"reason"]`)
    Close { code: u16, reason: String },
    /// Application messages (`a["m1","m2",...]`)
    Message(Vec<String>),
}

impl Frame {
    /// Create a close frame from a well-known reason
    #[must_use]
    pub fn close(reason: CloseReason) -> Self {
        Self::Close {
            code: reason.code(),
            reason: reason.reason().to_string(),
        }
    }

    /// Create a message frame batching the given payloads
    #[must_use]
    pub fn message(msgs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Message(msgs.into_iter().map(Into::into).collect())
    }

    /// Encode the frame into its wire bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Open => b"o".to_vec(),
            Self::Heartbeat => b"h".to_vec(),
            Self::Close { code, reason } => {
                let mut out = Vec::with_capacity(reason.len() + 16);
                out.push(b'c');
                out.push(b'[');
                out.extend_from_slice(code.to_string().as_bytes());
                out.push(b',');
                out.extend_from_slice(escape_message(reason).as_bytes());
                out.push(b']');
                out
            }
            Self::Message(msgs) => {
                let mut out = Vec::with_capacity(64);
                out.push(b'a');
                out.push(b'[');
                for (i, msg) in msgs.iter().enumerate() {
                    if i != 0 {
                        out.push(b',');
                    }
                    out.extend_from_slice(escape_message(msg).as_bytes());
                }
                out.push(b']');
                out
            }
        }
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Heartbeat => write!(f, "heartbeat"),
            Self::Close { code, .. } => write!(f, "close({code})"),
            Self::Message(msgs) => write!(f, "message(x{})", msgs.len()),
        }
    }
}
