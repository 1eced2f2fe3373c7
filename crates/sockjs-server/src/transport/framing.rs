//! Carrier policy
//!
//! Per-carrier wire rules: content type, prelude bytes, per-response byte
//! cap, streaming flag, and how one frame is wrapped for the carrier.

use bytes::Bytes;

/// Byte cap for one streaming response before the receiver volunteers to
/// close and the client reconnects.
const STREAMING_MAX_BYTES: usize = 4096;

/// Polling carriers detach after the first frame.
const POLLING_MAX_BYTES: usize = 1;

/// Streaming XHR prelude: 2048 `h` bytes and a newline.
const XHR_STREAMING_PRELUDE_LEN: usize = 2048;

/// HTMLFile preludes shorter than this are space-padded so intermediaries
/// commit to streaming.
const HTMLFILE_MIN_PRELUDE: usize = 1024;

const HTMLFILE_TEMPLATE: &str = r#"<!doctype html>
<html><head>
  <meta http-equiv="X-UA-Compatible" content="IE=edge" />
  <meta http-equiv="Content-Type" content="text/html; charset=UTF-8" />
</head><body><h2>Don't panic!</h2>
  <script>
    document.domain = document.domain;
    var c = parent.CALLBACK;
    c.start();
    function p(d) {c.message(d);};
    window.onload = function() {c.stop();};
  </script>
"#;

/// Which carrier protocol a transport speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarrierKind {
    XhrPolling,
    XhrStreaming,
    EventSource,
    HtmlFile,
    Jsonp,
    Websocket,
}

impl CarrierKind {
    /// Get the name of this carrier kind
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::XhrPolling => "xhr",
            Self::XhrStreaming => "xhr_streaming",
            Self::EventSource => "eventsource",
            Self::HtmlFile => "htmlfile",
            Self::Jsonp => "jsonp",
            Self::Websocket => "websocket",
        }
    }
}

impl std::fmt::Display for CarrierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How one encoded frame is wrapped for a carrier's wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameWrap {
    /// `frame\n`
    Newline,
    /// `data: frame\r\n\r\n`
    EventSource,
    /// `<script>\np("frame");\n</script>\r\n`
    HtmlFile,
    /// `callback("frame");\r\n`
    Jsonp(String),
    /// The frame bytes unchanged (WebSocket text message)
    Raw,
}

impl FrameWrap {
    /// Wrap one frame for the wire
    #[must_use]
    pub fn encode(&self, frame: &[u8]) -> Vec<u8> {
        match self {
            Self::Newline => {
                let mut out = Vec::with_capacity(frame.len() + 1);
                out.extend_from_slice(frame);
                out.push(b'\n');
                out
            }
            Self::EventSource => {
                let mut out = Vec::with_capacity(frame.len() + 10);
                out.extend_from_slice(b"data: ");
                out.extend_from_slice(frame);
                out.extend_from_slice(b"\r\n\r\n");
                out
            }
            Self::HtmlFile => {
                let js = json_string(frame);
                format!("<script>\np({js});\n</script>\r\n").into_bytes()
            }
            Self::Jsonp(callback) => {
                let js = json_string(frame);
                format!("{callback}({js});\r\n").into_bytes()
            }
            Self::Raw => frame.to_vec(),
        }
    }
}

/// JSON-encode frame bytes as a string literal for script-based carriers.
fn json_string(frame: &[u8]) -> String {
    let text = String::from_utf8_lossy(frame);
    serde_json::to_string(text.as_ref()).unwrap_or_else(|_| String::from("\"\""))
}

/// Everything a carrier handler needs to know about its wire
#[derive(Debug, Clone)]
pub struct CarrierPolicy {
    pub kind: CarrierKind,
    pub content_type: &'static str,
    pub max_bytes: usize,
    pub streaming: bool,
    pub wrap: FrameWrap,
    prelude: Option<Bytes>,
}

impl CarrierPolicy {
    /// XHR polling: plain frames, one frame per response
    #[must_use]
    pub fn xhr_polling() -> Self {
        Self {
            kind: CarrierKind::XhrPolling,
            content_type: "application/javascript; charset=UTF-8",
            max_bytes: POLLING_MAX_BYTES,
            streaming: false,
            wrap: FrameWrap::Newline,
            prelude: None,
        }
    }

    /// XHR streaming: plain frames behind a 2 KiB `h` prelude
    #[must_use]
    pub fn xhr_streaming() -> Self {
        let mut prelude = vec![b'h'; XHR_STREAMING_PRELUDE_LEN + 1];
        prelude[XHR_STREAMING_PRELUDE_LEN] = b'\n';
        Self {
            kind: CarrierKind::XhrStreaming,
            content_type: "application/javascript; charset=UTF-8",
            max_bytes: STREAMING_MAX_BYTES,
            streaming: true,
            wrap: FrameWrap::Newline,
            prelude: Some(Bytes::from(prelude)),
        }
    }

    /// EventSource: SSE-framed, `\r\n` prelude
    #[must_use]
    pub fn eventsource() -> Self {
        Self {
            kind: CarrierKind::EventSource,
            content_type: "text/event-stream; charset=UTF-8",
            max_bytes: STREAMING_MAX_BYTES,
            streaming: true,
            wrap: FrameWrap::EventSource,
            prelude: Some(Bytes::from_static(b"\r\n")),
        }
    }

    /// HTMLFile: `<script>` blocks behind the bootstrap document
    #[must_use]
    pub fn htmlfile(callback: &str) -> Self {
        let mut prelude = HTMLFILE_TEMPLATE.replace("CALLBACK", callback);
        while prelude.len() < HTMLFILE_MIN_PRELUDE {
            prelude.push(' ');
        }
        prelude.push_str("\r\n");
        Self {
            kind: CarrierKind::HtmlFile,
            content_type: "text/html; charset=UTF-8",
            max_bytes: STREAMING_MAX_BYTES,
            streaming: true,
            wrap: FrameWrap::HtmlFile,
            prelude: Some(Bytes::from(prelude)),
        }
    }

    /// JSONP polling: callback-wrapped, one frame per response
    #[must_use]
    pub fn jsonp(callback: &str) -> Self {
        Self {
            kind: CarrierKind::Jsonp,
            content_type: "application/javascript; charset=UTF-8",
            max_bytes: POLLING_MAX_BYTES,
            streaming: false,
            wrap: FrameWrap::Jsonp(callback.to_string()),
            prelude: None,
        }
    }

    /// Framed WebSocket: raw frames, no byte cap
    #[must_use]
    pub fn websocket() -> Self {
        Self {
            kind: CarrierKind::Websocket,
            content_type: "text/plain; charset=UTF-8",
            max_bytes: usize::MAX,
            streaming: true,
            wrap: FrameWrap::Raw,
            prelude: None,
        }
    }

    /// The bytes written before any frame, if the carrier has them
    #[must_use]
    pub fn prelude(&self) -> Option<Bytes> {
        self.prelude.clone()
    }
}
