//! Client payload parsing
//!
//! A client-origin payload is either a JSON string or a JSON array of
//! strings. Empty payloads decode to no messages.

/// Protocol-level decode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtoError {
    #[error("Broken JSON encoding.")]
    BrokenJson,
}

/// Decode a client payload into its messages.
///
/// An empty payload is a no-op. A payload starting with `[` must be a JSON
/// array of strings; anything else must be a single JSON string.
pub fn parse_payload(raw: &[u8]) -> Result<Vec<String>, ProtoError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    if raw[0] == b'[' {
        serde_json::from_slice::<Vec<String>>(raw).map_err(|_| ProtoError::BrokenJson)
    } else {
        serde_json::from_slice::<String>(raw)
            .map(|s| vec![s])
            .map_err(|_| ProtoError::BrokenJson)
    }
}
