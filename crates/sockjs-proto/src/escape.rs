//! Message payload escaping
//!
//! SockJS requires message payloads to survive hostile intermediaries
//! (proxies that mangle line separators, BOMs, joiners). On top of normal
//! JSON string escaping, code points in a handful of Unicode ranges are
//! forced into `\uXXXX` form.

/// Code points that must never appear literally in a message frame.
fn needs_escape(c: char) -> bool {
    matches!(
        c,
        '\u{0000}'..='\u{001f}'
            | '\u{200c}'..='\u{200f}'
            | '\u{2028}'..='\u{202f}'
            | '\u{2060}'..='\u{206f}'
            | '\u{fff0}'..='\u{ffff}'
    )
}

/// JSON-encode one message as a quoted string literal, applying the
/// extended `\u` escape pass.
///
/// The standard encoder already escapes control characters; this walks its
/// output and rewrites any remaining literal occurrence of the protected
/// ranges.
#[must_use]
pub fn escape_message(msg: &str) -> String {
    // Strings always serialize cleanly.
    let js = serde_json::to_string(msg).unwrap_or_else(|_| String::from("\"\""));

    if !js.chars().any(needs_escape) {
        return js;
    }

    let mut out = String::with_capacity(js.len() + 8);
    for c in js.chars() {
        if needs_escape(c) {
            out.push_str(&format!("\\u{:04x}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}
