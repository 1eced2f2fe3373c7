//! Response header utilities
//!
//! Cache, CORS, and cookie headers shared by every carrier endpoint. CORS
//! echoes the request origin (falling back to `*`) because SockJS clients
//! connect from arbitrary pages.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub(crate) fn no_cache(headers: &mut HeaderMap) {
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
    );
}

pub(crate) fn cache_forever(headers: &mut HeaderMap) {
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000"),
    );
    let expires = (chrono::Utc::now() + chrono::Duration::days(365))
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    if let Ok(value) = HeaderValue::from_str(&expires) {
        headers.insert(header::EXPIRES, value);
    }
}

fn origin_value(req: &HeaderMap) -> HeaderValue {
    match req.get(header::ORIGIN) {
        Some(origin) if origin != "null" && !origin.as_bytes().is_empty() => origin.clone(),
        _ => HeaderValue::from_static("*"),
    }
}

pub(crate) fn cors(headers: &mut HeaderMap, req: &HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin_value(req));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
}

/// Echo `Access-Control-Request-Headers` back as allowed.
pub(crate) fn echo_allow_headers(headers: &mut HeaderMap, req: &HeaderMap) {
    if let Some(requested) = req.get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
        if !requested.as_bytes().is_empty() {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
    }
}

/// Echo a `JSESSIONID` cookie when the router needs one or the client
/// already has one, pinned to the root path.
pub(crate) fn session_cookie(headers: &mut HeaderMap, req: &HeaderMap, cookie_needed: bool) {
    let existing = jsessionid(req);
    if !cookie_needed && existing.is_none() {
        return;
    }
    let value = existing.unwrap_or_else(|| "dummy".to_string());
    if let Ok(cookie) = HeaderValue::from_str(&format!("JSESSIONID={value}; Path=/")) {
        headers.insert(header::SET_COOKIE, cookie);
    }
}

fn jsessionid(req: &HeaderMap) -> Option<String> {
    let cookies = req.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix("JSESSIONID=").map(str::to_string))
}

/// CORS preflight: cache-forever, allowed methods, origin echo, 204.
pub(crate) fn preflight(req: &HeaderMap, verb: &str) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    cache_forever(headers);
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("31536000"),
    );
    if let Ok(methods) = HeaderValue::from_str(&format!("OPTIONS, {verb}")) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
    }
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin_value(req));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    response
}
