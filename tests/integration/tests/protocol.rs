//! Black-box protocol tests
//!
//! Drives a real listening server through every carrier the way a SockJS
//! client would.

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use integration::helpers::{read_to_end, read_until, test_options, TestServer};
use reqwest::StatusCode;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

// === Polling basics ===

#[tokio::test]
async fn xhr_polling_open() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server.post("/123/456/xhr").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "o\n");
    Ok(())
}

#[tokio::test]
async fn xhr_polling_round_trip() -> Result<()> {
    let server = TestServer::start().await?;

    assert_eq!(server.post("/123/456/xhr").await?.text().await?, "o\n");

    let response = server.post_plain("/123/456/xhr_send", r#"["abc"]"#).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.text().await?, "");

    let response = server.post("/123/456/xhr").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "a[\"abc\"]\n");
    Ok(())
}

#[tokio::test]
async fn xhr_receiver_arbitration() -> Result<()> {
    let server = TestServer::start().await?;

    assert_eq!(server.post("/123/456/xhr").await?.text().await?, "o\n");

    // First poll attaches and waits for traffic.
    let mut first = server.post("/123/456/xhr").await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Second concurrent poll is told off through its own response.
    let second = server.post("/123/456/xhr").await?;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(
        second.text().await?,
        "c[2010,\"Another connection still open\"]\n"
    );

    // The incumbent still gets the next message.
    server.post_plain("/123/456/xhr_send", r#"["x"]"#).await?;
    let body = read_until(&mut first, |acc| acc.contains("a[")).await?;
    assert_eq!(body, "a[\"x\"]\n");
    Ok(())
}

#[tokio::test]
async fn xhr_streaming_prelude_and_byte_cap() -> Result<()> {
    let server = TestServer::start().await?;

    let mut response = server.post("/st1/sess1/xhr_streaming").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let expected_prelude: String = "h".repeat(2048) + "\n";
    let acc = read_until(&mut response, |acc| acc.contains("o\n")).await?;
    assert_eq!(acc, format!("{expected_prelude}o\n"));

    // Frames keep landing on the same response.
    server.post_plain("/st1/sess1/xhr_send", r#"["hello"]"#).await?;
    read_until(&mut response, |acc| acc.contains("a[\"hello\"]\n")).await?;

    // One fat message pushes the frame count past 4096 bytes and the
    // receiver volunteers to close.
    let big = "z".repeat(4096);
    server
        .post_plain("/st1/sess1/xhr_send", format!("[\"{big}\"]"))
        .await?;
    let rest = read_to_end(&mut response).await?;
    assert!(rest.contains(&big));
    Ok(())
}

#[tokio::test]
async fn heartbeats_flow_on_idle_streaming_receiver() -> Result<()> {
    let mut options = test_options();
    options.heartbeat_delay_ms = 50;
    let server = TestServer::start_with_options(options).await?;

    let mut response = server.get("/123/456/eventsource").await?;
    read_until(&mut response, |acc| acc.contains("data: o\r\n\r\n")).await?;

    let acc = read_until(&mut response, |acc| {
        acc.matches("data: h\r\n\r\n").count() >= 3
    })
    .await?;
    assert!(acc.matches("data: h\r\n\r\n").count() >= 3);
    Ok(())
}

#[tokio::test]
async fn disconnect_grace_evicts_unattended_session() -> Result<()> {
    let mut options = test_options();
    options.disconnect_delay_ms = 50;
    let server = TestServer::start_with_options(options).await?;

    assert_eq!(server.post("/123/456/xhr").await?.text().await?, "o\n");

    tokio::time::sleep(Duration::from_millis(250)).await;

    // Sends find nothing.
    let response = server.post_plain("/123/456/xhr_send", r#"["late"]"#).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The same id opens a brand-new session.
    assert_eq!(server.post("/123/456/xhr").await?.text().await?, "o\n");
    Ok(())
}

#[tokio::test]
async fn unicode_line_separator_is_escaped_on_the_wire() -> Result<()> {
    let server = TestServer::start().await?;

    assert_eq!(server.post("/123/456/xhr").await?.text().await?, "o\n");
    let response = server
        .post_plain("/123/456/xhr_send", "[\"\u{2028}\"]")
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body = server.post("/123/456/xhr").await?.text().await?;
    assert_eq!(body, "a[\"\\u2028\"]\n");
    Ok(())
}

#[tokio::test]
async fn different_carrier_kind_is_refused() -> Result<()> {
    let server = TestServer::start().await?;

    assert_eq!(server.post("/123/456/xhr").await?.text().await?, "o\n");

    let mut response = server.post("/123/456/xhr_streaming").await?;
    let acc = read_until(&mut response, |acc| acc.contains("c[1001")).await?;
    assert!(acc.contains("c[1001,\"Another kind of connection is using this session\"]\n"));
    Ok(())
}

#[tokio::test]
async fn messages_queued_while_detached_flush_as_one_frame() -> Result<()> {
    let server = TestServer::start().await?;

    assert_eq!(server.post("/123/456/xhr").await?.text().await?, "o\n");

    let response = server
        .post_plain("/123/456/xhr_send", r#"["m1","m2"]"#)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Give the echo handler time to write both while nothing is attached.
    tokio::time::sleep(Duration::from_millis(150)).await;

    let body = server.post("/123/456/xhr").await?.text().await?;
    assert_eq!(body, "a[\"m1\",\"m2\"]\n");
    Ok(())
}

// === Send path errors ===

#[tokio::test]
async fn xhr_send_without_session_is_404() -> Result<()> {
    let server = TestServer::start().await?;
    let response = server.post_plain("/123/nosuch/xhr_send", r#"["x"]"#).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn xhr_send_rejects_empty_and_broken_payloads() -> Result<()> {
    let server = TestServer::start().await?;
    assert_eq!(server.post("/123/456/xhr").await?.text().await?, "o\n");

    let response = server.post_plain("/123/456/xhr_send", "").await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await?.contains("Payload expected."));

    let response = server.post_plain("/123/456/xhr_send", "[").await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await?.contains("Broken JSON encoding."));

    let response = server.post_plain("/123/456/xhr_send", "1234").await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await?.contains("Broken JSON encoding."));
    Ok(())
}

#[tokio::test]
async fn session_ids_with_dots_are_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let response = server.post("/1.2/456/xhr").await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = server.post("/123/4.6/xhr").await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

// === JSONP ===

#[tokio::test]
async fn jsonp_round_trip() -> Result<()> {
    let server = TestServer::start().await?;

    let body = server.get("/123/456/jsonp?c=cb").await?.text().await?;
    assert_eq!(body, "cb(\"o\");\r\n");

    let response = server
        .client
        .post(server.url("/123/456/jsonp_send"))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("d=%5B%22jx%22%5D")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "ok");

    let body = server.get("/123/456/jsonp?c=cb").await?.text().await?;
    assert_eq!(body, "cb(\"a[\\\"jx\\\"]\");\r\n");
    Ok(())
}

#[tokio::test]
async fn jsonp_requires_callback() -> Result<()> {
    let server = TestServer::start().await?;
    let response = server.get("/123/456/jsonp").await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await?.contains("\"callback\" parameter required"));
    Ok(())
}

#[tokio::test]
async fn jsonp_send_content_type_dispatch() -> Result<()> {
    let server = TestServer::start().await?;
    assert_eq!(
        server.get("/123/456/jsonp?c=cb").await?.text().await?,
        "cb(\"o\");\r\n"
    );

    // text/plain carries the payload raw.
    let response = server.post_plain("/123/456/jsonp_send", r#"["p1"]"#).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Anything else is refused.
    let response = server
        .client
        .post(server.url("/123/456/jsonp_send"))
        .header("Content-Type", "application/json")
        .body(r#"["p2"]"#)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await?.contains("Unrecognized content type"));

    // A form body without a payload is an empty payload.
    let response = server
        .client
        .post(server.url("/123/456/jsonp_send"))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("x=1")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await?.contains("Payload expected."));
    Ok(())
}

// === HTMLFile and EventSource ===

#[tokio::test]
async fn htmlfile_prelude_and_script_frames() -> Result<()> {
    let server = TestServer::start().await?;

    let mut response = server.get("/123/456/htmlfile?c=cb").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let acc = read_until(&mut response, |acc| acc.contains("<script>\np(\"o\");\n</script>\r\n"))
        .await?;
    assert!(acc.contains("var c = parent.cb;"));
    assert!(acc.len() >= 1024);
    Ok(())
}

#[tokio::test]
async fn htmlfile_requires_callback() -> Result<()> {
    let server = TestServer::start().await?;
    let response = server.get("/123/456/htmlfile").await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await?.contains("\"callback\" parameter required"));
    Ok(())
}

#[tokio::test]
async fn eventsource_framing() -> Result<()> {
    let server = TestServer::start().await?;

    let mut response = server.get("/123/456/eventsource").await?;
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream; charset=UTF-8"
    );
    read_until(&mut response, |acc| acc.starts_with("\r\ndata: o\r\n\r\n")).await?;

    server.post_plain("/123/456/xhr_send", r#"["es"]"#).await?;
    read_until(&mut response, |acc| acc.contains("data: a[\"es\"]\r\n\r\n")).await?;
    Ok(())
}

// === CORS and cookies ===

#[tokio::test]
async fn xhr_preflight() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/123/456/xhr"))
        .header("Origin", "http://example.com")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "OPTIONS, POST"
    );
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://example.com"
    );
    assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
    assert!(headers.get("expires").is_some());
    Ok(())
}

#[tokio::test]
async fn origin_falls_back_to_star() -> Result<()> {
    let server = TestServer::start().await?;
    let response = server.post("/123/456/xhr").await?;
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    Ok(())
}

#[tokio::test]
async fn jsessionid_cookie_echo() -> Result<()> {
    let mut options = test_options();
    options.cookie_needed = true;
    let server = TestServer::start_with_options(options).await?;

    let response = server.post("/123/456/xhr").await?;
    assert_eq!(
        response.headers().get("set-cookie").unwrap(),
        "JSESSIONID=dummy; Path=/"
    );

    let response = server
        .client
        .post(server.url("/123/457/xhr"))
        .header("Cookie", "JSESSIONID=abc")
        .send()
        .await?;
    assert_eq!(
        response.headers().get("set-cookie").unwrap(),
        "JSESSIONID=abc; Path=/"
    );
    Ok(())
}

// === Static surface ===

#[tokio::test]
async fn greeting() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server.get("/").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "Welcome to SockJS!\n");

    let response = server.get("").await?;
    assert_eq!(response.text().await?, "Welcome to SockJS!\n");
    Ok(())
}

#[tokio::test]
async fn info_payload() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server.get("/info").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("cache-control")
        .unwrap()
        .to_str()?
        .contains("no-cache"));
    let first: serde_json::Value = response.json().await?;
    assert_eq!(first["websocket"], true);
    assert_eq!(first["cookie_needed"], false);
    assert_eq!(first["origins"][0], "*:*");
    assert!(first["entropy"].is_u64());

    let second: serde_json::Value = server.get("/info").await?.json().await?;
    assert_ne!(first["entropy"], second["entropy"]);

    let response = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/info"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers().get("access-control-allow-methods").unwrap(),
        "OPTIONS, GET"
    );
    Ok(())
}

#[tokio::test]
async fn iframe_page_and_etag() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server.get("/iframe.html").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let etag = response.headers().get("etag").unwrap().to_str()?.to_string();
    assert!(etag.starts_with('"') && etag.ends_with('"'));
    let body = response.text().await?;
    assert!(body.contains("SockJS.bootstrap_iframe()"));

    // Versioned names serve the same document.
    let response = server.get("/iframe-0.3.min.html").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("etag").unwrap().to_str()?, etag);

    let response = server
        .client
        .get(server.url("/iframe.html"))
        .header("If-None-Match", &etag)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    Ok(())
}

#[tokio::test]
async fn unknown_paths_are_404() -> Result<()> {
    let server = TestServer::start().await?;
    assert_eq!(server.get("/nope").await?.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        server.get("/123/456/nope").await?.status(),
        StatusCode::NOT_FOUND
    );
    Ok(())
}

// === WebSocket carriers ===

#[tokio::test]
async fn framed_websocket_echo() -> Result<()> {
    let server = TestServer::start().await?;

    let (mut ws, _) = connect_async(server.ws_url("/123/456/websocket")).await?;

    let open = ws.next().await.unwrap()?;
    assert_eq!(open.into_text()?.as_str(), "o");

    ws.send(Message::Text(r#"["hello"]"#.into())).await?;
    let echoed = ws.next().await.unwrap()?;
    assert_eq!(echoed.into_text()?.as_str(), "a[\"hello\"]");

    ws.close(None).await?;
    Ok(())
}

#[tokio::test]
async fn framed_websocket_close_sends_go_away() -> Result<()> {
    // Handler reads one message, answers, then hangs up.
    let handler = sockjs_server::handler(|mut conn| async move {
        let mut buf = vec![0u8; 256];
        let n = conn.read(&mut buf).await.unwrap_or(0);
        if n > 0 {
            let _ = conn.write(b"bye").await;
        }
        conn.close().await;
    });
    let server = TestServer::start_with_handler(test_options(), handler).await?;

    let (mut ws, _) = connect_async(server.ws_url("/123/456/websocket")).await?;
    assert_eq!(ws.next().await.unwrap()?.into_text()?.as_str(), "o");

    ws.send(Message::Text(r#"["hi"]"#.into())).await?;
    assert_eq!(ws.next().await.unwrap()?.into_text()?.as_str(), "a[\"bye\"]");
    assert_eq!(
        ws.next().await.unwrap()?.into_text()?.as_str(),
        "c[3000,\"Go away!\"]"
    );
    Ok(())
}

#[tokio::test]
async fn framed_websocket_rejects_non_get() -> Result<()> {
    let server = TestServer::start().await?;
    let response = server.post("/123/456/websocket").await?;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().get("allow").unwrap(), "GET");
    assert_eq!(response.text().await?, "");
    Ok(())
}

#[tokio::test]
async fn raw_websocket_is_unframed() -> Result<()> {
    let server = TestServer::start().await?;

    let (mut ws, _) = connect_async(server.ws_url("/websocket")).await?;
    ws.send(Message::Text("plain".into())).await?;
    let echoed = ws.next().await.unwrap()?;
    assert_eq!(echoed.into_text()?.as_str(), "plain");
    ws.close(None).await?;
    Ok(())
}

#[tokio::test]
async fn websocket_can_be_disabled() -> Result<()> {
    let mut options = test_options();
    options.websocket_enabled = false;
    let server = TestServer::start_with_options(options).await?;

    let info: serde_json::Value = server.get("/info").await?.json().await?;
    assert_eq!(info["websocket"], false);

    assert!(connect_async(server.ws_url("/websocket")).await.is_err());
    assert!(connect_async(server.ws_url("/123/456/websocket")).await.is_err());
    Ok(())
}
