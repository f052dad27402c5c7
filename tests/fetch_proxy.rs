//! End-to-end tests for the `/fetch` proxy route.

mod common;

use common::{encode, respond, spawn_server, spawn_upstream, test_config};
use serde_json::Value;
use std::time::Duration;

async fn get(url: &str) -> reqwest::Response {
    reqwest::Client::new().get(url).send().await.unwrap()
}

#[tokio::test]
async fn returns_envelope_for_utf8_page() {
    let upstream = spawn_upstream(|_req| async {
        respond(200, Some("text/html; charset=utf-8"), "<html>hi</html>")
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode(&upstream.url("/page"))
    ))
    .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/json");
    let length: usize = response.headers()["content-length"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    let body = response.bytes().await.unwrap();
    assert_eq!(body.len(), length);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({ "html": "<html>hi</html>" }));
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn sends_browser_like_headers() {
    let upstream = spawn_upstream(|req: hyper::Request<hyper::body::Incoming>| async move {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let echoed = format!(
            "{}|{}|{}",
            header("user-agent"),
            header("accept"),
            header("accept-language")
        );
        respond(200, Some("text/plain"), echoed)
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode(&upstream.url("/"))
    ))
    .await;
    let json: Value = response.json().await.unwrap();
    let parts: Vec<&str> = json["html"].as_str().unwrap().split('|').collect();

    assert!(parts[0].starts_with("Mozilla/5.0"));
    assert!(parts[0].contains("Chrome/"));
    assert_eq!(
        parts[1],
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
    );
    assert_eq!(parts[2], "en-US,en;q=0.9");
}

#[tokio::test]
async fn decodes_declared_latin1_charset() {
    // Encoded as ISO-8859-1, NEL (U+0085) included
    let expected = "Crème brûlée\u{85}à Noël";
    let latin1: Vec<u8> = expected.chars().map(|c| u8::try_from(u32::from(c)).unwrap()).collect();

    let upstream = spawn_upstream(move |_req| {
        let body = latin1.clone();
        async move { respond(200, Some("text/html; charset=ISO-8859-1"), body) }
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode(&upstream.url("/"))
    ))
    .await;
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["html"], expected);
}

#[tokio::test]
async fn declared_ascii_with_utf8_bytes_decodes_as_utf8() {
    let upstream = spawn_upstream(|_req| async {
        respond(200, Some("text/html; charset=us-ascii"), "<p>café ✓</p>")
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode(&upstream.url("/"))
    ))
    .await;
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["html"], "<p>café ✓</p>");
}

#[tokio::test]
async fn unknown_charset_falls_back_to_lossy_utf8() {
    let upstream = spawn_upstream(|_req| async {
        respond(200, Some("text/html; charset=klingon-9"), &b"ok \xFF done"[..])
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode(&upstream.url("/"))
    ))
    .await;
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["html"], "ok \u{FFFD} done");
}

#[tokio::test]
async fn missing_content_type_defaults_to_utf8() {
    let upstream = spawn_upstream(|_req| async { respond(200, None, "héllo") }).await;
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode(&upstream.url("/"))
    ))
    .await;
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["html"], "héllo");
}

#[tokio::test]
async fn missing_or_empty_url_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    for path in ["/fetch", "/fetch?url=", "/fetch?other=1"] {
        let response = get(&format!("http://{addr}{path}")).await;
        assert_eq!(response.status(), 400, "{path}");
        let text = response.text().await.unwrap();
        assert!(text.contains("Missing url parameter"), "{text}");
    }
}

#[tokio::test]
async fn remote_status_is_propagated() {
    let upstream = spawn_upstream(|req: hyper::Request<hyper::body::Incoming>| async move {
        match req.uri().path() {
            "/gone" => respond(410, Some("text/plain"), "gone"),
            "/broken" => respond(503, Some("text/plain"), "down"),
            _ => respond(404, Some("text/html"), "<h1>Not Found</h1>"),
        }
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    for (path, status) in [("/missing", 404), ("/gone", 410), ("/broken", 503)] {
        let response = get(&format!(
            "http://{addr}/fetch?url={}",
            encode(&upstream.url(path))
        ))
        .await;
        assert_eq!(response.status(), status);
        let text = response.text().await.unwrap();
        assert!(text.contains(&format!("Remote server returned {status}")), "{text}");
    }
}

#[tokio::test]
async fn unresolvable_host_is_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    // .invalid is reserved and never resolves
    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode("http://no-such-host.invalid/")
    ))
    .await;
    assert_eq!(response.status(), 502);
    assert!(response.text().await.unwrap().contains("Could not reach URL"));
}

#[tokio::test]
async fn refused_connection_is_bad_gateway() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = closed.local_addr().unwrap().port();
    drop(closed);

    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode(&format!("http://127.0.0.1:{port}/"))
    ))
    .await;
    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn slow_upstream_times_out_as_bad_gateway() {
    let upstream = spawn_upstream(|_req| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        respond(200, Some("text/plain"), "too late")
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.fetch.timeout_secs = 1;
    let addr = spawn_server(config).await;

    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode(&upstream.url("/slow"))
    ))
    .await;
    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn schemeless_target_is_fetched_over_https() {
    // The upstream only speaks plain HTTP, so an https:// fetch fails the
    // TLS handshake before any HTTP request is parsed.
    let upstream = spawn_upstream(|_req| async { respond(200, None, "plain") }).await;
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode(&upstream.addr.to_string())
    ))
    .await;
    assert_eq!(response.status(), 502);
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn unparseable_target_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode("http://exa mple.com/")
    ))
    .await;
    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn repeated_fetches_are_identical() {
    let upstream = spawn_upstream(|_req| async {
        respond(200, Some("text/html; charset=utf-8"), "<p>stable ✓</p>")
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;
    let url = format!("http://{addr}/fetch?url={}", encode(&upstream.url("/")));

    let first = get(&url).await.bytes().await.unwrap();
    let second = get(&url).await.bytes().await.unwrap();
    assert_eq!(first, second);
    // Nothing cached: both requests reached the origin
    assert_eq!(upstream.hits(), 2);
}

#[tokio::test]
async fn private_address_guard_refuses_loopback() {
    let upstream = spawn_upstream(|_req| async { respond(200, None, "internal") }).await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.fetch.block_private_hosts = true;
    let addr = spawn_server(config).await;

    let response = get(&format!(
        "http://{addr}/fetch?url={}",
        encode(&upstream.url("/"))
    ))
    .await;
    assert_eq!(response.status(), 403);
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn concurrent_requests_do_not_block_each_other() {
    let upstream = spawn_upstream(|req: hyper::Request<hyper::body::Incoming>| async move {
        if req.uri().path() == "/slow" {
            tokio::time::sleep(Duration::from_secs(3)).await;
        }
        respond(200, Some("text/plain"), req.uri().path().to_string())
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    let slow_url = format!("http://{addr}/fetch?url={}", encode(&upstream.url("/slow")));
    let slow = tokio::spawn(async move { get(&slow_url).await.status() });

    // Give the slow request a head start, then make sure a fast one still
    // completes well before it
    tokio::time::sleep(Duration::from_millis(100)).await;
    let fast = tokio::time::timeout(
        Duration::from_secs(2),
        get(&format!("http://{addr}/fetch?url={}", encode(&upstream.url("/fast")))),
    )
    .await
    .expect("fast request blocked behind slow one");
    assert_eq!(fast.status(), 200);

    assert_eq!(slow.await.unwrap(), 200);
}

#[tokio::test]
async fn late_request_on_reused_connection_completes() {
    let upstream = spawn_upstream(|req: hyper::Request<hyper::body::Incoming>| async move {
        if req.uri().path() == "/slow" {
            tokio::time::sleep(Duration::from_millis(1500)).await;
        }
        respond(200, Some("text/plain"), req.uri().path().to_string())
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.performance.read_timeout = 2;
    config.performance.write_timeout = 2;
    let addr = spawn_server(config).await;

    // One client, so the second request rides the pooled connection
    let client = reqwest::Client::new();
    let fetch = |path: &str| {
        client
            .get(format!("http://{addr}/fetch?url={}", encode(&upstream.url(path))))
            .send()
    };

    let first = fetch("/fast").await.unwrap();
    assert_eq!(first.status(), 200);
    first.bytes().await.unwrap();

    // The second request ends well past two seconds of connection age
    tokio::time::sleep(Duration::from_secs(1)).await;
    let second = fetch("/slow").await.unwrap();
    assert_eq!(second.status(), 200);
    let json: Value = second.json().await.unwrap();
    assert_eq!(json["html"], "/slow");
}

#[tokio::test]
async fn head_on_fetch_route_is_not_proxied() {
    let upstream = spawn_upstream(|_req| async { respond(200, None, "page") }).await;
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(test_config(dir.path())).await;

    let response = reqwest::Client::new()
        .head(format!("http://{addr}/fetch?url={}", encode(&upstream.url("/"))))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(upstream.hits(), 0);
}
