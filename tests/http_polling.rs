//! End-to-end polling against a local HTTP fixture.

use std::time::Duration;

use restpoll::decode::BodyFormat;
use restpoll::error::PollError;
use restpoll::poller::{spawn_poller, Poller};
use restpoll::request::{EndpointConfig, RequestOptions};
use restpoll::transport::{HttpTransport, ReqwestTransport, RetryPolicy};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

fn http_response(status_line: &str, extra_headers: &[&str], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {status_line}\r\n");
    for header in extra_headers {
        response.push_str(header);
        response.push_str("\r\n");
    }
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    ));
    response
}

/// Serve `responses` in order, one connection each, reporting every raw request.
async fn serve(responses: Vec<String>) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        for response in responses {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut request_buf = [0u8; 4096];
            let n = stream.read(&mut request_buf).await.unwrap_or(0);
            let _ = seen_tx.send(String::from_utf8_lossy(&request_buf[..n]).into_owned());
            let _ = stream.write_all(response.as_bytes()).await;
        }
    });
    (format!("http://{addr}"), seen_rx)
}

/// Millisecond backoff; `idle` keeps the poller parked after a batch.
fn fast_policy(idle: Duration, max_retries: i64, max_errors: i64) -> RetryPolicy {
    RetryPolicy::builder()
        .sleep_time(idle)
        .error_sleep_time(Duration::from_millis(1))
        .max_retries(max_retries)
        .max_errors(max_errors)
        .build()
        .expect("valid policy")
}

#[tokio::test]
async fn poller_retries_503_then_emits_records() {
    let (base, mut seen) = serve(vec![
        http_response("503 Service Unavailable", &["Retry-After: 0"], ""),
        http_response(
            "200 OK",
            &["Content-Type: application/json"],
            r#"[{"id":1},{"id":2}]"#,
        ),
    ])
    .await;

    let endpoint = EndpointConfig::builder(format!("{base}/events"))
        .build()
        .expect("valid endpoint");
    let poller = Poller::new(endpoint, fast_policy(Duration::from_secs(60), 3, 10));
    let (handle, mut batches) = spawn_poller(poller, 4);

    let batch = tokio::time::timeout(Duration::from_secs(5), batches.recv())
        .await
        .expect("batch before timeout")
        .expect("batch");
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.records()[1]["id"], 2);

    let first = seen.recv().await.expect("first request");
    let second = seen.recv().await.expect("second request");
    assert!(first.starts_with("GET /events HTTP/1.1"), "got: {first}");
    assert!(second.starts_with("GET /events HTTP/1.1"), "got: {second}");

    handle.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn transport_sends_query_auth_and_default_content_type() {
    let (base, mut seen) = serve(vec![http_response("200 OK", &[], "[]")]).await;

    let endpoint = EndpointConfig::builder(format!("{base}/search"))
        .query_params([("since", "42"), ("limit", "10")])
        .options(RequestOptions {
            bearer_token: Some("tok-123".to_string()),
            ..RequestOptions::default()
        })
        .build()
        .expect("valid endpoint");
    let request = endpoint.build_request().expect("request");

    let mut transport = ReqwestTransport::new();
    assert!(!transport.has_session());
    let response = transport.execute(&request).await.expect("response");
    assert!(transport.has_session());
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"[]");

    let raw = seen.recv().await.expect("request").to_ascii_lowercase();
    assert!(
        raw.starts_with("get /search?since=42&limit=10 http/1.1"),
        "got: {raw}"
    );
    assert!(raw.contains("authorization: bearer tok-123"), "got: {raw}");
    assert!(raw.contains("content-type: application/json"), "got: {raw}");

    transport.close().await;
    assert!(!transport.has_session());
}

#[tokio::test]
async fn line_delimited_bodies_decode_per_line() {
    let body = "{\"n\":1}\n\n{\"n\":2}\n";
    let (base, _seen) = serve(vec![http_response("200 OK", &[], body)]).await;

    let endpoint = EndpointConfig::builder(base)
        .format(BodyFormat::Lines)
        .build()
        .expect("valid endpoint");
    let poller = Poller::new(endpoint, fast_policy(Duration::from_secs(60), 0, 10));
    let (handle, mut batches) = spawn_poller(poller, 1);

    let batch = tokio::time::timeout(Duration::from_secs(5), batches.recv())
        .await
        .expect("batch before timeout")
        .expect("batch");
    let ns: Vec<i64> = batch
        .iter()
        .filter_map(|record| record["n"].as_i64())
        .collect();
    assert_eq!(ns, vec![1, 2]);

    handle.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn unreachable_endpoint_aborts_after_max_errors() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let endpoint = EndpointConfig::builder(format!("http://{addr}/feed"))
        .request_timeout(Duration::from_secs(2))
        .build()
        .expect("valid endpoint");
    let poller = Poller::new(endpoint, fast_policy(Duration::ZERO, 1, 1));
    let (handle, mut batches) = spawn_poller(poller, 1);

    assert!(batches.recv().await.is_none(), "no batches from a dead endpoint");
    let err = tokio::time::timeout(Duration::from_secs(10), handle.join())
        .await
        .expect("join before timeout")
        .expect_err("aborted");
    match err {
        PollError::MaxErrorsExceeded { failures, .. } => assert_eq!(failures, 2),
        other => panic!("unexpected error: {other}"),
    }
}
