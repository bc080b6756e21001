use super::tcp::{ChunkedDecoder, connect_host, decode_chunked, encode_request_head};
use super::{TcpTransport, TimeoutGuard, Transport, TransportError};
use crate::common::test_utils::{
    http_response, spawn_canned_http_server, spawn_silent_server, split_request,
};
use bytes::Bytes;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn post(url: &str, body: &str) -> http::Request<Bytes> {
    http::Request::post(url)
        .header("content-type", "application/json")
        .header("accept", "application/json")
        .body(Bytes::from(body.to_string()))
        .unwrap()
}

#[test]
fn test_encode_request_head() {
    let request = post("http://localhost:8080/echo", r#"{"message":"hi"}"#);
    let head = String::from_utf8(encode_request_head(&request).unwrap()).unwrap();

    assert!(head.starts_with("POST /echo HTTP/1.1\r\n"));
    assert!(head.contains("Host: localhost:8080\r\n"));
    assert!(head.contains("content-type: application/json\r\n"));
    assert!(head.contains("accept: application/json\r\n"));
    assert!(head.contains("Content-Length: 16\r\n"));
    assert!(head.ends_with("Connection: close\r\n\r\n"));
}

#[test]
fn test_encode_get_without_body() {
    let request = http::Request::get("http://127.0.0.1:9000/healthz")
        .body(Bytes::new())
        .unwrap();
    let head = String::from_utf8(encode_request_head(&request).unwrap()).unwrap();

    assert!(head.starts_with("GET /healthz HTTP/1.1\r\n"));
    assert!(!head.contains("Content-Length"));
}

#[test]
fn test_decode_chunked() {
    let data = b"5\r\nhello\r\n6;ext=1\r\n world\r\n0\r\n\r\n";
    let body = decode_chunked(data, 1024).unwrap().unwrap();
    assert_eq!(&body[..], b"hello world");

    // Incomplete chunk waits for more data
    assert!(decode_chunked(b"5\r\nhel", 1024).unwrap().is_none());
    assert!(decode_chunked(b"5\r\nhello\r\n", 1024).unwrap().is_none());

    assert!(matches!(
        decode_chunked(b"zz\r\n", 1024),
        Err(TransportError::Protocol(_))
    ));
}

#[test]
fn test_decode_chunked_rejects_oversized_chunk() {
    for data in [
        &b"ffffffffffffffff\r\nab\r\n"[..],
        &b"fffffffffffffffe\r\nab\r\n"[..],
        &b"401\r\n"[..],
    ] {
        match decode_chunked(data, 1024) {
            Err(TransportError::Protocol(msg)) => assert!(msg.contains("Response too large"), "{msg}"),
            other => panic!("Expected size limit error, got {other:?}"),
        }
    }

    // Chunks that together pass the limit are rejected too
    let data = b"200\r\n".iter().chain(&[b'a'; 0x200]).chain(b"\r\n201\r\n").copied().collect::<Vec<_>>();
    assert!(matches!(decode_chunked(&data, 1024), Err(TransportError::Protocol(_))));
}

#[test]
fn test_chunked_decoder_resumes_across_reads() {
    let full = b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
    let mut decoder = ChunkedDecoder::new(1024);

    // Feed a growing prefix, one byte at a time
    for end in 1..full.len() - 2 {
        if let Some(body) = decoder.decode(&full[..end]).unwrap() {
            panic!("Body completed early at {end}: {body:?}");
        }
    }
    let body = decoder.decode(full).unwrap().unwrap();
    assert_eq!(&body[..], b"hello world");
}

#[test]
fn test_connect_host_unbrackets_ipv6() {
    let uri: http::Uri = "http://[::1]:8080/echo".parse().unwrap();
    assert_eq!(connect_host(&uri), Some("::1"));

    let uri: http::Uri = "http://localhost:8080/echo".parse().unwrap();
    assert_eq!(connect_host(&uri), Some("localhost"));
}

#[tokio::test]
async fn test_timeout_guard_fires() {
    let guard = TimeoutGuard::arm(Duration::from_millis(20));
    let token = guard.token();

    tokio::time::timeout(Duration::from_secs(2), token.cancelled())
        .await
        .expect("timer should cancel the token");
    assert!(guard.fired());
}

#[tokio::test]
async fn test_timeout_guard_drop_clears_timer() {
    let guard = TimeoutGuard::arm(Duration::from_millis(20));
    let token = guard.token();
    assert_eq!(guard.timeout(), Duration::from_millis(20));
    drop(guard);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(!token.is_cancelled());
}

#[tokio::test]
async fn test_tcp_transport_content_length_response() {
    let (server, addr, captured) = spawn_canned_http_server(http_response(
        "200 OK",
        "application/json",
        r#"{"message":"hi"}"#,
    ))
    .await
    .unwrap();

    let transport = TcpTransport::default();
    let response = transport
        .execute(
            post(&format!("http://{addr}/echo"), r#"{"message":"hi"}"#),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(&response.body()[..], br#"{"message":"hi"}"#);

    let requests = captured.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let (head, body) = split_request(&requests[0]);
    assert!(head.starts_with("POST /echo HTTP/1.1"));
    assert_eq!(body, br#"{"message":"hi"}"#);

    server.abort();
}

#[tokio::test]
async fn test_tcp_transport_chunked_response() {
    let raw = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n6\r\n{\"stat\r\n\
               9\r\nus\":\"ok\"}\r\n0\r\n\r\n";
    let (server, addr, _) = spawn_canned_http_server(raw).await.unwrap();

    let response = TcpTransport::default()
        .execute(
            http::Request::get(format!("http://{addr}/healthz"))
                .body(Bytes::new())
                .unwrap(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(&response.body()[..], br#"{"status":"ok"}"#);
    server.abort();
}

#[tokio::test]
async fn test_tcp_transport_close_delimited_response() {
    let raw = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain\r\n\r\nInvalid input";
    let (server, addr, _) = spawn_canned_http_server(raw).await.unwrap();

    let response = TcpTransport::default()
        .execute(post(&format!("http://{addr}/echo"), "{}"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
    assert_eq!(&response.body()[..], b"Invalid input");
    server.abort();
}

#[tokio::test]
async fn test_tcp_transport_response_size_limit() {
    let body = "x".repeat(2048);
    let (server, addr, _) = spawn_canned_http_server(http_response("200 OK", "text/plain", &body))
        .await
        .unwrap();

    let result = TcpTransport::new(512)
        .execute(post(&format!("http://{addr}/echo"), "{}"), CancellationToken::new())
        .await;

    match result {
        Err(TransportError::Protocol(msg)) => assert!(msg.contains("Response too large")),
        other => panic!("Expected size limit error, got {other:?}"),
    }
    server.abort();
}

#[tokio::test]
async fn test_tcp_transport_cancelled_by_token() {
    let (server, addr) = spawn_silent_server().await.unwrap();

    let guard = TimeoutGuard::arm(Duration::from_millis(50));
    let result = TcpTransport::default()
        .execute(post(&format!("http://{addr}/echo"), "{}"), guard.token())
        .await;

    assert!(matches!(result, Err(TransportError::Cancelled)));
    assert!(guard.fired());
    server.abort();
}

#[tokio::test]
async fn test_tcp_transport_connection_refused() {
    // Grab a free port, then close it so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = TcpTransport::default()
        .execute(post(&format!("http://{addr}/echo"), "{}"), CancellationToken::new())
        .await;

    assert!(matches!(result, Err(TransportError::Io(_))));
}

#[tokio::test]
async fn test_tcp_transport_rejects_https() {
    let result = TcpTransport::default()
        .execute(post("https://localhost:8443/echo", "{}"), CancellationToken::new())
        .await;

    match result {
        Err(TransportError::Protocol(msg)) => assert!(msg.contains("only http://")),
        other => panic!("Expected protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_tcp_transport_huge_content_length() {
    let raw = "HTTP/1.1 200 OK\r\nContent-Length: 18446744073709551615\r\n\r\n{}";
    let (server, addr, _) = spawn_canned_http_server(raw).await.unwrap();

    let result = TcpTransport::default()
        .execute(post(&format!("http://{addr}/echo"), "{}"), CancellationToken::new())
        .await;

    match result {
        Err(TransportError::Protocol(msg)) => assert!(msg.contains("Response too large"), "{msg}"),
        other => panic!("Expected size limit error, got {other:?}"),
    }
    server.abort();
}

#[tokio::test]
async fn test_tcp_transport_huge_chunk_size() {
    let raw = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\nab\r\n";
    let (server, addr, _) = spawn_canned_http_server(raw).await.unwrap();

    let result = TcpTransport::default()
        .execute(post(&format!("http://{addr}/echo"), "{}"), CancellationToken::new())
        .await;

    assert!(matches!(result, Err(TransportError::Protocol(_))));
    server.abort();
}

#[tokio::test]
async fn test_tcp_transport_ipv6_literal() {
    // Hosts without IPv6 loopback have nothing to test here
    let Ok(listener) = TcpListener::bind("[::1]:0").await else {
        return;
    };
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buffer = [0u8; 1024];
        let _ = socket.read(&mut buffer).await.unwrap();
        socket
            .write_all(&http_response("200 OK", "application/json", r#"{"status":"ok"}"#))
            .await
            .unwrap();
    });

    let response = TcpTransport::default()
        .execute(
            http::Request::get(format!("http://[::1]:{}/healthz", addr.port()))
                .body(Bytes::new())
                .unwrap(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(&response.body()[..], br#"{"status":"ok"}"#);
    server.await.unwrap();
}
