// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

mod common;

use std::time::{Duration, Instant};

use common::*;
use minihttpd::config::ServerMode;

const MODES: [ServerMode; 2] = [ServerMode::Single, ServerMode::Forking];

/// 请求根目录：200，响应体是不含 "." 条目的无序列表
#[tokio::test]
async fn test_root_directory_listing() {
    for mode in MODES {
        let server = start(mode).await;
        let response = get(server.addr, "/").await;

        assert_eq!(status_of(&response), 200, "{:?}", mode);
        assert_eq!(header_of(&response, "Content-Type"), Some("text/html"));
        let body = body_of(&response);
        assert!(body.contains("<ul>"));
        assert!(body.contains("<a href=\"/hello.txt\">hello.txt</a>"));
        assert!(body.contains("<a href=\"/docs\">docs</a>"));
        assert!(!body.contains("href=\"/.\""));
    }
}

#[tokio::test]
async fn test_subdirectory_listing() {
    let server = start(ServerMode::Single).await;
    let response = get(server.addr, "/docs").await;

    assert_eq!(status_of(&response), 200);
    assert!(response.contains("<a href=\"/docs/readme.txt\">readme.txt</a>"));
    assert!(response.contains("<a href=\"/docs/..\">..</a>"));
}

#[tokio::test]
async fn test_static_file() {
    for mode in MODES {
        let server = start(mode).await;
        let response = get(server.addr, "/hello.txt").await;

        assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
        assert_eq!(header_of(&response, "Content-Type"), Some("text/plain"));
        assert_eq!(body_of(&response), "hello world\n");
    }
}

/// 同一个静态文件请求两次，状态与响应体完全一致
#[tokio::test]
async fn test_static_file_is_idempotent() {
    let server = start(ServerMode::Single).await;
    let first = get(server.addr, "/index.html").await;
    let second = get(server.addr, "/index.html").await;

    assert_eq!(status_of(&first), 200);
    assert_eq!(status_of(&first), status_of(&second));
    assert_eq!(body_of(&first), body_of(&second));
    assert_eq!(body_of(&first), "<h1>index</h1>");
}

#[tokio::test]
async fn test_missing_file() {
    for mode in MODES {
        let server = start(mode).await;
        let response = get(server.addr, "/missing.txt").await;

        assert_eq!(status_of(&response), 404);
        assert_eq!(header_of(&response, "Content-Type"), Some("text/html"));
        assert!(body_of(&response).contains("404 Not Found"));
    }
}

#[tokio::test]
async fn test_traversal_is_not_found() {
    let server = start(ServerMode::Single).await;
    let response = get(server.addr, "/../../etc/passwd").await;

    assert_eq!(status_of(&response), 404);
    assert!(response.contains("404 Not Found"));
}

/// CGI 程序拿到查询字符串，它的标准输出被原样作为响应
#[tokio::test]
async fn test_cgi_query_string() {
    for mode in MODES {
        let server = start(mode).await;
        let response = get(server.addr, "/script.cgi?q=1").await;

        assert_eq!(
            response,
            "HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nQUERY_STRING=q=1\nREQUEST_METHOD=GET\n"
        );
    }
}

/// 请求体不会被读取，任何方法都按同样的方式处理
#[tokio::test]
async fn test_post_is_served_without_reading_body() {
    let server = start(ServerMode::Single).await;
    let response = send_raw(
        server.addr,
        b"POST /script.cgi HTTP/1.0\r\nHost: localhost\r\nContent-Length: 3\r\n\r\nabc",
    )
    .await;
    let response = String::from_utf8_lossy(&response);

    assert!(response.contains("REQUEST_METHOD=POST"));
}

#[tokio::test]
async fn test_empty_request_line() {
    for mode in MODES {
        let server = start(mode).await;
        let response = send_raw(server.addr, b"\r\n").await;
        let response = String::from_utf8_lossy(&response);

        assert!(response.starts_with("HTTP/1.0 400 Bad Request\r\n"));
        assert!(body_of(&response).contains("400 Bad Request"));
    }
}

#[tokio::test]
async fn test_request_without_headers() {
    let server = start(ServerMode::Single).await;
    let response = send_raw(server.addr, b"GET / HTTP/1.0\r\n\r\n").await;

    assert_eq!(status_of(&String::from_utf8_lossy(&response)), 400);
}

/// 一个请求失败不影响服务器继续处理后续连接
#[tokio::test]
async fn test_failure_does_not_stop_server() {
    let server = start(ServerMode::Single).await;
    assert_eq!(status_of(&get(server.addr, "/missing").await), 404);
    assert_eq!(
        status_of(&String::from_utf8_lossy(&send_raw(server.addr, b"garbage\r\n").await)),
        400
    );
    assert_eq!(status_of(&get(server.addr, "/hello.txt").await), 200);
}

/// Forking 模式下，一个缓慢的 CGI 程序不会阻塞其他客户端
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_forking_does_not_block_on_slow_worker() {
    let server = start(ServerMode::Forking).await;
    write_script(
        &server.root.join("slow.cgi"),
        "#!/bin/sh\nsleep 3\nprintf 'HTTP/1.0 200 OK\\r\\n\\r\\nslow'\n",
    );

    let addr = server.addr;
    let slow = tokio::spawn(async move { get(addr, "/slow.cgi").await });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    let fast = get(server.addr, "/hello.txt").await;
    assert_eq!(status_of(&fast), 200);
    assert!(started.elapsed() < Duration::from_secs(2));

    let slow = slow.await.unwrap();
    assert!(slow.ends_with("slow"));
}

/// Forking 模式下的多个并发请求都能得到完整响应
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_forking_concurrent_requests() {
    let server = start(ServerMode::Forking).await;
    let mut handles = Vec::new();
    for _ in 0..16 {
        let addr = server.addr;
        handles.push(tokio::spawn(async move { get(addr, "/hello.txt").await }));
    }
    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(body_of(&response), "hello world\n");
    }
}

/// Single 模式严格顺序处理：慢请求结束之前，后到的请求得不到响应
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_serves_requests_in_order() {
    let server = start(ServerMode::Single).await;
    write_script(
        &server.root.join("slow.cgi"),
        "#!/bin/sh\nsleep 2\nprintf 'HTTP/1.0 200 OK\\r\\n\\r\\nslow'\n",
    );

    let addr = server.addr;
    let started = Instant::now();
    let slow = tokio::spawn(async move { get(addr, "/slow.cgi").await });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let fast = get(server.addr, "/hello.txt").await;
    let fast_done = Instant::now();
    assert_eq!(status_of(&fast), 200);
    assert!(fast_done.duration_since(started) >= Duration::from_millis(1500));

    let slow = slow.await.unwrap();
    assert!(slow.ends_with("slow"));
}

/// 客户端在 CGI 输出途中断开后，Single 模式仍能继续服务下一个连接
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_recovers_after_cgi_client_disconnect() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let server = start(ServerMode::Single).await;
    write_script(
        &server.root.join("big.cgi"),
        "#!/bin/sh\nhead -c 50000000 /dev/zero\n",
    );

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /big.cgi HTTP/1.0\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut prefix = [0u8; 16];
    stream.read_exact(&mut prefix).await.unwrap();
    drop(stream);

    let next = get(server.addr, "/hello.txt").await;
    assert_eq!(status_of(&next), 200);
    assert_eq!(body_of(&next), "hello world\n");
}
