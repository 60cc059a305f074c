// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 集成测试共用的夹具：临时文档根目录 + 绑定到临时端口的服务器

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use minihttpd::config::{Config, ServerMode};
use minihttpd::server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// 单个请求的最长等待时间，防止测试因服务器挂起而永久阻塞
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestServer {
    pub addr: SocketAddr,
    pub root: PathBuf,
    pub outside: PathBuf,
    handle: JoinHandle<()>,
    _dir: tempfile::TempDir,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// 构建如下的目录结构并启动服务器：
///
/// ```text
/// <tmp>/www/index.html
/// <tmp>/www/hello.txt
/// <tmp>/www/docs/readme.txt
/// <tmp>/www/script.cgi
/// <tmp>/www-secret/key.txt
/// <tmp>/secret.txt
/// ```
pub async fn start(mode: ServerMode) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("www");
    fs::create_dir(&root).unwrap();
    fs::create_dir(root.join("docs")).unwrap();
    fs::write(root.join("index.html"), "<h1>index</h1>").unwrap();
    fs::write(root.join("hello.txt"), "hello world\n").unwrap();
    fs::write(root.join("docs").join("readme.txt"), "readme").unwrap();
    write_script(
        &root.join("script.cgi"),
        "#!/bin/sh\nprintf 'HTTP/1.0 200 OK\\r\\nContent-Type: text/plain\\r\\n\\r\\n'\necho \"QUERY_STRING=$QUERY_STRING\"\necho \"REQUEST_METHOD=$REQUEST_METHOD\"\n",
    );
    fs::create_dir(dir.path().join("www-secret")).unwrap();
    fs::write(dir.path().join("www-secret").join("key.txt"), "sibling").unwrap();
    fs::write(dir.path().join("secret.txt"), "top secret").unwrap();

    let mime = dir.path().join("mime.types");
    fs::write(&mime, "text/html html htm\ntext/plain txt\n").unwrap();

    let config = Config::with_root(&root)
        .unwrap()
        .with_port(0)
        .with_mode(mode)
        .with_mime_types_path(&mime);
    let root = config.www_root().to_path_buf();
    let outside = dir.path().canonicalize().unwrap();

    let listener = server::create_listener(&config).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(server::run(
        listener,
        Arc::new(config),
        std::future::pending::<()>(),
    ));

    TestServer {
        addr,
        root,
        outside,
        handle,
        _dir: dir,
    }
}

/// 发送原始报文并读取完整响应（服务器处理完毕后会关闭连接）
pub async fn send_raw(addr: SocketAddr, raw: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();
    let mut response = Vec::new();
    tokio::time::timeout(RESPONSE_TIMEOUT, stream.read_to_end(&mut response))
        .await
        .expect("服务器响应超时")
        .unwrap();
    response
}

pub async fn get(addr: SocketAddr, uri: &str) -> String {
    let raw = format!(
        "GET {} HTTP/1.0\r\nHost: localhost\r\nUser-Agent: minihttpd-test\r\n\r\n",
        uri
    );
    String::from_utf8_lossy(&send_raw(addr, raw.as_bytes()).await).into_owned()
}

/// 从原始响应字符串中提取 HTTP 状态码
pub fn status_of(response: &str) -> u16 {
    response
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap_or(0)
}

pub fn header_of<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    let (head, _) = response.split_once("\r\n\r\n")?;
    head.lines().skip(1).find_map(|line| {
        let (n, v) = line.split_once(':')?;
        n.eq_ignore_ascii_case(name).then(|| v.trim())
    })
}

pub fn body_of(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("")
}
