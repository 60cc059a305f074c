// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求处理器
//!
//! 四种处理器：目录浏览、静态文件、CGI 以及错误页。它们都直接向 `Request`
//! 持有的连接写入状态行、响应头、空行和响应体。
//!
//! 处理器返回 `HandlerOutcome`，其中 `body_written` 表示响应头是否已经提交。
//! 一旦提交，之后的任何失败都只能记录日志，分发器不会再追加错误页。

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use bytes::BytesMut;
use log::{debug, error, warn};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use crate::config::Config;
use crate::exception::Exception;
use crate::mime::lookup_mime_type;
use crate::param::{Status, GATEWAY_INTERFACE, HTTP_VERSION};
use crate::request::Request;
use crate::util::{response_head, HtmlBuilder};

/// 处理器的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub status: Status,
    /// 响应头是否已经写入连接
    pub body_written: bool,
}

impl HandlerOutcome {
    fn committed(status: Status) -> Self {
        Self {
            status,
            body_written: true,
        }
    }

    fn failed(exception: Exception) -> Self {
        Self {
            status: exception.status(),
            body_written: false,
        }
    }
}

fn resolved_path<S>(request: &Request<S>) -> Option<PathBuf> {
    request.path().map(Path::to_path_buf)
}

async fn write_head<S>(request: &mut Request<S>, status: Status, content_type: &str) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let head = response_head(status, content_type);
    request.stream().write_all(head.as_bytes()).await
}

/// 以 HTML 无序列表的形式列出目录内容。
///
/// 目录在写出任何字节之前就被完整扫描，所以扫描失败时连接上什么都没有，
/// 分发器可以放心地写出 404 错误页。
pub async fn handle_browse<S>(request: &mut Request<S>, config: &Config) -> HandlerOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = request.id();
    let path = match resolved_path(request) {
        Some(p) => p,
        None => return HandlerOutcome::failed(Exception::DirectoryScanFailed),
    };

    let mut entries = match tokio::fs::read_dir(&path).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("[ID{}]无法扫描目录{}：{}", id, path.display(), e);
            return HandlerOutcome::failed(Exception::DirectoryScanFailed);
        }
    };
    let mut names = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => names.push(entry.file_name().to_string_lossy().into_owned()),
            Ok(None) => break,
            Err(e) => {
                warn!("[ID{}]扫描目录{}时出错：{}", id, path.display(), e);
                return HandlerOutcome::failed(Exception::DirectoryScanFailed);
            }
        }
    }
    // 根目录的上级目录必然越界，不提供链接
    if path != config.www_root() {
        names.push("..".to_string());
    }
    names.sort();
    debug!("[ID{}]目录{}共有{}个条目", id, path.display(), names.len());

    let html = HtmlBuilder::from_dir(request.uri(), &names).build();
    if let Err(e) = write_head(request, Status::Ok, "text/html").await {
        error!("[ID{}]发送响应头失败：{}", id, e);
        return HandlerOutcome::committed(Status::Ok);
    }
    if let Err(e) = request.stream().write_all(html.as_bytes()).await {
        error!("[ID{}]发送目录列表失败：{}", id, e);
    }
    HandlerOutcome::committed(Status::Ok)
}

/// 按固定大小分块、原样传输文件内容
pub async fn handle_file<S>(request: &mut Request<S>, config: &Config) -> HandlerOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = request.id();
    let path = match resolved_path(request) {
        Some(p) => p,
        None => return HandlerOutcome::failed(Exception::FileOpenFailed),
    };

    let mut file = match File::open(&path).await {
        Ok(f) => f,
        Err(e) => {
            warn!("[ID{}]无法打开文件{}：{}", id, path.display(), e);
            return HandlerOutcome::failed(Exception::FileOpenFailed);
        }
    };
    let mime = lookup_mime_type(&path, config).await;
    debug!("[ID{}]MIME类型: {}", id, mime);

    if let Err(e) = write_head(request, Status::Ok, &mime).await {
        error!("[ID{}]发送响应头失败：{}", id, e);
        return HandlerOutcome::committed(Status::Ok);
    }

    let mut buffer = BytesMut::with_capacity(config.chunk_size());
    let mut total_sent = 0u64;
    loop {
        buffer.clear();
        match file.read_buf(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => {
                if let Err(e) = request.stream().write_all(&buffer[..n]).await {
                    error!("[ID{}]写入文件内容失败：{}", id, e);
                    break;
                }
                total_sent += n as u64;
            }
            Err(e) => {
                // 响应头已经提交，只能截断响应体
                error!("[ID{}]读取文件{}失败：{}", id, path.display(), e);
                break;
            }
        }
    }
    debug!("[ID{}]文件传输结束，共发送 {} 字节", id, total_sent);
    HandlerOutcome::committed(Status::Ok)
}

/// CGI 子进程的环境变量
pub fn cgi_environment<S>(request: &Request<S>, config: &Config, script: &Path) -> Vec<(&'static str, String)> {
    vec![
        ("QUERY_STRING", request.query().to_string()),
        ("SCRIPT_FILENAME", script.to_string_lossy().into_owned()),
        ("REQUEST_METHOD", request.method().to_string()),
        ("REMOTE_ADDR", request.host()),
        ("REQUEST_URI", request.uri().to_string()),
        ("REMOTE_PORT", request.port()),
        ("DOCUMENT_ROOT", config.www_root().to_string_lossy().into_owned()),
        ("SERVER_PORT", config.port().to_string()),
        ("HTTP_HOST", request.header("Host").unwrap_or_default().to_string()),
        (
            "HTTP_USER_AGENT",
            request.header("User-Agent").unwrap_or_default().to_string(),
        ),
        ("GATEWAY_INTERFACE", GATEWAY_INTERFACE.to_string()),
        ("SERVER_PROTOCOL", HTTP_VERSION.to_string()),
    ]
}

/// 以子进程方式运行可执行资源，把它的标准输出原样转发给客户端。
///
/// 子进程的输出被当作完整的 HTTP 响应（包括状态行和响应头），不做解析或改写。
pub async fn handle_cgi<S>(request: &mut Request<S>, config: &Config) -> HandlerOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = request.id();
    let path = match resolved_path(request) {
        Some(p) => p,
        None => return HandlerOutcome::failed(Exception::CgiSpawnFailed),
    };

    let mut command = Command::new(&path);
    command
        .envs(cgi_environment(request, config, &path))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());
    if let Some(dir) = path.parent() {
        command.current_dir(dir);
    }

    let mut child = match command.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!("[ID{}]无法启动CGI程序{}：{}", id, path.display(), e);
            return HandlerOutcome::failed(Exception::CgiSpawnFailed);
        }
    };
    let mut stdout = match child.stdout.take() {
        Some(s) => s,
        None => {
            error!("[ID{}]无法获取CGI程序的标准输出", id);
            let _ = child.kill().await;
            return HandlerOutcome::failed(Exception::CgiSpawnFailed);
        }
    };

    let copied = tokio::io::copy(&mut stdout, request.stream()).await;
    drop(stdout);
    if copied.is_err() {
        // 客户端已断开，子进程剩余的输出无处可去
        if let Err(e) = child.start_kill() {
            debug!("[ID{}]终止CGI程序失败：{}", id, e);
        }
    }
    let exit = child.wait().await;
    match &exit {
        Ok(status) if status.success() => debug!("[ID{}]CGI程序正常退出", id),
        Ok(status) => warn!("[ID{}]CGI程序{}异常退出：{}", id, path.display(), status),
        Err(e) => warn!("[ID{}]等待CGI程序退出失败：{}", id, e),
    }

    match copied {
        Ok(0) if !matches!(exit, Ok(status) if status.success()) => {
            HandlerOutcome::failed(Exception::CgiSpawnFailed)
        }
        Ok(n) => {
            debug!("[ID{}]CGI输出共转发 {} 字节", id, n);
            HandlerOutcome {
                status: Status::Ok,
                body_written: n > 0,
            }
        }
        Err(e) => {
            error!("[ID{}]转发CGI输出失败：{}", id, e);
            HandlerOutcome::committed(Status::Ok)
        }
    }
}

/// 写出完整的 HTML 错误页，总是成功
pub async fn handle_error<S>(request: &mut Request<S>, status: Status) -> Status
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = request.id();
    let html = HtmlBuilder::from_status(status).build();
    if let Err(e) = write_head(request, status, "text/html").await {
        error!("[ID{}]发送错误页响应头失败：{}", id, e);
        return status;
    }
    if let Err(e) = request.stream().write_all(html.as_bytes()).await {
        error!("[ID{}]发送错误页失败：{}", id, e);
    }
    status
}
