// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 该模块负责把一次连接上的原始字节流解析为结构化的 `Request`。它涵盖了：
//! 1. 请求行（Request-Line）的解析：方法、URI 路径与查询字符串。
//! 2. 请求头（Headers）的逐行读取，保持原始顺序，允许重名。
//! 3. 连接句柄的持有与释放：`Request` 独占连接，生命周期结束时关闭它。
//!
//! 请求体永远不会被读取，无论请求方法是什么。

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

use crate::exception::Exception;

/// 一个请求头的名称与值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    name: String,
    value: String,
}

impl Header {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// 请求行拆分后的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub uri: String,
    pub query: String,
}

/// 解析请求行，例如 `GET /cgi.script?q=foo HTTP/1.0`。
///
/// 只要求前两个空白分隔的记号存在，协议版本被忽略。URI 在第一个 `?` 处拆分，
/// 不做百分号解码。
pub fn parse_request_line(line: &str) -> Result<RequestLine, Exception> {
    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or(Exception::MalformedRequestLine)?;
    let token = parts.next().ok_or(Exception::MalformedRequestLine)?;

    let (uri, query) = match token.split_once('?') {
        Some((uri, query)) => (uri, query),
        None => (token, ""),
    };
    if uri.is_empty() {
        return Err(Exception::MalformedRequestLine);
    }

    Ok(RequestLine {
        method: method.to_string(),
        uri: uri.to_string(),
        query: query.to_string(),
    })
}

/// 解析单行请求头 `NAME ":" OptionalSpace VALUE`。
///
/// 名称取第一个 `:` 之前的全部文本；值去掉前导空白与末尾的行终止符，
/// 值内部的冒号（例如 `Host: localhost:8888`）原样保留。
pub fn parse_header_line(line: &str) -> Result<Header, Exception> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (name, value) = line.split_once(':').ok_or(Exception::MalformedHeader)?;
    if name.is_empty() {
        return Err(Exception::MalformedHeader);
    }
    Ok(Header::new(name, value.trim_start()))
}

/// 去掉行终止符之后为空即视为请求头结束
fn is_blank_line(line: &str) -> bool {
    line.trim_end_matches(['\r', '\n']).is_empty()
}

/// 从连接中读到的一行
enum RawLine {
    Eof,
    TooLong,
    Bytes(Vec<u8>),
}

/// 一次 HTTP 交换的结构化表示。
///
/// 在连接被接受后立即创建，由 `parse` 填充，交给分发器和处理器消费，
/// 最后由 `close` 关闭连接。任何 `Request` 都不会比它的连接活得更久。
pub struct Request<S = TcpStream> {
    id: u128,
    stream: BufStream<S>,
    peer: SocketAddr,
    method: String,
    uri: String,
    query: String,
    headers: Vec<Header>,
    path: Option<PathBuf>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Request<S> {
    pub fn new(stream: S, peer: SocketAddr, id: u128) -> Self {
        Self {
            id,
            stream: BufStream::new(stream),
            peer,
            method: String::new(),
            uri: String::new(),
            query: String::new(),
            headers: Vec::new(),
            path: None,
        }
    }

    /// 读取并解析请求行与全部请求头。
    ///
    /// # 错误处理
    /// - 请求行缺失、为空、过长或缺少 URI：`MalformedRequestLine`
    /// - 请求头不含 `:` 或过长：`MalformedHeader`
    /// - 一个请求头都没有：`NoHeaders`
    pub async fn parse(&mut self, max_line_length: usize) -> Result<(), Exception> {
        let line = match self.read_line(max_line_length).await {
            Ok(RawLine::Bytes(bytes)) => {
                String::from_utf8(bytes).map_err(|_| Exception::MalformedRequestLine)?
            }
            Ok(_) | Err(_) => return Err(Exception::MalformedRequestLine),
        };
        let request_line = parse_request_line(&line)?;
        self.method = request_line.method;
        self.uri = request_line.uri;
        self.query = request_line.query;
        debug!("[ID{}]HTTP METHOD: {}", self.id, self.method);
        debug!("[ID{}]HTTP URI:    {}", self.id, self.uri);
        debug!("[ID{}]HTTP QUERY:  {}", self.id, self.query);

        loop {
            let bytes = match self.read_line(max_line_length).await {
                Ok(RawLine::Bytes(bytes)) => bytes,
                Ok(RawLine::Eof) => break,
                Ok(RawLine::TooLong) => return Err(Exception::MalformedHeader),
                Err(e) => {
                    debug!("[ID{}]读取请求头时连接出错：{}", self.id, e);
                    return Err(Exception::MalformedHeader);
                }
            };
            let line = String::from_utf8(bytes).map_err(|_| Exception::MalformedHeader)?;
            if is_blank_line(&line) {
                break;
            }
            let header = parse_header_line(&line)?;
            debug!("[ID{}]HTTP HEADER {} = {}", self.id, header.name(), header.value());
            self.headers.push(header);
        }

        if self.headers.is_empty() {
            return Err(Exception::NoHeaders);
        }
        Ok(())
    }

    async fn read_line(&mut self, limit: usize) -> io::Result<RawLine> {
        let mut buf = Vec::new();
        let n = (&mut self.stream)
            .take(limit as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            return Ok(RawLine::Eof);
        }
        if n >= limit && !buf.ends_with(b"\n") {
            return Ok(RawLine::TooLong);
        }
        Ok(RawLine::Bytes(buf))
    }

    /// 刷新缓冲区并关闭连接的写方向
    pub async fn close(mut self) {
        if let Err(e) = self.stream.flush().await {
            debug!("[ID{}]刷新连接失败：{}", self.id, e);
        }
        if let Err(e) = self.stream.shutdown().await {
            debug!("[ID{}]关闭连接失败：{}", self.id, e);
        }
        debug!("[ID{}]连接已关闭", self.id);
    }

    /// 处理器直接向其写入响应的连接流
    pub fn stream(&mut self) -> &mut BufStream<S> {
        &mut self.stream
    }
}

impl<S> Request<S> {
    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// 按名称（大小写不敏感）查找第一个匹配的请求头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// 客户端地址，数字形式
    pub fn host(&self) -> String {
        self.peer.ip().to_string()
    }

    /// 客户端端口
    pub fn port(&self) -> String {
        self.peer.port().to_string()
    }
}
