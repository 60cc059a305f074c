// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了单个请求在生命周期中可能遇到的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖请求解析、路径解析、资源分类以及处理器执行四个阶段的错误。
//! - **语义映射**：每个变体都通过 `status()` 对应到唯一的 HTTP 状态码，由分发器统一转换为错误页。
//! - **作用域**：这些异常都不会越过单个请求的生命周期，更不会终止服务器的监听循环。

use std::fmt;

use crate::param::Status;

/// 请求处理过程中发生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 请求行缺失、为空、过长，或者缺少 URI 部分。
    MalformedRequestLine,
    /// 某一行请求头不含 `:` 分隔符，或者过长、不是合法的 UTF-8。
    MalformedHeader,
    /// 请求没有携带任何请求头。
    NoHeaders,
    /// 路径无法规范化（不存在、符号链接断开、无权限），或者规范化后逃出了根目录。
    PathUnresolvable,
    /// 无法获取已解析路径的元数据。
    StatFailed,
    /// 路径指向设备、套接字、管道等不受支持的文件类型。
    UnsupportedFileType,
    /// 无法扫描目录内容。
    DirectoryScanFailed,
    /// 无法打开待传输的文件。
    FileOpenFailed,
    /// 无法启动 CGI 子进程。
    CgiSpawnFailed,
}

use Exception::*;

impl Exception {
    /// 该异常最终对应的 HTTP 状态
    pub fn status(&self) -> Status {
        match self {
            MalformedRequestLine | MalformedHeader | NoHeaders => Status::BadRequest,
            PathUnresolvable | StatFailed => Status::NotFound,
            UnsupportedFileType => Status::BadRequest,
            DirectoryScanFailed | FileOpenFailed => Status::NotFound,
            CgiSpawnFailed => Status::InternalServerError,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedRequestLine => write!(f, "Malformed request line"),
            MalformedHeader => write!(f, "Malformed request header"),
            NoHeaders => write!(f, "Request carries no headers"),
            PathUnresolvable => write!(f, "Path can't be resolved inside the document root"),
            StatFailed => write!(f, "Couldn't stat the requested path"),
            UnsupportedFileType => write!(f, "Unsupported file type"),
            DirectoryScanFailed => write!(f, "Couldn't scan directory"),
            FileOpenFailed => write!(f, "Couldn't open file"),
            CgiSpawnFailed => write!(f, "Couldn't spawn CGI process"),
        }
    }
}

impl std::error::Error for Exception {}
