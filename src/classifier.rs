// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 资源分类模块
//!
//! 根据已解析路径的元数据决定由哪个处理器响应：目录浏览、CGI 执行还是静态文件传输。

use std::ffi::CString;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use log::debug;

use crate::exception::Exception;

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Directory,
    Executable,
    RegularFile,
    Unsupported,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Directory => write!(f, "directory"),
            ResourceKind::Executable => write!(f, "executable"),
            ResourceKind::RegularFile => write!(f, "regular file"),
            ResourceKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// 对路径进行分类。
///
/// 判定顺序：目录 → 当前进程可执行 → 普通文件 → 其他。可执行位优先于普通文件，
/// 所以带执行权限的普通文件总是被当作 CGI 程序。
pub async fn classify(path: &Path) -> Result<ResourceKind, Exception> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) => {
            debug!("无法获取{}的元数据：{}", path.display(), e);
            return Err(Exception::StatFailed);
        }
    };

    let kind = if metadata.is_dir() {
        ResourceKind::Directory
    } else if is_executable(path) {
        ResourceKind::Executable
    } else if metadata.is_file() {
        ResourceKind::RegularFile
    } else {
        ResourceKind::Unsupported
    };
    Ok(kind)
}

/// 以服务器进程的真实身份检查执行权限
fn is_executable(path: &Path) -> bool {
    let c_path = match CString::new(path.as_os_str().as_bytes()) {
        Ok(p) => p,
        Err(_) => return false,
    };
    // SAFETY: c_path 是有效的以 NUL 结尾的字符串，在调用期间一直存活
    unsafe { libc::access(c_path.as_ptr(), libc::X_OK) == 0 }
}
