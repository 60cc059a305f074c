// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路径解析模块
//!
//! 将请求 URI 映射到文档根目录下的真实文件系统路径。
//!
//! 根目录与 URI 直接拼接后整体规范化（消解 `.`、`..` 与符号链接），
//! 然后要求结果在路径分量层面以规范化后的根目录为前缀。`/srv/www-secret`
//! 不会被当作 `/srv/www` 的子路径。

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::debug;

/// 解析 `uri_path` 在 `root` 下对应的绝对路径。
///
/// `root` 应当已经是规范化的绝对路径。规范化失败（不存在、符号链接断开、
/// 无权限）或结果逃出根目录时返回 `None`。
pub async fn resolve(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let mut joined = OsString::from(root.as_os_str());
    joined.push(uri_path);
    let candidate = PathBuf::from(joined);

    let canonical = match tokio::fs::canonicalize(&candidate).await {
        Ok(p) => p,
        Err(e) => {
            debug!("无法规范化路径{}：{}", candidate.display(), e);
            return None;
        }
    };

    if is_confined(root, &canonical) {
        Some(canonical)
    } else {
        debug!(
            "路径{}越出根目录{}，拒绝访问",
            canonical.display(),
            root.display()
        );
        None
    }
}

/// `path` 等于 `root` 或者是它的后代（按路径分量比较）
pub fn is_confined(root: &Path, path: &Path) -> bool {
    path.starts_with(root)
}
