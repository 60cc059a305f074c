// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # MIME 类型查询
//!
//! 每次查询都线性扫描 mime.types 文件（通常是 `/etc/mime.types`），不做任何缓存。
//! 文件中每条规则的格式为：
//!
//! ```text
//! <MIMETYPE>      <EXT1> <EXT2> ...
//! ```

use std::path::Path;

use log::{debug, warn};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::param::BUILTIN_MIME_TYPES;

/// 查询文件的 MIME 类型，永不失败。
///
/// 没有扩展名或者没有匹配规则时返回配置中的默认类型；mime.types 文件无法打开时
/// 先查内置表，再回退到默认类型。
pub async fn lookup_mime_type(path: &Path, config: &Config) -> String {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e,
        None => return config.default_mime_type().to_string(),
    };

    let file = match File::open(config.mime_types_path()).await {
        Ok(f) => f,
        Err(e) => {
            warn!(
                "无法打开mime.types文件{}：{}，使用内置表",
                config.mime_types_path().display(),
                e
            );
            return match BUILTIN_MIME_TYPES.get(ext) {
                Some(mime) => mime.to_string(),
                None => config.default_mime_type().to_string(),
            };
        }
    };

    let mut lines = BufReader::new(file).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("读取mime.types文件失败：{}", e);
                break;
            }
        };
        if let Some(mime) = match_rule(&line, ext) {
            debug!("扩展名{}的MIME类型：{}", ext, mime);
            return mime.to_string();
        }
    }
    config.default_mime_type().to_string()
}

/// 若某条规则列出了该扩展名，返回其 MIME 类型
fn match_rule<'a>(line: &'a str, ext: &str) -> Option<&'a str> {
    if line.starts_with('#') {
        return None;
    }
    let mut tokens = line.split_whitespace();
    let mime = tokens.next()?;
    tokens.any(|t| t == ext).then_some(mime)
}
