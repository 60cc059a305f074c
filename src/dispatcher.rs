// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求分发器
//!
//! 串联一次请求的完整生命周期：
//!
//! ```text
//! Accepted → Parsed → PathResolved → Classified → Handled → Closed
//!     └──────────┴───────────┴────────────┴──→ Errored ──→ Closed
//! ```
//!
//! 任何阶段的失败都在这里被转换为四种状态之一，并且只写出一次错误页。

use std::fmt;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::classifier::{classify, ResourceKind};
use crate::config::Config;
use crate::exception::Exception;
use crate::handler::{handle_browse, handle_cgi, handle_error, handle_file};
use crate::param::Status;
use crate::request::Request;
use crate::resolver::resolve;

/// 请求生命周期中的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Accepted,
    Parsed,
    PathResolved,
    Classified,
    Handled,
    Errored,
    Closed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Accepted => "Accepted",
            Stage::Parsed => "Parsed",
            Stage::PathResolved => "PathResolved",
            Stage::Classified => "Classified",
            Stage::Handled => "Handled",
            Stage::Errored => "Errored",
            Stage::Closed => "Closed",
        };
        write!(f, "{}", name)
    }
}

/// 处理一个已接受的连接，直到连接关闭，返回最终状态
pub async fn handle_request<S>(mut request: Request<S>, config: &Config) -> Status
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = request.id();
    let status = dispatch(&mut request, config).await;

    info!(
        "[ID{}] {}, {}, {}, {}",
        id,
        request.peer(),
        request.method(),
        request.uri(),
        status,
    );

    request.close().await;
    debug!("[ID{}]-> {}", id, Stage::Closed);
    status
}

async fn dispatch<S>(request: &mut Request<S>, config: &Config) -> Status
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = request.id();

    if let Err(e) = request.parse(config.max_line_length()).await {
        return fail(request, Stage::Accepted, e).await;
    }
    debug!("[ID{}]{} -> {}", id, Stage::Accepted, Stage::Parsed);

    let path = match resolve(config.www_root(), request.uri()).await {
        Some(p) => p,
        None => return fail(request, Stage::Parsed, Exception::PathUnresolvable).await,
    };
    debug!("[ID{}]HTTP REQUEST PATH: {}", id, path.display());
    request.set_path(path.clone());
    debug!("[ID{}]{} -> {}", id, Stage::Parsed, Stage::PathResolved);

    let kind = match classify(&path).await {
        Ok(kind) => kind,
        Err(e) => return fail(request, Stage::PathResolved, e).await,
    };
    debug!(
        "[ID{}]{} -> {} ({})",
        id,
        Stage::PathResolved,
        Stage::Classified,
        kind
    );

    let outcome = match kind {
        ResourceKind::Directory => handle_browse(request, config).await,
        ResourceKind::Executable => handle_cgi(request, config).await,
        ResourceKind::RegularFile => handle_file(request, config).await,
        ResourceKind::Unsupported => {
            return fail(request, Stage::Classified, Exception::UnsupportedFileType).await
        }
    };

    if !outcome.status.is_ok() && !outcome.body_written {
        debug!("[ID{}]{} -> {} ({})", id, Stage::Classified, Stage::Errored, outcome.status);
        return handle_error(request, outcome.status).await;
    }
    debug!(
        "[ID{}]{} -> {} ({})",
        id,
        Stage::Classified,
        Stage::Handled,
        outcome.status
    );
    outcome.status
}

async fn fail<S>(request: &mut Request<S>, from: Stage, exception: Exception) -> Status
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let status = exception.status();
    warn!("[ID{}]{}：{}，返回{}", request.id(), from, exception, status);
    debug!("[ID{}]{} -> {} ({})", request.id(), from, Stage::Errored, status);
    handle_error(request, status).await
}
