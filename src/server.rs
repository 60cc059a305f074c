// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接服务器
//!
//! 两种可互换的顶层策略，都在同一个监听套接字上无限循环地接受连接：
//! - **Single**：严格顺序处理，一个请求完全结束后才接受下一个连接。
//! - **Forking**：每个连接交给一个独立的 Tokio 任务，接受循环从不等待它结束。
//!
//! 两种策略的区别仅在于请求处理是内联执行还是放到独立的工作任务中。

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::net::{TcpListener, TcpStream};

use crate::config::{Config, ServerMode};
use crate::dispatcher::handle_request;
use crate::request::Request;

/// 接受失败后的退避时间，避免文件描述符耗尽时空转
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// 绑定监听套接字。`local` 为真时只监听回环地址。
pub async fn create_listener(config: &Config) -> io::Result<TcpListener> {
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    let socket = SocketAddrV4::new(address, config.port());
    let listener = TcpListener::bind(socket).await?;
    info!("服务端在{}上监听Socket连接", listener.local_addr()?);
    Ok(listener)
}

/// 按配置中的模式运行服务器，直到 `shutdown` 完成
pub async fn run(
    listener: TcpListener,
    config: Arc<Config>,
    shutdown: impl Future<Output = ()>,
) {
    match config.mode() {
        ServerMode::Single => single_server(listener, config, shutdown).await,
        ServerMode::Forking => forking_server(listener, config, shutdown).await,
    }
}

/// 接受下一个连接。返回 `None` 表示收到停机信号。
async fn accept_next<F>(
    listener: &TcpListener,
    shutdown: &mut Pin<&mut F>,
) -> Option<(TcpStream, SocketAddr)>
where
    F: Future<Output = ()>,
{
    loop {
        tokio::select! {
            _ = shutdown.as_mut() => {
                info!("主循环接收到停机指令，正在退出...");
                return None;
            }
            accepted = listener.accept() => match accepted {
                Ok(connection) => return Some(connection),
                Err(e) => {
                    error!("接受连接失败：{}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

/// 一次只处理一个请求
pub async fn single_server(
    listener: TcpListener,
    config: Arc<Config>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    let mut id: u128 = 0;

    while let Some((stream, addr)) = accept_next(&listener, &mut shutdown).await {
        info!("[ID{}]Accepted request from {}", id, addr);
        let request = Request::new(stream, addr, id);
        handle_request(request, &config).await;
        id += 1;
    }
}

/// 每个连接一个工作任务，任务句柄被直接丢弃，接受循环不等待也不观察它的结束
pub async fn forking_server(
    listener: TcpListener,
    config: Arc<Config>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    let mut id: u128 = 0;

    while let Some((stream, addr)) = accept_next(&listener, &mut shutdown).await {
        info!("[ID{}]Accepted request from {}", id, addr);
        let config = Arc::clone(&config);
        let request = Request::new(stream, addr, id);
        tokio::spawn(async move {
            handle_request(request, &config).await;
        });
        debug!("[ID{}]请求已交给工作任务", id);
        id += 1;
    }
}
