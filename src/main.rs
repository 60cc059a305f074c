// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 极简 HTTP/1.0 源服务器
//!
//! 该程序在文档根目录下提供三类资源：
//! - 目录：以 HTML 列表的形式浏览
//! - 带执行权限的文件：作为 CGI 程序运行，标准输出即响应
//! - 普通文件：按 mime.types 判定类型后原样传输
//!
//! 并发策略在启动时选择：逐个处理（single）或每连接一个工作任务（forking）。

use std::process;
use std::sync::Arc;

use clap::Parser;
use log::{debug, error, info};
use tokio::runtime::Builder;

use minihttpd::config::{Args, Config};
use minihttpd::server;

/// # 程序入口点
///
/// 初始化日志、加载配置、构建运行时并启动接受循环。
fn main() {
    let args = Args::parse();

    // 1. 初始化日志系统：通过外部 YAML 配置级别与输出目的地
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
        process::exit(1);
    }

    // 2. 配置加载：TOML 文件 + 命令行覆盖，随后规范化根目录
    let config = Config::from_toml(&args.config).merge_args(&args);
    let config = match config.canonicalize_root() {
        Ok(c) => c,
        Err(e) => {
            error!("无法确定文档根目录的真实路径：{}", e);
            process::exit(1);
        }
    };
    info!("配置文件已载入");
    debug!("RootPath        = {}", config.www_root().display());
    debug!("MimeTypesPath   = {}", config.mime_types_path().display());
    debug!("DefaultMimeType = {}", config.default_mime_type());
    debug!("ConcurrencyMode = {}", config.mode());

    // 3. 异步运行时：根据配置文件分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("无法构建异步运行时：{}", e);
            process::exit(1);
        }
    };

    let config = Arc::new(config);
    runtime.block_on(async move {
        let listener = match server::create_listener(&config).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("无法绑定端口：{}，错误：{}", config.port(), e);
                process::exit(1);
            }
        };
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("无法监听停机信号：{}", e);
                std::future::pending::<()>().await;
            }
        };
        server::run(listener, config, shutdown).await;
    });
    info!("服务器已退出");
}
