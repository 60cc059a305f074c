// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use clap::{Parser, ValueEnum};
use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fmt;
use std::fs::File;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};

/// 并发策略：逐个处理，或者每个连接一个独立的工作任务
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    Single,
    Forking,
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMode::Single => write!(f, "Single"),
            ServerMode::Forking => write!(f, "Forking"),
        }
    }
}

/// 命令行参数，优先级高于配置文件
#[derive(Parser, Debug, Default)]
#[command(name = "minihttpd", version, about = "A minimal HTTP/1.0 origin server")]
pub struct Args {
    /// 配置文件路径
    #[arg(long = "config", default_value = "config/development.toml")]
    pub config: String,

    /// 并发模式：single 或 forking
    #[arg(short = 'c', value_enum)]
    pub mode: Option<ServerMode>,

    /// mime.types 文件路径
    #[arg(short = 'm')]
    pub mime_types_path: Option<String>,

    /// 默认 MIME 类型
    #[arg(short = 'M')]
    pub default_mime_type: Option<String>,

    /// 监听端口
    #[arg(short = 'p')]
    pub port: Option<u16>,

    /// 文档根目录
    #[arg(short = 'r')]
    pub root: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_www_root")]
    www_root: PathBuf,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default = "default_mode")]
    mode: ServerMode,
    #[serde(default = "default_mime_types_path")]
    mime_types_path: PathBuf,
    #[serde(default = "default_mime_type")]
    default_mime_type: String,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_max_line_length")]
    max_line_length: usize,
}

fn default_www_root() -> PathBuf {
    PathBuf::from("www")
}

fn default_port() -> u16 {
    9898
}

fn default_local() -> bool {
    true
}

fn default_mode() -> ServerMode {
    ServerMode::Single
}

fn default_mime_types_path() -> PathBuf {
    PathBuf::from("/etc/mime.types")
}

fn default_mime_type() -> String {
    "text/plain".to_string()
}

fn default_chunk_size() -> usize {
    8192
}

fn default_max_line_length() -> usize {
    8192
}

impl Config {
    pub fn new() -> Self {
        Self {
            www_root: default_www_root(),
            port: default_port(),
            local: default_local(),
            mode: default_mode(),
            mime_types_path: default_mime_types_path(),
            default_mime_type: default_mime_type(),
            worker_threads: 0,
            chunk_size: default_chunk_size(),
            max_line_length: default_max_line_length(),
        }
    }

    /// 从 TOML 文件读取配置。文件缺失或格式错误时使用默认配置。
    pub fn from_toml(filename: &str) -> Self {
        let mut str_val = String::new();
        match File::open(filename) {
            Ok(mut file) => {
                if let Err(e) = file.read_to_string(&mut str_val) {
                    error!("读取配置文件{}失败：{}，使用默认配置", filename, e);
                    return Config::new().normalized();
                }
            }
            Err(e) => {
                warn!("无法打开配置文件{}：{}，使用默认配置", filename, e);
                return Config::new().normalized();
            }
        }

        let raw_config: Config = match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象：{}，使用默认配置", e);
                Config::new()
            }
        };
        raw_config.normalized()
    }

    /// 以命令行参数覆盖配置文件中的同名项
    pub fn merge_args(mut self, args: &Args) -> Self {
        if let Some(mode) = args.mode {
            self.mode = mode;
        }
        if let Some(path) = &args.mime_types_path {
            self.mime_types_path = PathBuf::from(path);
        }
        if let Some(mime) = &args.default_mime_type {
            self.default_mime_type = mime.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(root) = &args.root {
            self.www_root = root.clone();
        }
        self
    }

    /// 将根目录替换为其规范化的绝对路径。
    ///
    /// 路径解析阶段的越界检查以此为基准，因此必须在监听循环开始之前完成。
    pub fn canonicalize_root(mut self) -> io::Result<Self> {
        self.www_root = self.www_root.canonicalize()?;
        Ok(self)
    }

    /// 以指定目录为根目录构造一份默认配置，根目录会被立即规范化
    pub fn with_root(root: impl AsRef<Path>) -> io::Result<Self> {
        let mut config = Config::new().normalized();
        config.www_root = root.as_ref().to_path_buf();
        config.canonicalize_root()
    }

    pub fn with_mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_mime_types_path(mut self, path: impl AsRef<Path>) -> Self {
        self.mime_types_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_default_mime_type(mut self, mime: &str) -> Self {
        self.default_mime_type = mime.to_string();
        self
    }

    fn normalized(mut self) -> Self {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.chunk_size == 0 {
            warn!("chunk_size被设置为0，该值将被改为{}。", default_chunk_size());
            self.chunk_size = default_chunk_size();
        }
        if self.max_line_length < 3 {
            warn!(
                "max_line_length过小，该值将被改为{}。",
                default_max_line_length()
            );
            self.max_line_length = default_max_line_length();
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl Config {
    pub fn www_root(&self) -> &Path {
        &self.www_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn mode(&self) -> ServerMode {
        self.mode
    }

    pub fn mime_types_path(&self) -> &Path {
        &self.mime_types_path
    }

    pub fn default_mime_type(&self) -> &str {
        &self.default_mime_type
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}
